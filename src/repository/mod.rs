//! Repository layer for book storage

pub mod books;

/// Main repository struct holding the in-memory collections
#[derive(Clone, Default)]
pub struct Repository {
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a repository with an empty collection
    pub fn new() -> Self {
        Self::default()
    }
}
