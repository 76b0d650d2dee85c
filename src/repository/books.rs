//! In-memory book collection.
//!
//! Books are kept in insertion order behind a single lock, so every
//! read-modify-write sequence runs with at most one writer at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::book::{Book, BookInput, BookQuery, BookSummary};

#[derive(Clone, Default)]
pub struct BooksRepository {
    books: Arc<RwLock<Vec<Book>>>,
}

impl BooksRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a book and report whether it is now present in the collection
    pub async fn insert(&self, book: Book) -> bool {
        let mut books = self.books.write().await;
        let id = book.id.clone();
        books.push(book);
        books.iter().any(|b| b.id == id)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.books.read().await.iter().any(|b| b.id == id)
    }

    /// List books matching the query, in insertion order
    pub async fn list(&self, query: &BookQuery) -> Vec<BookSummary> {
        self.books
            .read()
            .await
            .iter()
            .filter(|book| query.matches(book))
            .map(BookSummary::from)
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Book> {
        self.books.read().await.iter().find(|b| b.id == id).cloned()
    }

    /// Apply new field values to a book, returning the updated record
    pub async fn update(&self, id: &str, input: BookInput, now: DateTime<Utc>) -> Option<Book> {
        let mut books = self.books.write().await;
        let book = books.iter_mut().find(|b| b.id == id)?;
        book.apply(input, now);
        Some(book.clone())
    }

    /// Remove a book; false when no book has this id
    pub async fn delete(&self, id: &str) -> bool {
        let mut books = self.books.write().await;
        match books.iter().position(|b| b.id == id) {
            Some(index) => {
                books.remove(index);
                true
            }
            None => false,
        }
    }

    pub async fn count(&self) -> usize {
        self.books.read().await.len()
    }
}
