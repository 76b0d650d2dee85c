//! Book catalog service

use chrono::Utc;
use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookPayload, BookQuery, BookSummary, BookViolation},
    repository::Repository,
};

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
const ID_LENGTH: usize = 16;

pub const MSG_CREATED: &str = "Buku berhasil ditambahkan";
pub const MSG_UPDATED: &str = "Buku berhasil diperbarui";
pub const MSG_DELETED: &str = "Buku berhasil dihapus";

const MSG_CREATE_NO_NAME: &str = "Gagal menambahkan buku. Mohon isi nama buku";
const MSG_CREATE_OVERFLOW: &str =
    "Gagal menambahkan buku. readPage tidak boleh lebih besar dari pageCount";
const MSG_CREATE_FAILED: &str = "Catatan gagal ditambahkan";
const MSG_NOT_FOUND: &str = "Buku tidak ditemukan";
const MSG_UPDATE_NO_NAME: &str = "Gagal memperbarui buku. Mohon isi nama buku";
const MSG_UPDATE_OVERFLOW: &str =
    "Gagal memperbarui buku. readPage tidak boleh lebih besar dari pageCount";
const MSG_UPDATE_NOT_FOUND: &str = "Gagal memperbarui buku. Id tidak ditemukan";
const MSG_DELETE_NOT_FOUND: &str = "Buku gagal dihapus. Id tidak ditemukan";

/// Generate a 16-character URL-safe identifier
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a book and return its id
    pub async fn create(&self, payload: BookPayload) -> AppResult<String> {
        let input = payload.into_input().map_err(|violation| match violation {
            BookViolation::MissingName => AppError::Validation(MSG_CREATE_NO_NAME.to_string()),
            BookViolation::InvalidValue(field) => {
                AppError::Validation(format!("Gagal menambahkan buku. Nilai {} tidak valid", field))
            }
            BookViolation::PageOverflow => AppError::Validation(MSG_CREATE_OVERFLOW.to_string()),
        })?;

        let mut id = generate_id();
        while self.repository.books.contains(&id).await {
            id = generate_id();
        }

        let book = Book::new(id.clone(), input, Utc::now());
        if !self.repository.books.insert(book).await {
            return Err(AppError::Internal(MSG_CREATE_FAILED.to_string()));
        }

        tracing::info!("Book {} created", id);
        Ok(id)
    }

    /// List books as short summaries, filtered when the query sets any filter
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<BookSummary>> {
        if query.is_empty() {
            tracing::debug!("Listing all books");
        } else {
            tracing::debug!("Listing books with filters: {:?}", query);
        }
        Ok(self.repository.books.list(query).await)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await.ok_or_else(|| {
            tracing::warn!("Book {} not found", id);
            AppError::NotFound(MSG_NOT_FOUND.to_string())
        })
    }

    /// Replace the mutable fields of a book. The payload is checked before the lookup.
    pub async fn update(&self, id: &str, payload: BookPayload) -> AppResult<Book> {
        let input = payload.into_input().map_err(|violation| match violation {
            BookViolation::MissingName => AppError::Validation(MSG_UPDATE_NO_NAME.to_string()),
            BookViolation::InvalidValue(field) => {
                AppError::Validation(format!("Gagal memperbarui buku. Nilai {} tidak valid", field))
            }
            BookViolation::PageOverflow => AppError::Validation(MSG_UPDATE_OVERFLOW.to_string()),
        })?;

        let book = self
            .repository
            .books
            .update(id, input, Utc::now())
            .await
            .ok_or_else(|| {
                tracing::warn!("Cannot update book {}: not found", id);
                AppError::NotFound(MSG_UPDATE_NOT_FOUND.to_string())
            })?;

        tracing::info!("Book {} updated", id);
        Ok(book)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.repository.books.delete(id).await {
            tracing::warn!("Cannot delete book {}: not found", id);
            return Err(AppError::NotFound(MSG_DELETE_NOT_FOUND.to_string()));
        }
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    /// Number of books currently stored
    pub async fn count(&self) -> usize {
        self.repository.books.count().await
    }
}
