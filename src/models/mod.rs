//! Data models for Bookshelf

pub mod book;

// Re-export commonly used types
pub use book::{Book, BookInput, BookPayload, BookQuery, BookSummary, BookViolation};
