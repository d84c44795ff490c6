//! Data models for Shelfmark

pub mod author;
pub mod book;
pub mod form;
pub mod library;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorForm};
pub use book::{Book, BookForm, BookInput};
pub use form::FormErrors;
pub use library::{Librarian, Library, LibraryDetail, LibraryForm, LibraryInput, LibrarySummary};
pub use user::{Permission, Role, SessionClaims, User, UserSummary};
