//! Catalog service: books, authors and libraries

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorForm},
        book::{Book, BookForm},
        library::{Library, LibraryDetail, LibraryForm, LibrarySummary},
    },
    repository::Repository,
};

use super::users::FormResult;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Choices for the book form's author field
    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    /// Validate and insert a book
    pub async fn create_book(&self, form: &BookForm, authors: &[Author]) -> FormResult<Book> {
        let input = match form.clean(authors) {
            Ok(input) => input,
            Err(errors) => return Ok(Err(errors)),
        };

        let book = self.repository.books.create(&input).await?;
        tracing::info!(book_id = book.id, title = %book.title, "Book created");
        Ok(Ok(book))
    }

    /// Validate and update a book
    pub async fn update_book(&self, id: i32, form: &BookForm, authors: &[Author]) -> FormResult<Book> {
        let input = match form.clean(authors) {
            Ok(input) => input,
            Err(errors) => return Ok(Err(errors)),
        };

        let book = self.repository.books.update(id, &input).await?;
        tracing::info!(book_id = book.id, "Book updated");
        Ok(Ok(book))
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// Library with its books and librarian
    pub async fn get_library(&self, id: i32) -> AppResult<LibraryDetail> {
        let library = self.repository.libraries.get_by_id(id).await?;
        let books = self.repository.books.list_for_library(id).await?;
        let librarian = self.repository.libraries.get_librarian(id).await?;

        Ok(LibraryDetail {
            library,
            books,
            librarian,
        })
    }

    pub async fn list_libraries(&self) -> AppResult<Vec<LibrarySummary>> {
        self.repository.libraries.list().await
    }

    pub async fn create_author(&self, form: &AuthorForm) -> FormResult<Author> {
        let name = match form.clean() {
            Ok(name) => name,
            Err(errors) => return Ok(Err(errors)),
        };

        let author = self.repository.authors.create(&name).await?;
        tracing::info!(author_id = author.id, name = %author.name, "Author created");
        Ok(Ok(author))
    }

    pub async fn create_library(&self, form: &LibraryForm) -> FormResult<Library> {
        let input = match form.clean() {
            Ok(input) => input,
            Err(errors) => return Ok(Err(errors)),
        };

        let library = self.repository.libraries.create(&input).await?;
        tracing::info!(library_id = library.id, name = %library.name, "Library created");
        Ok(Ok(library))
    }

    /// Shelve an existing book in an existing library
    pub async fn add_book_to_library(&self, library_id: i32, book_id: i32) -> AppResult<()> {
        self.repository.libraries.get_by_id(library_id).await?;
        self.repository.books.get_by_id(book_id).await?;
        self.repository.libraries.add_book(library_id, book_id).await?;
        tracing::info!(library_id, book_id, "Book added to library");
        Ok(())
    }
}
