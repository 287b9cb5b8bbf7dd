//! Data access for the `books` table.

use sqlx::SqlitePool;
use thiserror::Error;

use super::models::{Book, InvalidBook, NewBook};
use crate::utils::Page;

/// Outcome of a failed catalog operation.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book {0} not found")]
    NotFound(i64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<InvalidBook> for CatalogError {
    fn from(err: InvalidBook) -> Self {
        CatalogError::InvalidInput(err.to_string())
    }
}

/// One shelf of books plus the size of the collection it was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shelf {
    pub books: Vec<Book>,
    pub total: i64,
}

/// Store-access object handed to the HTTP handlers.
#[derive(Debug, Clone)]
pub struct BookStore {
    pool: SqlitePool,
    books_per_shelf: u32,
}

impl BookStore {
    pub fn new(pool: SqlitePool, books_per_shelf: u32) -> Self {
        Self {
            pool,
            books_per_shelf,
        }
    }

    pub fn books_per_shelf(&self) -> u32 {
        self.books_per_shelf
    }

    /// Shelf `page` of the whole collection, ordered by id. The count and
    /// the page are read in one transaction so `total` matches `books`.
    pub async fn shelf(&self, page: Page) -> Result<Shelf, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *tx)
            .await?;

        let books = match page.window(self.books_per_shelf) {
            Some(window) => {
                sqlx::query_as::<_, Book>(
                    "SELECT id, title, author, rating FROM books ORDER BY id LIMIT ? OFFSET ?",
                )
                .bind(window.limit)
                .bind(window.offset)
                .fetch_all(&mut *tx)
                .await?
            }
            None => Vec::new(),
        };

        tx.commit().await?;
        Ok(Shelf { books, total })
    }

    /// Shelf `page` of the books whose title contains `term`, ignoring case
    /// for any script. `total` counts every match.
    ///
    /// SQLite's `LIKE` only folds ASCII, so matching happens on full Unicode
    /// lowercase forms after one id-ordered scan. Count and page come from
    /// the same read.
    pub async fn search(&self, term: &str, page: Page) -> Result<Shelf, CatalogError> {
        let needle = term.to_lowercase();

        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, rating FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let matches: Vec<Book> = books
            .into_iter()
            .filter(|book| book.title.to_lowercase().contains(&needle))
            .collect();
        let total = i64::try_from(matches.len()).unwrap_or(i64::MAX);

        let books = match page.window(self.books_per_shelf) {
            Some(window) => match (
                usize::try_from(window.offset),
                usize::try_from(window.limit),
            ) {
                (Ok(offset), Ok(limit)) => matches.into_iter().skip(offset).take(limit).collect(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        };

        Ok(Shelf { books, total })
    }

    pub async fn find(&self, id: i64) -> Result<Option<Book>, CatalogError> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, rating FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    /// Like [`BookStore::find`], with absence reported as `NotFound`.
    pub async fn get(&self, id: i64) -> Result<Book, CatalogError> {
        self.find(id).await?.ok_or(CatalogError::NotFound(id))
    }

    pub async fn insert(&self, book: &NewBook) -> Result<Book, CatalogError> {
        let created = sqlx::query_as::<_, Book>(
            "INSERT INTO books (title, author, rating) VALUES (?, ?, ?) \
             RETURNING id, title, author, rating",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.rating)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Persist a new rating. A book deleted concurrently reports `NotFound`.
    pub async fn update_rating(&self, id: i64, rating: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("UPDATE books SET rating = ? WHERE id = ?")
            .bind(rating)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }
}
