use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Store-assigned identifier, never reused
    pub id: i64,
    pub title: String,
    pub author: String,
    pub rating: Option<i64>,
}

/// Validated input for inserting a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub rating: Option<i64>,
}

/// Body of `PATCH /books/{id}`.
///
/// `rating` is `None` when the key is absent and `Some(Value::Null)` when it
/// is explicitly `null`; only the former is a no-op.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRating {
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Value>,
}

/// Body of `POST /books`: a search when `search` is non-empty, a create
/// otherwise.
#[derive(Debug, Default, Deserialize)]
pub struct BookRequest {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
}

/// What a `POST /books` body asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookAction {
    Search(String),
    Create(NewBook),
}

impl BookRequest {
    pub fn into_action(self) -> Result<BookAction, InvalidBook> {
        if let Some(term) = self.search.filter(|term| !term.is_empty()) {
            return Ok(BookAction::Search(term));
        }

        let title = self.title.ok_or(InvalidBook::Missing("title"))?;
        let author = self.author.ok_or(InvalidBook::Missing("author"))?;
        let rating = match self.rating {
            None | Some(Value::Null) => None,
            Some(value) => Some(coerce_rating(&value)?),
        };

        Ok(BookAction::Create(NewBook {
            title,
            author,
            rating,
        }))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidBook {
    #[error("field '{0}' is required")]
    Missing(&'static str),
    #[error(transparent)]
    Rating(#[from] RatingError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating must be an integer, got {0}")]
    NotAnInteger(String),
    #[error("rating {0} is out of range")]
    OutOfRange(String),
}

/// Coerce a JSON rating into an integer.
///
/// Integers pass through, floats truncate toward zero, booleans become 0/1
/// and strings must hold an integer (surrounding whitespace allowed).
pub fn coerce_rating(value: &Value) -> Result<i64, RatingError> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(int)
            } else if let Some(float) = number.as_f64().filter(|f| f.is_finite()) {
                let truncated = float.trunc();
                if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                    Ok(truncated as i64)
                } else {
                    Err(RatingError::OutOfRange(number.to_string()))
                }
            } else {
                Err(RatingError::OutOfRange(number.to_string()))
            }
        }
        Value::Bool(flag) => Ok(i64::from(*flag)),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| RatingError::NotAnInteger(value.to_string())),
        other => Err(RatingError::NotAnInteger(other.to_string())),
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// `GET /books` and search results.
#[derive(Debug, Serialize)]
pub struct BookList {
    pub success: bool,
    pub books: Vec<Book>,
    pub total_books: i64,
}

/// `GET /books/{id}`.
#[derive(Debug, Serialize)]
pub struct BookDetail {
    pub success: bool,
    pub book: Book,
}

/// `PATCH /books/{id}`.
#[derive(Debug, Serialize)]
pub struct RatingUpdated {
    pub success: bool,
    pub id: i64,
}

/// `DELETE /books/{id}`.
#[derive(Debug, Serialize)]
pub struct BookDeleted {
    pub success: bool,
    pub deleted: i64,
    pub books: Vec<Book>,
    pub total_books: i64,
}

/// `POST /books` when creating.
#[derive(Debug, Serialize)]
pub struct BookCreated {
    pub success: bool,
    pub created: i64,
    pub books: Vec<Book>,
    pub total_books: i64,
}
