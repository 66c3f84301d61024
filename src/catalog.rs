//! Typed wrappers over the library-catalog endpoints.
//! Business rules (availability counts, double-borrow checks, due dates)
//! live server-side; this layer only types and transports them. Every call
//! goes through the refresh-aware client, so an expired access token is
//! renewed and retried without the caller noticing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::ApiResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub quantity: u32,
    pub available: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BorrowRecord {
    pub id: i64,
    pub book: Book,
    pub borrow_date: DateTime<Utc>,
    #[serde(default)]
    pub return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub returned: bool,
}

/// Substring filters for the book listing; unset fields are omitted from
/// the query string.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
}

impl BookQuery {
    pub fn by_field(field: &str, text: &str) -> Option<Self> {
        let mut q = BookQuery::default();
        match field {
            "title" => q.title = Some(text.to_string()),
            "author" => q.author = Some(text.to_string()),
            "genre" => q.genre = Some(text.to_string()),
            _ => return None,
        }
        Some(q)
    }
}

fn search_path(q: &BookQuery) -> String {
    let mut params: Vec<String> = Vec::new();
    for (key, val) in [("title", &q.title), ("author", &q.author), ("genre", &q.genre)] {
        if let Some(v) = val {
            params.push(format!("{}={}", key, urlencoding::encode(v)));
        }
    }
    if params.is_empty() {
        "/api/books/".to_string()
    } else {
        format!("/api/books/?{}", params.join("&"))
    }
}

pub struct Catalog {
    client: Arc<ApiClient>,
}

impl Catalog {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// List books, optionally filtered. Readable without a session; the
    /// bearer header is attached only when a pair is present.
    pub async fn search(&self, q: &BookQuery) -> ApiResult<Vec<Book>> {
        self.client.get_json(&search_path(q)).await
    }

    pub async fn book(&self, id: i64) -> ApiResult<Book> {
        self.client.get_json(&format!("/api/books/{}/", id)).await
    }

    /// Borrow a copy. The server rejects zero availability and double
    /// borrows with a 400 + error body, surfaced as `ApiError::Rejected`.
    pub async fn borrow(&self, book_id: i64) -> ApiResult<BorrowRecord> {
        self.client
            .post_json(&format!("/api/books/{}/borrow/", book_id), serde_json::json!({}))
            .await
    }

    /// Return a borrowed copy. Takes the borrow-record id, not the book id.
    pub async fn return_book(&self, record_id: i64) -> ApiResult<()> {
        let _ack: serde_json::Value = self
            .client
            .put_json(&format!("/api/books/{}/return/", record_id), serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// The current user's open borrow records.
    pub async fn my_borrowed(&self) -> ApiResult<Vec<BorrowRecord>> {
        self.client.get_json("/api/users/me/books/").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_omits_unset_filters() {
        assert_eq!(search_path(&BookQuery::default()), "/api/books/");
        let q = BookQuery { title: Some("dune".into()), ..Default::default() };
        assert_eq!(search_path(&q), "/api/books/?title=dune");
    }

    #[test]
    fn search_path_encodes_and_joins() {
        let q = BookQuery {
            title: Some("war & peace".into()),
            author: Some("tolstoy".into()),
            genre: None,
        };
        assert_eq!(search_path(&q), "/api/books/?title=war%20%26%20peace&author=tolstoy");
    }

    #[test]
    fn by_field_accepts_known_fields_only() {
        assert!(BookQuery::by_field("title", "x").is_some());
        assert!(BookQuery::by_field("author", "x").is_some());
        assert!(BookQuery::by_field("genre", "x").is_some());
        assert!(BookQuery::by_field("isbn", "x").is_none());
    }

    #[test]
    fn borrow_record_defaults_returned_flag() {
        let raw = serde_json::json!({
            "id": 3,
            "book": {"id": 1, "title": "Dune", "author": "Herbert", "genre": "sf", "quantity": 2, "available": 1},
            "borrow_date": "2026-08-01T10:00:00Z"
        });
        let rec: BorrowRecord = serde_json::from_value(raw).unwrap();
        assert!(!rec.returned);
        assert!(rec.return_date.is_none());
    }
}
