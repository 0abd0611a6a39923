use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================================================================================================
// Models for /articles endpoints (free board)
// ==================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Writer {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub writer: Writer,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleList {
    pub total_count: u64,
    pub list: Vec<Article>,
}

/// Sort order of the article list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleOrder {
    #[default]
    Recent,
    Like,
}

impl ArticleOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleOrder::Recent => "recent",
            ArticleOrder::Like => "like",
        }
    }
}

/// Parse sort order from string
pub fn parse_article_order(s: &str) -> ArticleOrder {
    match s.to_lowercase().as_str() {
        "like" | "likes" => ArticleOrder::Like,
        _ => ArticleOrder::Recent,
    }
}

/// Query of `GET /articles`
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub order_by: ArticleOrder,
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleRequest {
    pub image: String,
    pub content: String,
    pub title: String,
}

// ==================================================================================================
// Models for /articles/{id}/comments
// ==================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub writer: Writer,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentList {
    pub list: Vec<Comment>,
    #[serde(default)]
    pub next_cursor: Option<i64>,
}
