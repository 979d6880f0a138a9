use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published (or preview) blog article, flattened out of the content API's
/// envelope format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub img_url: String,
    pub locale: String,
    pub slug: String,
    pub categories: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(id: i64, slug: &str, title: &str) -> Self {
        Self {
            id,
            slug: slug.to_owned(),
            title: title.to_owned(),
            ..Default::default()
        }
    }

    /// Articles without a title are treated as missing by the page renderer.
    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }

    pub fn permalink(&self) -> String {
        format!("/articles/{}", self.slug)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub start: Option<usize>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub page_count: Option<usize>,
    pub total: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleList {
    pub data: Vec<Article>,
    pub pagination: Pagination,
}
