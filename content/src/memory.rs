use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{Article, ArticleList, ContentError, ContentQuery, ContentSource, Pagination};

/// Serves articles from memory, evaluating queries the way the content API
/// would. Used for local development against a JSON fixture file and in tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryContentSource {
    articles: Vec<Article>,
}

impl MemoryContentSource {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    /// Loads a JSON array of articles in their flattened (camelCase) form.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&raw)?))
    }

    pub fn all(&self) -> &[Article] {
        &self.articles
    }

    fn record(article: &Article) -> Value {
        json!({
            "id": article.id,
            "slug": article.slug,
            "title": article.title,
            "locale": article.locale,
            "createdAt": article.created_at.map(|created_at| created_at.to_rfc3339()),
            "categories": article
                .categories
                .iter()
                .map(|name| json!({ "name": name }))
                .collect::<Vec<_>>(),
        })
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn single_article(
        &self,
        slug: &str,
        query: &ContentQuery,
    ) -> Result<Article, ContentError> {
        self.articles
            .iter()
            .find(|article| article.slug == slug && query.matches(&Self::record(article)))
            .cloned()
            .ok_or(ContentError::NotFound)
    }

    async fn articles(&self, query: &ContentQuery) -> Result<ArticleList, ContentError> {
        let mut matching = self
            .articles
            .iter()
            .map(|article| (Self::record(article), article))
            .filter(|(record, _)| query.matches(record))
            .collect::<Vec<_>>();
        matching.sort_by(|(a, _), (b, _)| query.compare(a, b));

        let total = matching.len();
        let limit = query.page_limit();
        let data = matching
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, article)| article.clone())
            .collect();

        Ok(ArticleList {
            data,
            pagination: Pagination {
                start: Some(0),
                limit,
                total,
                ..Default::default()
            },
        })
    }
}
