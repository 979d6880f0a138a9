use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use content::{
    Article, ArticleList, ContentError, ContentQuery, ContentSource, MemoryContentSource,
};
use rocket::local::asynchronous::Client;

use crate::webserver::{self, revalidation::PageCache, SharedSource};

pub fn sample_article(id: i64, slug: &str, categories: &[&str]) -> Article {
    Article {
        description: format!("Description of {}", slug),
        content: format!("Body of article **{}**.", id),
        img_url: format!("https://cdn.example.com/{}.png", slug),
        locale: String::from("en"),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        created_at: Utc.timestamp_opt(1_680_000_000 + id * 86_400, 0).single(),
        ..Article::new(id, slug, &format!("Title of {}", slug))
    }
}

/// Serves articles from memory and records every query it receives.
pub struct RecordingSource {
    inner: MemoryContentSource,
    honour_list_queries: bool,
    article_requests: Mutex<Vec<(String, ContentQuery)>>,
    list_requests: Mutex<Vec<ContentQuery>>,
}

impl RecordingSource {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            inner: MemoryContentSource::new(articles),
            honour_list_queries: true,
            article_requests: Mutex::default(),
            list_requests: Mutex::default(),
        }
    }

    /// Answers list queries with every article, unfiltered and unlimited.
    pub fn ignoring_queries(articles: Vec<Article>) -> Self {
        Self {
            honour_list_queries: false,
            ..Self::new(articles)
        }
    }

    pub fn article_requests(&self) -> Vec<(String, ContentQuery)> {
        self.article_requests.lock().unwrap().clone()
    }

    pub fn list_requests(&self) -> Vec<ContentQuery> {
        self.list_requests.lock().unwrap().clone()
    }
}

#[rocket::async_trait]
impl ContentSource for RecordingSource {
    async fn single_article(
        &self,
        slug: &str,
        query: &ContentQuery,
    ) -> Result<Article, ContentError> {
        self.article_requests
            .lock()
            .unwrap()
            .push((slug.to_owned(), query.clone()));
        self.inner.single_article(slug, query).await
    }

    async fn articles(&self, query: &ContentQuery) -> Result<ArticleList, ContentError> {
        self.list_requests.lock().unwrap().push(query.clone());
        if self.honour_list_queries {
            self.inner.articles(query).await
        } else {
            self.inner.articles(&ContentQuery::new()).await
        }
    }
}

pub struct FailingSource;

#[rocket::async_trait]
impl ContentSource for FailingSource {
    async fn single_article(&self, _: &str, _: &ContentQuery) -> Result<Article, ContentError> {
        Err(unavailable())
    }

    async fn articles(&self, _: &ContentQuery) -> Result<ArticleList, ContentError> {
        Err(unavailable())
    }
}

fn unavailable() -> ContentError {
    ContentError::Api {
        status: 503,
        message: String::from("Service Unavailable"),
    }
}

pub async fn client_with(source: SharedSource, cache: Arc<PageCache>) -> Client {
    Client::tracked(webserver::rocket_server(source, cache))
        .await
        .expect("valid rocket instance")
}

pub async fn client(articles: Vec<Article>) -> Client {
    client_with(
        Arc::new(RecordingSource::new(articles)),
        Arc::new(PageCache::default()),
    )
    .await
}
