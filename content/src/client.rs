use async_trait::async_trait;
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::{
    schema::cms::strapi::{parse_error, parse_list, parse_single},
    Article, ArticleList, ContentError, ContentQuery,
};

/// Characters escaped when a value is placed in a single URL path segment.
pub const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Where article pages get their data from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Looks an article up by slug. Returns [`ContentError::NotFound`] when no
    /// article matches the slug and the query's filters.
    async fn single_article(&self, slug: &str, query: &ContentQuery)
        -> Result<Article, ContentError>;

    async fn articles(&self, query: &ContentQuery) -> Result<ArticleList, ContentError>;
}

/// Talks to a Strapi v4 content API over HTTP.
#[derive(Clone, Debug)]
pub struct ContentClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ContentClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn single_article_url(&self, slug: &str, query: &ContentQuery) -> String {
        self.url(
            &format!(
                "/slugify/slugs/article/{}",
                utf8_percent_encode(slug, PATH_SEGMENT)
            ),
            query,
        )
    }

    pub fn articles_url(&self, query: &ContentQuery) -> String {
        self.url("/articles", query)
    }

    fn url(&self, path: &str, query: &ContentQuery) -> String {
        let query = query.to_query_string();
        if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, ContentError> {
        debug!("requesting {}", url);

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            debug!("content api responded {} for {}", status, url);
            Err(parse_error(status.as_u16(), &body))
        }
    }
}

#[async_trait]
impl ContentSource for ContentClient {
    async fn single_article(
        &self,
        slug: &str,
        query: &ContentQuery,
    ) -> Result<Article, ContentError> {
        let body = self.fetch(&self.single_article_url(slug, query)).await?;
        parse_single(&body)
    }

    async fn articles(&self, query: &ContentQuery) -> Result<ArticleList, ContentError> {
        let body = self.fetch(&self.articles_url(query)).await?;
        parse_list(&body)
    }
}
