//! Resolves the data an article page is rendered from.
//!
//! Resolution is a two step pipeline: the article is looked up by slug, then
//! (only if it exists) the articles similar to it are listed. Each step has
//! its own typed result so the dependency between them stays visible.

use std::time::Duration;

use content::{
    Article, ContentError, ContentQuery, ContentSource, Filter, Locale, SortDirection,
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::configuration::{
    Configuration, FilteredTags, RevalidateSeconds, SimilarArticlesLimit,
};

pub const PREVIEW_CATEGORY: &str = "Preview";
pub const NOT_FOUND_PATH: &str = "/404";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArticleParams {
    pub slug: String,
}

/// The payload stored in the preview cookie. Only the presence of a
/// non-empty slug matters; it switches the page into preview mode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewData {
    pub slug: Option<String>,
}

impl PreviewData {
    pub fn is_active(&self) -> bool {
        self.slug.as_deref().map_or(false, |slug| !slug.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolverSettings {
    pub filtered_tags: Vec<String>,
    pub similar_articles_limit: usize,
    pub revalidate: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            filtered_tags: vec![String::from(PREVIEW_CATEGORY)],
            similar_articles_limit: 6,
            revalidate: Duration::from_secs(60),
        }
    }
}

impl ResolverSettings {
    pub fn from_configuration() -> Self {
        let defaults = Self::default();
        Self {
            filtered_tags: FilteredTags::get().unwrap_or(defaults.filtered_tags),
            similar_articles_limit: SimilarArticlesLimit::get()
                .unwrap_or(defaults.similar_articles_limit),
            revalidate: RevalidateSeconds::duration(),
        }
    }
}

/// Everything the renderer needs. The serialized keys double as the
/// data-priming keys the page embeds for client-side reads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageProps {
    #[serde(rename = "/article")]
    pub article: Option<Article>,
    #[serde(rename = "/similarArticles")]
    pub similar_articles: Vec<Article>,
    #[serde(rename = "isPreviewMode")]
    pub is_preview_mode: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NotFoundRedirect {
    pub destination: &'static str,
    pub status_code: u16,
    pub permanent: bool,
}

impl Default for NotFoundRedirect {
    fn default() -> Self {
        Self {
            destination: NOT_FOUND_PATH,
            status_code: 404,
            permanent: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StaticProps {
    Props {
        props: PageProps,
        revalidate: Duration,
    },
    Redirect(NotFoundRedirect),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CategoryFilter {
    ExcludeTags(Vec<String>),
    PreviewOnly,
}

impl CategoryFilter {
    pub fn new(preview: Option<&PreviewData>, filtered_tags: &[String]) -> Self {
        if preview.map_or(false, PreviewData::is_active) {
            CategoryFilter::PreviewOnly
        } else {
            CategoryFilter::ExcludeTags(filtered_tags.to_vec())
        }
    }

    pub fn to_filter(&self) -> Filter {
        let name = match self {
            CategoryFilter::ExcludeTags(tags) => Filter::not_in(tags),
            CategoryFilter::PreviewOnly => Filter::eq(PREVIEW_CATEGORY),
        };
        Filter::field("categories", Filter::field("name", name))
    }
}

pub fn article_query(category_filter: &CategoryFilter) -> ContentQuery {
    ContentQuery::new()
        .populate("categories")
        .populate("image")
        .locale(Locale::All)
        .filter(category_filter.to_filter())
}

pub fn similar_articles_query(article: &Article, limit: usize) -> ContentQuery {
    ContentQuery::new()
        .locale(Locale::Code(article.locale.clone()))
        .sort("createdAt", SortDirection::Descending)
        .populate("categories")
        .populate("image")
        .limit(limit)
        .filter(Filter::field("id", Filter::not(article.id)))
        .filter(Filter::field(
            "categories",
            Filter::or(
                article
                    .categories
                    .iter()
                    .map(|category| Filter::field("name", Filter::eq(category))),
            ),
        ))
}

/// First step: the article itself. A content API "not found" is an absent
/// article, every other failure is returned as-is.
pub async fn fetch_article(
    source: &dyn ContentSource,
    slug: &str,
    category_filter: &CategoryFilter,
) -> Result<Option<Article>, ContentError> {
    match source
        .single_article(slug, &article_query(category_filter))
        .await
    {
        Ok(article) => Ok(Some(article)),
        Err(ContentError::NotFound) => {
            debug!("no article found for slug {:?}", slug);
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

/// Second step: articles sharing a category with `article`, newest first.
pub async fn fetch_similar_articles(
    source: &dyn ContentSource,
    article: &Article,
    limit: usize,
) -> Result<Vec<Article>, ContentError> {
    let mut similar = source
        .articles(&similar_articles_query(article, limit))
        .await?
        .data;
    similar.retain(|candidate| candidate.id != article.id);
    similar.truncate(limit);
    Ok(similar)
}

pub async fn resolve(
    source: &dyn ContentSource,
    params: Option<&ArticleParams>,
    preview: Option<&PreviewData>,
    settings: &ResolverSettings,
) -> Result<StaticProps, ContentError> {
    let params = match params {
        Some(params) => params,
        None => return Ok(StaticProps::Redirect(NotFoundRedirect::default())),
    };

    let is_preview_mode = preview.map_or(false, PreviewData::is_active);
    let category_filter = CategoryFilter::new(preview, &settings.filtered_tags);

    let article = fetch_article(source, &params.slug, &category_filter).await?;
    let similar_articles = match &article {
        Some(article) => {
            fetch_similar_articles(source, article, settings.similar_articles_limit).await?
        }
        None => Vec::new(),
    };

    Ok(StaticProps::Props {
        props: PageProps {
            article,
            similar_articles,
            is_preview_mode,
        },
        revalidate: settings.revalidate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_article, FailingSource, RecordingSource};

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_owned(), value.to_owned())
    }

    fn params(slug: &str) -> ArticleParams {
        ArticleParams {
            slug: slug.to_owned(),
        }
    }

    fn preview() -> PreviewData {
        PreviewData {
            slug: Some(String::from("my-post")),
        }
    }

    #[test]
    fn preview_marker_needs_a_slug() {
        assert!(preview().is_active());
        assert!(!PreviewData::default().is_active());
        assert!(!PreviewData {
            slug: Some(String::new())
        }
        .is_active());
    }

    #[test]
    fn public_filter_excludes_every_filtered_tag() {
        let tags = vec![String::from("Preview"), String::from("Ventures")];
        let filter = CategoryFilter::new(None, &tags);
        assert_eq!(filter, CategoryFilter::ExcludeTags(tags.clone()));

        let pairs = article_query(&filter).to_pairs();
        assert!(pairs.contains(&pair("filters[categories][name][$notIn][0]", "Preview")));
        assert!(pairs.contains(&pair("filters[categories][name][$notIn][1]", "Ventures")));
        assert!(pairs.contains(&pair("locale", "all")));
        assert!(pairs.contains(&pair("populate", "categories,image")));
    }

    #[test]
    fn preview_filter_matches_only_preview() {
        let tags = vec![String::from("Preview")];
        let filter = CategoryFilter::new(Some(&preview()), &tags);
        assert_eq!(filter, CategoryFilter::PreviewOnly);

        let pairs = article_query(&filter).to_pairs();
        assert!(pairs.contains(&pair("filters[categories][name][$eq]", "Preview")));
        assert!(!pairs.iter().any(|(key, _)| key.contains("$notIn")));

        // An inactive marker stays in public mode.
        assert_eq!(
            CategoryFilter::new(Some(&PreviewData::default()), &tags),
            CategoryFilter::ExcludeTags(tags)
        );
    }

    #[test]
    fn similar_query_for_tech_and_news_article() {
        let article = Article {
            locale: String::from("en"),
            categories: vec![String::from("tech"), String::from("news")],
            ..Article::new(5, "my-post", "My Post")
        };

        assert_eq!(
            similar_articles_query(&article, 6).to_pairs(),
            vec![
                pair("locale", "en"),
                pair("sort", "createdAt:desc"),
                pair("populate", "categories,image"),
                pair("pagination[limit]", "6"),
                pair("filters[id][$not]", "5"),
                pair("filters[categories][$or][0][name][$eq]", "tech"),
                pair("filters[categories][$or][1][name][$eq]", "news"),
            ]
        );
    }

    #[rocket::async_test]
    async fn missing_params_redirect_to_not_found() {
        let source = RecordingSource::new(Vec::new());
        let resolved = resolve(&source, None, None, &ResolverSettings::default())
            .await
            .unwrap();

        assert_eq!(
            resolved,
            StaticProps::Redirect(NotFoundRedirect {
                destination: "/404",
                status_code: 404,
                permanent: false,
            })
        );
        assert!(source.article_requests().is_empty());
    }

    #[rocket::async_test]
    async fn unknown_slug_resolves_to_props_without_article() {
        let source = RecordingSource::new(vec![sample_article(1, "other", &["tech"])]);
        let resolved = resolve(
            &source,
            Some(&params("missing")),
            None,
            &ResolverSettings::default(),
        )
        .await
        .unwrap();

        match resolved {
            StaticProps::Props { props, revalidate } => {
                assert_eq!(props.article, None);
                assert!(props.similar_articles.is_empty());
                assert!(!props.is_preview_mode);
                assert_eq!(revalidate, Duration::from_secs(60));
            }
            other => panic!("unexpected resolution {:?}", other),
        }
        assert_eq!(source.article_requests().len(), 1);
        assert!(source.list_requests().is_empty());
    }

    #[rocket::async_test]
    async fn resolves_article_and_similar_articles() {
        let source = RecordingSource::new(vec![
            sample_article(5, "my-post", &["tech", "news"]),
            sample_article(6, "tech-one", &["tech"]),
            sample_article(7, "news-one", &["news"]),
            sample_article(8, "cooking", &["food"]),
        ]);

        let resolved = resolve(
            &source,
            Some(&params("my-post")),
            None,
            &ResolverSettings::default(),
        )
        .await
        .unwrap();

        let props = match resolved {
            StaticProps::Props { props, revalidate } => {
                assert_eq!(revalidate.as_secs(), 60);
                props
            }
            other => panic!("unexpected resolution {:?}", other),
        };
        assert_eq!(props.article.as_ref().map(|a| a.id), Some(5));
        let similar = props
            .similar_articles
            .iter()
            .map(|a| a.id)
            .collect::<Vec<_>>();
        assert_eq!(similar, vec![7, 6]);

        let requested = source.list_requests();
        assert_eq!(requested.len(), 1);
        assert_eq!(
            requested[0],
            similar_articles_query(props.article.as_ref().unwrap(), 6)
        );
    }

    #[rocket::async_test]
    async fn similar_articles_never_include_self_or_exceed_limit() {
        let mut articles = vec![sample_article(1, "main", &["tech"])];
        for id in 2..=10 {
            articles.push(sample_article(id, &format!("post-{}", id), &["tech"]));
        }
        // Ignores the query entirely, so only local trimming protects the page.
        let source = RecordingSource::ignoring_queries(articles);

        let resolved = resolve(
            &source,
            Some(&params("main")),
            None,
            &ResolverSettings::default(),
        )
        .await
        .unwrap();

        match resolved {
            StaticProps::Props { props, .. } => {
                assert_eq!(props.similar_articles.len(), 6);
                assert!(props.similar_articles.iter().all(|a| a.id != 1));
            }
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[rocket::async_test]
    async fn preview_mode_reaches_preview_articles() {
        let source = RecordingSource::new(vec![
            sample_article(1, "draft", &["Preview"]),
            sample_article(2, "draft-related", &["Preview"]),
        ]);
        let settings = ResolverSettings::default();

        let public = resolve(&source, Some(&params("draft")), None, &settings)
            .await
            .unwrap();
        assert!(matches!(
            public,
            StaticProps::Props { ref props, .. } if props.article.is_none()
        ));

        match resolve(&source, Some(&params("draft")), Some(&preview()), &settings)
            .await
            .unwrap()
        {
            StaticProps::Props { props, .. } => {
                assert!(props.is_preview_mode);
                assert_eq!(props.article.map(|a| a.id), Some(1));
            }
            other => panic!("unexpected resolution {:?}", other),
        }
    }

    #[rocket::async_test]
    async fn fetch_failures_propagate() {
        let result = resolve(
            &FailingSource,
            Some(&params("my-post")),
            None,
            &ResolverSettings::default(),
        )
        .await;

        assert!(matches!(result, Err(ContentError::Api { status: 503, .. })));
    }
}
