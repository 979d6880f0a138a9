//! Strapi v4 response envelopes.
//!
//! Every entity comes back as `{ "id": .., "attributes": { .. } }` and every
//! relation as `{ "data": entity | [entity] | null }`. These types only exist
//! to be flattened into [`Article`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{Article, ArticleList, Pagination};
use crate::ContentError;

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Default, Deserialize)]
struct Meta {
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Deserialize)]
struct Entry<A> {
    id: i64,
    attributes: A,
}

#[derive(Deserialize)]
struct Relation<T> {
    data: Option<T>,
}

impl<T> Default for Relation<T> {
    fn default() -> Self {
        Self { data: None }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleAttributes {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    categories: Relation<OneOrMany<Entry<CategoryAttributes>>>,
    #[serde(default)]
    image: Relation<OneOrMany<Entry<MediaAttributes>>>,
}

#[derive(Deserialize)]
struct CategoryAttributes {
    name: String,
}

#[derive(Deserialize)]
struct MediaAttributes {
    url: String,
}

impl From<Entry<ArticleAttributes>> for Article {
    fn from(entry: Entry<ArticleAttributes>) -> Self {
        let attributes = entry.attributes;
        let categories = attributes
            .categories
            .data
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|category| category.attributes.name)
            .collect();
        let img_url = attributes
            .image
            .data
            .and_then(|media| media.into_vec().into_iter().next())
            .map(|media| media.attributes.url)
            .unwrap_or_default();

        Self {
            id: entry.id,
            title: attributes.title.unwrap_or_default(),
            description: attributes.description.unwrap_or_default(),
            content: attributes.content.unwrap_or_default(),
            img_url,
            locale: attributes.locale.unwrap_or_default(),
            slug: attributes.slug.unwrap_or_default(),
            categories,
            created_at: attributes.created_at,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub(crate) fn parse_single(body: &str) -> Result<Article, ContentError> {
    let envelope: Envelope<Entry<ArticleAttributes>> = serde_json::from_str(body)?;
    envelope.data.map(Article::from).ok_or(ContentError::NotFound)
}

pub(crate) fn parse_list(body: &str) -> Result<ArticleList, ContentError> {
    let envelope: Envelope<Vec<Entry<ArticleAttributes>>> = serde_json::from_str(body)?;
    Ok(ArticleList {
        data: envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(Article::from)
            .collect(),
        pagination: envelope.meta.pagination,
    })
}

pub(crate) fn parse_error(status: u16, body: &str) -> ContentError {
    if status == 404 {
        return ContentError::NotFound;
    }

    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| match (error.name, error.message) {
            (Some(name), Some(message)) => Some(format!("{}: {}", name, message)),
            (name, message) => message.or(name),
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                String::from("no response body")
            } else {
                trimmed.to_owned()
            }
        });

    ContentError::Api { status, message }
}
