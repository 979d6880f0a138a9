pub mod client;
mod error;
pub mod memory;
pub mod query;
pub mod schema;

pub use self::{
    client::{ContentClient, ContentSource, PATH_SEGMENT},
    error::ContentError,
    memory::MemoryContentSource,
    query::{ContentQuery, Filter, Locale, Scalar, SortDirection},
    schema::cms::{Article, ArticleList, Pagination},
};
