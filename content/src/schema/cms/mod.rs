mod article;
pub(crate) mod strapi;

pub use self::article::{Article, ArticleList, Pagination};
