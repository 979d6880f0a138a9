use std::time::Duration;

use super::Configuration;

pub struct RevalidateSeconds;

impl Configuration for RevalidateSeconds {
    type Type = u64;

    fn default() -> Option<Self::Type> {
        Some(60)
    }

    fn key() -> &'static str {
        "revalidate-seconds"
    }
}

impl RevalidateSeconds {
    pub fn duration() -> Duration {
        Duration::from_secs(Self::get().unwrap_or(60))
    }
}

pub struct SimilarArticlesLimit;

impl Configuration for SimilarArticlesLimit {
    type Type = usize;

    fn default() -> Option<Self::Type> {
        Some(6)
    }

    fn key() -> &'static str {
        "similar-articles-limit"
    }
}

/// Category names that never appear in public article queries.
pub struct FilteredTags;

impl Configuration for FilteredTags {
    type Type = Vec<String>;

    fn default() -> Option<Self::Type> {
        Some(vec![String::from("Preview")])
    }

    fn key() -> &'static str {
        "filtered-tags"
    }
}

pub struct PageCacheMaximumAge;

impl Configuration for PageCacheMaximumAge {
    type Type = u64;

    fn default() -> Option<Self::Type> {
        Some(3600)
    }

    fn key() -> &'static str {
        "page-cache-maximum-age-seconds"
    }
}

impl PageCacheMaximumAge {
    pub fn duration() -> Duration {
        Duration::from_secs(Self::get().unwrap_or(3600))
    }
}

/// Upper bound on the number of slugs held by the page cache.
pub struct PageCacheCapacity;

impl Configuration for PageCacheCapacity {
    type Type = usize;

    fn default() -> Option<Self::Type> {
        Some(1024)
    }

    fn key() -> &'static str {
        "page-cache-capacity"
    }
}
