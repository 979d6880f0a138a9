//! Incremental regeneration of article pages.
//!
//! The first request for a slug resolves its props while the visitor waits.
//! Later requests are answered from the cache; once an entry is older than
//! the revalidate window it is still served, and a single background task
//! resolves it again.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use content::ContentError;
use log::{debug, warn};

use crate::static_props::{self, ArticleParams, PageProps, ResolverSettings, StaticProps};

use super::SharedSource;

#[derive(Debug)]
struct CachedPage {
    props: PageProps,
    generated_at: Instant,
    refreshing: bool,
}

#[derive(Debug, PartialEq)]
pub enum Lookup {
    Fresh(PageProps),
    /// `refresh` is true for exactly one caller per stale period.
    Stale { props: PageProps, refresh: bool },
    Missing,
}

pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct PageCache {
    entries: RwLock<HashMap<String, CachedPage>>,
    capacity: usize,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl PageCache {
    /// Once `capacity` slugs are cached, storing a new slug evicts the
    /// oldest entry.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::default(),
            capacity: capacity.max(1),
        }
    }

    pub fn lookup(&self, slug: &str, revalidate: Duration, now: Instant) -> Lookup {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(_) => return Lookup::Missing,
        };
        let entry = match entries.get_mut(slug) {
            Some(entry) => entry,
            None => return Lookup::Missing,
        };

        if now.saturating_duration_since(entry.generated_at) < revalidate {
            Lookup::Fresh(entry.props.clone())
        } else {
            let refresh = !entry.refreshing;
            entry.refreshing = true;
            Lookup::Stale {
                props: entry.props.clone(),
                refresh,
            }
        }
    }

    pub fn store(&self, slug: &str, props: PageProps, now: Instant) {
        if let Ok(mut entries) = self.entries.write() {
            if !entries.contains_key(slug) && entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.generated_at)
                    .map(|(slug, _)| slug.clone());
                if let Some(oldest) = oldest {
                    debug!("page cache full, dropping {:?}", oldest);
                    entries.remove(&oldest);
                }
            }
            entries.insert(
                slug.to_owned(),
                CachedPage {
                    props,
                    generated_at: now,
                    refreshing: false,
                },
            );
        }
    }

    /// Lets the next stale lookup schedule another refresh.
    pub fn refresh_failed(&self, slug: &str) {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(entry) = entries.get_mut(slug) {
                entry.refreshing = false;
            }
        }
    }

    pub fn evict_older_than(&self, maximum_age: Duration, now: Instant) -> usize {
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, entry| {
                    now.saturating_duration_since(entry.generated_at) < maximum_age
                });
                before - entries.len()
            }
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or_default()
    }
}

pub async fn resolve_cached(
    cache: &Arc<PageCache>,
    source: &SharedSource,
    params: ArticleParams,
    settings: &ResolverSettings,
) -> Result<StaticProps, ContentError> {
    match cache.lookup(&params.slug, settings.revalidate, Instant::now()) {
        Lookup::Fresh(props) => Ok(StaticProps::Props {
            props,
            revalidate: settings.revalidate,
        }),
        Lookup::Stale { props, refresh } => {
            if refresh {
                spawn_refresh(cache.clone(), source.clone(), params, settings.clone());
            }
            Ok(StaticProps::Props {
                props,
                revalidate: settings.revalidate,
            })
        }
        Lookup::Missing => {
            let resolved =
                static_props::resolve(source.as_ref(), Some(&params), None, settings).await?;
            if let StaticProps::Props { props, .. } = &resolved {
                cache.store(&params.slug, props.clone(), Instant::now());
            }
            Ok(resolved)
        }
    }
}

fn spawn_refresh(
    cache: Arc<PageCache>,
    source: SharedSource,
    params: ArticleParams,
    settings: ResolverSettings,
) {
    debug!("revalidating article {:?}", params.slug);
    tokio::spawn(async move {
        match static_props::resolve(source.as_ref(), Some(&params), None, &settings).await {
            Ok(StaticProps::Props { props, .. }) => {
                cache.store(&params.slug, props, Instant::now())
            }
            Ok(StaticProps::Redirect(_)) => cache.refresh_failed(&params.slug),
            Err(err) => {
                warn!("error revalidating article {:?}: {}", params.slug, err);
                cache.refresh_failed(&params.slug);
            }
        }
    });
}
