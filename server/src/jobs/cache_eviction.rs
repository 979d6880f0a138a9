use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::info;

use crate::{
    configuration::PageCacheMaximumAge,
    jobs::{Job, JobInstance},
    webserver::revalidation::PageCache,
};

/// Drops cached pages that have not been regenerated within
/// `page-cache-maximum-age-seconds`.
#[derive(Debug)]
struct CacheEviction {
    cache: Arc<PageCache>,
}

impl CacheEviction {
    fn evict(&self, now: Instant) -> usize {
        self.cache
            .evict_older_than(PageCacheMaximumAge::duration(), now)
    }
}

#[rocket::async_trait]
impl Job for CacheEviction {
    fn period(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn execute(&mut self) -> anyhow::Result<()> {
        let evicted = self.evict(Instant::now());
        if evicted > 0 {
            info!(
                "CacheEviction removed {} pages, {} remain",
                evicted,
                self.cache.len()
            );
        }

        Ok(())
    }
}

pub(crate) fn job(cache: Arc<PageCache>) -> JobInstance {
    CacheEviction { cache }.instance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_props::PageProps;

    #[test]
    fn evicts_pages_past_the_maximum_age() {
        let cache = Arc::new(PageCache::default());
        let start = Instant::now();
        cache.store("old", PageProps::default(), start);

        let job = CacheEviction {
            cache: cache.clone(),
        };
        assert_eq!(job.evict(start + Duration::from_secs(10)), 0);
        assert_eq!(
            job.evict(start + PageCacheMaximumAge::duration() + Duration::from_secs(1)),
            1
        );
        assert_eq!(cache.len(), 0);
    }
}
