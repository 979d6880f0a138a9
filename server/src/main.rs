#[macro_use]
extern crate rocket;

use std::sync::Arc;

use content::{ContentClient, MemoryContentSource};
use log::{error, info};

use crate::{
    configuration::{
        Configuration, ConfigurationManager, ContentApiToken, ContentApiUrl, ContentFixtures,
        PageCacheCapacity,
    },
    webserver::{
        revalidation::{self, PageCache},
        SharedSource,
    },
};

mod configuration;
mod jobs;
mod static_props;
#[cfg(test)]
mod test_helpers;
mod webserver;

fn content_source() -> anyhow::Result<SharedSource> {
    if let Some(fixtures) = ContentFixtures::get() {
        info!("serving articles from {}", fixtures);
        return Ok(Arc::new(MemoryContentSource::from_json_file(&fixtures)?));
    }

    let base_url = ContentApiUrl::get().unwrap_or_default();
    info!("serving articles from {}", base_url);
    Ok(Arc::new(ContentClient::new(base_url, ContentApiToken::get())))
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let rocket = webserver::ignite();
    ConfigurationManager::shared().load_environment();

    let source = content_source()?;
    let cache = Arc::new(PageCache::with_capacity(
        PageCacheCapacity::get().unwrap_or(revalidation::DEFAULT_CAPACITY),
    ));

    let job_cache = cache.clone();
    tokio::spawn(async move {
        if let Err(err) = jobs::run(job_cache).await {
            error!("background jobs stopped: {:?}", err);
        }
    });

    webserver::main(rocket, source, cache).await?;
    Ok(())
}
