mod content_api;
mod publishing;
mod site;

pub use self::{
    content_api::{ContentApiToken, ContentApiUrl, ContentFixtures, PreviewSecret},
    publishing::{
        FilteredTags, PageCacheCapacity, PageCacheMaximumAge, RevalidateSeconds,
        SimilarArticlesLimit,
    },
    site::{SiteName, SitePrimaryLocale},
};

use log::warn;
use once_cell::sync::OnceCell;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    env,
    sync::{Arc, RwLock},
};

pub trait Configuration {
    type Type: Serialize + DeserializeOwned;

    fn default() -> Option<Self::Type>;
    fn key() -> &'static str;

    fn get() -> Option<Self::Type>
    where
        Self: Sized,
    {
        ConfigurationManager::shared().get::<Self>()
    }

    /// `content-api-url` is read from `CONTENT_API_URL`.
    fn environment_variable() -> String
    where
        Self: Sized,
    {
        Self::key().to_uppercase().replace('-', "_")
    }
}

static SHARED_MANAGER: OnceCell<ConfigurationManager> = OnceCell::new();

#[derive(Clone, Debug, Default)]
pub struct ConfigurationManager {
    active_configuration: Arc<RwLock<HashMap<String, Value>>>,
}

impl ConfigurationManager {
    pub fn shared() -> Self {
        SHARED_MANAGER.get_or_init(Self::default).clone()
    }

    pub fn get<T: Configuration>(&self) -> Option<T::Type> {
        let configuration = self.active_configuration.read().ok()?;
        configuration
            .get(T::key())
            .and_then(|v| serde_json::value::from_value(v.clone()).ok())
            .or_else(T::default)
    }

    pub fn set<T: Configuration>(&self, value: T::Type) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        if let Ok(mut configuration) = self.active_configuration.write() {
            configuration.insert(T::key().to_owned(), value);
        }
        Ok(())
    }

    pub fn load_environment(&self) {
        self.load_with(|name| env::var(name).ok());
    }

    /// Loads every known key through `lookup`, which receives the
    /// environment variable name of the key.
    pub fn load_with<F: Fn(&str) -> Option<String>>(&self, lookup: F) {
        self.load_value::<SiteName, _>(&lookup);
        self.load_value::<SitePrimaryLocale, _>(&lookup);
        self.load_value::<ContentApiUrl, _>(&lookup);
        self.load_value::<ContentApiToken, _>(&lookup);
        self.load_value::<ContentFixtures, _>(&lookup);
        self.load_value::<PreviewSecret, _>(&lookup);
        self.load_value::<RevalidateSeconds, _>(&lookup);
        self.load_value::<SimilarArticlesLimit, _>(&lookup);
        self.load_value::<FilteredTags, _>(&lookup);
        self.load_value::<PageCacheMaximumAge, _>(&lookup);
        self.load_value::<PageCacheCapacity, _>(&lookup);
    }

    fn load_value<T, F>(&self, lookup: &F)
    where
        T: Configuration,
        F: Fn(&str) -> Option<String>,
    {
        let variable = T::environment_variable();
        let raw = match lookup(&variable) {
            Some(raw) => raw,
            None => return,
        };

        // Plain strings are accepted without JSON quoting.
        let parsed = serde_json::from_str::<T::Type>(&raw)
            .or_else(|_| serde_json::from_value::<T::Type>(Value::String(raw.clone())));

        match parsed.and_then(|value| self.set::<T>(value)) {
            Ok(()) => {}
            Err(err) => warn!("ignoring {}: {}", variable, err),
        }
    }
}
