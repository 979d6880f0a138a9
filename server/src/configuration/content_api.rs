use super::Configuration;

pub struct ContentApiUrl;

impl Configuration for ContentApiUrl {
    type Type = String;

    fn default() -> Option<Self::Type> {
        Some(String::from("http://localhost:1337/api"))
    }

    fn key() -> &'static str {
        "content-api-url"
    }
}

pub struct ContentApiToken;

impl Configuration for ContentApiToken {
    type Type = String;

    fn default() -> Option<Self::Type> {
        None
    }

    fn key() -> &'static str {
        "content-api-token"
    }
}

/// Path to a JSON file of articles. When set, articles are served from it
/// instead of the content API.
pub struct ContentFixtures;

impl Configuration for ContentFixtures {
    type Type = String;

    fn default() -> Option<Self::Type> {
        None
    }

    fn key() -> &'static str {
        "content-fixtures"
    }
}

/// Shared secret editors pass to `/api/preview`. Preview mode is disabled
/// while it is unset.
pub struct PreviewSecret;

impl Configuration for PreviewSecret {
    type Type = String;

    fn default() -> Option<Self::Type> {
        None
    }

    fn key() -> &'static str {
        "preview-secret"
    }
}
