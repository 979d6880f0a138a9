use super::Configuration;

pub struct SiteName;

impl Configuration for SiteName {
    type Type = String;

    fn default() -> Option<Self::Type> {
        Some(String::from("Blog"))
    }

    fn key() -> &'static str {
        "site-name"
    }
}

/// UI language used when `Accept-Language` matches none of the bundled
/// string tables.
pub struct SitePrimaryLocale;

impl Configuration for SitePrimaryLocale {
    type Type = String;

    fn default() -> Option<Self::Type> {
        Some(String::from("en-US"))
    }

    fn key() -> &'static str {
        "site-primary-locale"
    }
}
