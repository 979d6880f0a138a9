use std::{
    collections::HashMap,
    env,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::DateTime;
use content::ContentSource;
use log::error;
use rocket::{
    fs::FileServer,
    http::Status,
    request::{FromRequest, Outcome},
    response::{status, Redirect},
    Build, Request, Rocket,
};
use rocket_dyn_templates::{
    tera::{self, Value},
    Template,
};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{Configuration, ConfigurationManager, RevalidateSeconds, SiteName},
    static_props::NotFoundRedirect,
};

use self::{localization::UserLanguage, revalidation::PageCache};

pub mod articles;
pub mod localization;
pub mod preview;
pub mod revalidation;

pub type SharedSource = Arc<dyn ContentSource>;

fn root_path() -> PathBuf {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").ok().map(PathBuf::from);
    match manifest_dir.as_deref().and_then(Path::parent) {
        Some(root) => root.to_path_buf(),
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Creates the bare Rocket instance. Rocket installs its logger here, so
/// anything logged before this call is lost.
pub fn ignite() -> Rocket<Build> {
    let figment =
        rocket::Config::figment().merge(("template_dir", root_path().join("templates")));
    rocket::custom(figment)
}

pub fn rocket_server(source: SharedSource, cache: Arc<PageCache>) -> Rocket<Build> {
    mount(ignite(), source, cache)
}

pub fn mount(rocket: Rocket<Build>, source: SharedSource, cache: Arc<PageCache>) -> Rocket<Build> {
    rocket
        .attach(Template::custom(|engines| {
            engines
                .tera
                .register_filter("render_markdown", MarkdownFilter);
            engines.tera.register_filter("format_date", DateFilter);
            engines.tera.register_filter("script_json", ScriptJsonFilter);
            engines
                .tera
                .register_filter("language_code", localization::LanguageCode);
            engines
                .tera
                .register_function("localize", localization::Localize);
            engines
                .tera
                .register_function("site_name", TeraConfiguration::<SiteName>::default());
            engines.tera.register_function(
                "revalidate_seconds",
                TeraConfiguration::<RevalidateSeconds>::default(),
            );
        }))
        .manage(source)
        .manage(cache)
        .mount(
            "/",
            routes![
                articles::article_by_slug,
                articles::missing_slug,
                articles::not_found_page,
                preview::enter_preview,
                preview::exit_preview,
            ],
        )
        .mount("/static", FileServer::from(root_path().join("static")))
        .register("/", catchers![articles::not_found_catcher])
}

pub async fn main(
    rocket: Rocket<Build>,
    source: SharedSource,
    cache: Arc<PageCache>,
) -> Result<(), rocket::Error> {
    mount(rocket, source, cache).launch().await?;
    Ok(())
}

pub struct TeraConfiguration<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for TeraConfiguration<T> {
    fn default() -> Self {
        Self {
            _phantom: Default::default(),
        }
    }
}

/// Exposes a configuration value to templates with its JSON type intact, so
/// numbers reach Fluent as numbers.
impl<T> tera::Function for TeraConfiguration<T>
where
    T: Configuration + Send + Sync,
{
    fn call(&self, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let manager = ConfigurationManager::shared();
        let value = manager
            .get::<T>()
            .ok_or_else(|| tera::Error::msg("no value found"))?;
        serde_json::to_value(value)
            .map_err(|err| tera::Error::msg(format!("unable to encode {}: {}", T::key(), err)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestData {
    pub language: String,
    pub current_path: String,
    pub current_query: Option<String>,
    pub current_path_and_query: String,
    pub preview_mode: bool,
}

#[derive(Debug)]
pub struct FullPathAndQuery {
    pub path: String,
    pub query: Option<String>,
}

impl FullPathAndQuery {
    pub fn of(request: &Request<'_>) -> Self {
        Self {
            path: request.uri().path().to_string(),
            query: request.uri().query().map(|q| q.to_string()),
        }
    }
}

impl RequestData {
    pub fn new(language: UserLanguage, path: FullPathAndQuery, preview_mode: bool) -> Self {
        let mut current_path_and_query = path.path.clone();
        if let Some(query) = &path.query {
            current_path_and_query += "?";
            current_path_and_query += query;
        }

        Self {
            language: language.0,
            current_path: path.path,
            current_query: path.query,
            current_path_and_query,
            preview_mode,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for FullPathAndQuery {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(FullPathAndQuery::of(request))
    }
}

struct MarkdownFilter;

impl tera::Filter for MarkdownFilter {
    fn filter(&self, markdown_source: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
        let markdown = markdown_source.as_str().ok_or_else(|| {
            tera::Error::msg("Value passed to markdown filter needs to be a string")
        })?;
        Ok(Value::String(comrak::markdown_to_html(
            markdown,
            &comrak::Options::default(),
        )))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Formats an RFC 3339 timestamp as a long date. Missing dates render empty.
struct DateFilter;

impl tera::Filter for DateFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let timestamp = match value {
            Value::Null => return Ok(Value::String(String::new())),
            Value::String(timestamp) => timestamp,
            _ => return Err(tera::Error::msg("format_date expects a timestamp string")),
        };
        let format = args
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("%B %-d, %Y");

        match DateTime::parse_from_rfc3339(timestamp) {
            Ok(date) => Ok(Value::String(date.format(format).to_string())),
            Err(_) => Ok(Value::String(timestamp.clone())),
        }
    }
}

/// Serializes a value as JSON that is safe to place inside a `<script>` tag.
struct ScriptJsonFilter;

impl tera::Filter for ScriptJsonFilter {
    fn filter(&self, value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
        let json = serde_json::to_string(value)
            .map_err(|err| tera::Error::msg(format!("unable to encode json: {}", err)))?;
        Ok(Value::String(
            json.replace('<', "\\u003c")
                .replace('>', "\\u003e")
                .replace('&', "\\u0026"),
        ))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

#[derive(Responder)]
pub enum Failure {
    Status(Status),
    StatusRedirect(status::Custom<Redirect>),
}

impl<E> From<E> for Failure
where
    E: std::error::Error,
{
    fn from(error: E) -> Self {
        error!("error processing request: {:?}", error);

        Failure::Status(Status::InternalServerError)
    }
}

impl Failure {
    pub fn redirect_with_status(redirect: &NotFoundRedirect) -> Self {
        let status = Status::from_code(redirect.status_code).unwrap_or(Status::NotFound);
        let target = if redirect.permanent {
            Redirect::permanent(redirect.destination)
        } else {
            Redirect::temporary(redirect.destination)
        };
        Failure::StatusRedirect(status::Custom(status, target))
    }

    pub fn not_found() -> Self {
        Self::Status(Status::NotFound)
    }

    pub fn unauthorized() -> Self {
        Self::Status(Status::Unauthorized)
    }

    pub fn bad_request() -> Self {
        Self::Status(Status::BadRequest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera::Filter;

    #[test]
    fn script_json_escapes_markup() {
        let value = serde_json::json!({ "title": "</script><b>&" });
        let encoded = ScriptJsonFilter.filter(&value, &HashMap::new()).unwrap();
        assert_eq!(
            encoded.as_str().unwrap(),
            r#"{"title":"\u003c/script\u003e\u003cb\u003e\u0026"}"#
        );
    }

    #[test]
    fn dates_are_formatted() {
        let formatted = DateFilter
            .filter(
                &Value::String(String::from("2023-04-01T10:00:00+00:00")),
                &HashMap::new(),
            )
            .unwrap();
        assert_eq!(formatted.as_str(), Some("April 1, 2023"));

        let empty = DateFilter.filter(&Value::Null, &HashMap::new()).unwrap();
        assert_eq!(empty.as_str(), Some(""));
    }

    #[test]
    fn configuration_functions_keep_value_types() {
        use tera::Function;

        let seconds = TeraConfiguration::<RevalidateSeconds>::default()
            .call(&HashMap::new())
            .unwrap();
        assert!(seconds.is_number());

        let name = TeraConfiguration::<SiteName>::default()
            .call(&HashMap::new())
            .unwrap();
        assert_eq!(name.as_str(), Some("Blog"));
    }

    #[test]
    fn ignite_enables_logging() {
        let _rocket = ignite();
        assert!(log::max_level() >= log::LevelFilter::Warn);
    }

    #[test]
    fn markdown_is_rendered() {
        let html = MarkdownFilter
            .filter(&Value::String(String::from("**bold**")), &HashMap::new())
            .unwrap();
        assert_eq!(html.as_str(), Some("<p><strong>bold</strong></p>\n"));
    }

    #[test]
    fn not_found_redirects_keep_their_status() {
        match Failure::redirect_with_status(&NotFoundRedirect::default()) {
            Failure::StatusRedirect(status::Custom(status, _)) => {
                assert_eq!(status, Status::NotFound)
            }
            _ => panic!("expected a redirect"),
        }
    }
}
