use content::PATH_SEGMENT;
use log::info;
use percent_encoding::utf8_percent_encode;
use rocket::{
    http::{Cookie, CookieJar, SameSite},
    request::{FromRequest, Outcome},
    response::Redirect,
    Request,
};

use crate::{
    configuration::{Configuration, PreviewSecret},
    static_props::PreviewData,
};

use super::Failure;

pub const PREVIEW_COOKIE: &str = "article_preview";

/// Preview data carried by the signed preview cookie, if any.
#[derive(Debug, Default)]
pub struct PreviewMode(pub Option<PreviewData>);

impl PreviewMode {
    pub fn data(&self) -> Option<&PreviewData> {
        self.0.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.data().map_or(false, PreviewData::is_active)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PreviewMode {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let data = request
            .cookies()
            .get_private(PREVIEW_COOKIE)
            .and_then(|cookie| serde_json::from_str::<PreviewData>(cookie.value()).ok());

        Outcome::Success(PreviewMode(data))
    }
}

fn article_location(slug: &str) -> String {
    format!("/articles/{}", utf8_percent_encode(slug, PATH_SEGMENT))
}

#[get("/api/preview?<secret>&<slug>")]
pub fn enter_preview(
    secret: Option<String>,
    slug: Option<String>,
    cookies: &CookieJar<'_>,
) -> Result<Redirect, Failure> {
    let expected = PreviewSecret::get().ok_or_else(Failure::not_found)?;
    if secret.as_deref() != Some(expected.as_str()) {
        return Err(Failure::unauthorized());
    }
    let slug = slug
        .filter(|slug| !slug.is_empty())
        .ok_or_else(Failure::bad_request)?;

    let data = serde_json::to_string(&PreviewData {
        slug: Some(slug.clone()),
    })?;
    cookies.add_private(
        Cookie::build((PREVIEW_COOKIE, data))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    );

    info!("preview mode enabled for {:?}", slug);
    Ok(Redirect::temporary(article_location(&slug)))
}

#[get("/api/exit-preview?<slug>")]
pub fn exit_preview(slug: Option<String>, cookies: &CookieJar<'_>) -> Redirect {
    cookies.remove_private(Cookie::build(PREVIEW_COOKIE).path("/"));

    match slug.filter(|slug| !slug.is_empty()) {
        Some(slug) => Redirect::temporary(article_location(&slug)),
        None => Redirect::temporary("/"),
    }
}
