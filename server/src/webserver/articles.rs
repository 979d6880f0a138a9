use std::{sync::Arc, time::Duration};

use rocket::{http::Header, Request, State};
use rocket_dyn_templates::Template;
use serde::Serialize;

use crate::static_props::{self, ArticleParams, PageProps, ResolverSettings, StaticProps};

use super::{
    localization::UserLanguage,
    preview::PreviewMode,
    revalidation::{self, PageCache},
    Failure, FullPathAndQuery, RequestData, SharedSource,
};

/// Where a page render ends up. `Loading` only happens while the routing
/// layer is still waiting on props; the other two are terminal.
#[derive(Clone, Debug, PartialEq)]
pub enum PageState {
    Loading,
    NotFound,
    Ready(PageProps),
}

impl PageState {
    pub fn new(props: PageProps, is_fallback: bool) -> Self {
        if is_fallback {
            PageState::Loading
        } else if props.article.as_ref().map_or(false, |a| a.has_title()) {
            PageState::Ready(props)
        } else {
            PageState::NotFound
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl PageMeta {
    fn not_found() -> Self {
        Self {
            title: String::from("404"),
            ..Default::default()
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

#[derive(Serialize)]
struct ArticleContext {
    request: RequestData,
    meta: PageMeta,
    fallback: PageProps,
}

#[derive(Serialize)]
struct StatusContext {
    request: RequestData,
    meta: PageMeta,
}

#[derive(Responder)]
pub enum ArticlePage {
    Ready(Template, Header<'static>),
    #[response(status = 404)]
    NotFound(Template),
    Loading(Template),
}

fn cache_control(revalidate: Option<Duration>) -> Header<'static> {
    let value = match revalidate {
        Some(revalidate) => format!(
            "s-maxage={}, stale-while-revalidate",
            revalidate.as_secs()
        ),
        None => String::from("private, no-cache, no-store, max-age=0, must-revalidate"),
    };
    Header::new("Cache-Control", value)
}

fn render_not_found(request: RequestData) -> Template {
    Template::render(
        "not_found",
        StatusContext {
            request,
            meta: PageMeta::not_found(),
        },
    )
}

/// Renders a resolved page. `revalidate` is `None` for responses that must
/// not be cached, such as previews.
pub fn render_page(
    state: PageState,
    request: RequestData,
    revalidate: Option<Duration>,
) -> ArticlePage {
    match state {
        PageState::Loading => ArticlePage::Loading(Template::render(
            "loading",
            StatusContext {
                request,
                meta: PageMeta::default(),
            },
        )),
        PageState::NotFound => ArticlePage::NotFound(render_not_found(request)),
        PageState::Ready(props) => {
            let meta = props
                .article
                .as_ref()
                .map(|article| PageMeta {
                    title: article.title.clone(),
                    description: non_empty(&article.description),
                    image_url: non_empty(&article.img_url),
                })
                .unwrap_or_default();

            ArticlePage::Ready(
                Template::render(
                    "article",
                    ArticleContext {
                        request,
                        meta,
                        fallback: props,
                    },
                ),
                cache_control(revalidate),
            )
        }
    }
}

fn respond(
    resolved: StaticProps,
    request: RequestData,
    cacheable: bool,
) -> Result<ArticlePage, Failure> {
    match resolved {
        StaticProps::Props { props, revalidate } => Ok(render_page(
            PageState::new(props, false),
            request,
            Some(revalidate).filter(|_| cacheable),
        )),
        StaticProps::Redirect(redirect) => Err(Failure::redirect_with_status(&redirect)),
    }
}

#[get("/articles/<slug>")]
pub async fn article_by_slug(
    slug: String,
    preview: PreviewMode,
    language: UserLanguage,
    path: FullPathAndQuery,
    source: &State<SharedSource>,
    cache: &State<Arc<PageCache>>,
) -> Result<ArticlePage, Failure> {
    let request = RequestData::new(language, path, preview.is_active());
    let settings = ResolverSettings::from_configuration();
    let params = ArticleParams { slug };

    if preview.is_active() {
        // Previews always see the latest content and are never cached.
        let resolved = static_props::resolve(
            source.inner().as_ref(),
            Some(&params),
            preview.data(),
            &settings,
        )
        .await?;
        respond(resolved, request, false)
    } else {
        let resolved =
            revalidation::resolve_cached(cache.inner(), source.inner(), params, &settings)
                .await?;
        respond(resolved, request, true)
    }
}

#[get("/articles")]
pub async fn missing_slug(
    language: UserLanguage,
    path: FullPathAndQuery,
    source: &State<SharedSource>,
) -> Result<ArticlePage, Failure> {
    let request = RequestData::new(language, path, false);
    let settings = ResolverSettings::from_configuration();
    let resolved = static_props::resolve(source.inner().as_ref(), None, None, &settings).await?;
    respond(resolved, request, true)
}

#[get("/404")]
pub fn not_found_page(
    language: UserLanguage,
    path: FullPathAndQuery,
    preview: PreviewMode,
) -> ArticlePage {
    let request = RequestData::new(language, path, preview.is_active());
    ArticlePage::NotFound(render_not_found(request))
}

#[catch(404)]
pub fn not_found_catcher(request: &Request<'_>) -> Template {
    render_not_found(RequestData::new(
        UserLanguage::negotiate(request),
        FullPathAndQuery::of(request),
        false,
    ))
}
