use std::{borrow::Cow, collections::HashMap, str::FromStr};

use fluent_templates::{
    fluent_bundle::{types::FluentNumber, FluentValue},
    Loader,
};
use rocket::{
    request::{FromRequest, Outcome},
    Request,
};
use rocket_dyn_templates::tera::{self, Value};
use unic_langid::LanguageIdentifier;

use crate::configuration::{Configuration, SitePrimaryLocale};

fluent_templates::static_loader! {
    pub static LOCALES = {
        locales: "../strings",
        fallback_language: "en-US",
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

fn parse_language(value: Option<&Value>, name: &str) -> tera::Result<LanguageIdentifier> {
    let code = value
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("{} must be a language code string", name)))?;
    LanguageIdentifier::from_str(code)
        .map_err(|_| tera::Error::msg(format!("unknown language code {:?}", code)))
}

/// `localize(key="similar-articles", language=request.language)`. Any other
/// arguments are passed to the Fluent message.
pub struct Localize;

impl tera::Function for Localize {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let key = args
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("key must be a string"))?;
        let language = parse_language(args.get("language"), "language")?;

        let fluent_args = args
            .iter()
            .filter(|(name, _)| name.as_str() != "key" && name.as_str() != "language")
            .map(|(name, value)| {
                let value = match value {
                    Value::Number(number) => FluentValue::Number(FluentNumber::new(
                        number.as_f64().unwrap_or_default(),
                        Default::default(),
                    )),
                    Value::String(text) => FluentValue::String(Cow::Owned(text.clone())),
                    other => FluentValue::String(Cow::Owned(other.to_string())),
                };
                (Cow::Owned(name.clone()), value)
            })
            .collect::<HashMap<Cow<'static, str>, FluentValue>>();

        LOCALES
            .lookup_with_args(&language, key, &fluent_args)
            .map(Value::String)
            .ok_or_else(|| tera::Error::msg(format!("unknown localization key {:?}", key)))
    }
}

/// Reduces `en-US` to `en`, for the `lang` attribute.
pub struct LanguageCode;

impl tera::Filter for LanguageCode {
    fn filter(&self, language: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
        let language = parse_language(Some(language), "language")?;
        Ok(Value::from(language.language.to_string()))
    }
}

#[derive(Debug)]
pub struct UserLanguage(pub String);

impl UserLanguage {
    pub fn negotiate(request: &Request<'_>) -> Self {
        let default_locale =
            SitePrimaryLocale::get().unwrap_or_else(|| String::from("en-US"));
        let available = LOCALES.locales().cloned().collect::<Vec<_>>();

        UserLanguage(pick_best_language(
            &default_locale,
            request.headers().get_one("Accept-Language"),
            &available,
        ))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserLanguage {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(UserLanguage::negotiate(request))
    }
}

#[derive(Debug, PartialEq)]
struct WeightedLanguage<'a> {
    code: &'a str,
    weight: f32,
}

/// Parses an `Accept-Language` header, dropping wildcards and entries with a
/// zero weight. Entries keep header order.
fn parse_accept_language(header: &str) -> Vec<WeightedLanguage<'_>> {
    header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(';');
            let code = parts.next()?.trim();
            let weight = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .next()
                .map(|q| q.parse::<f32>().unwrap_or_default())
                .unwrap_or(1.);

            if code.is_empty() || code == "*" || weight <= 0. {
                None
            } else {
                Some(WeightedLanguage { code, weight })
            }
        })
        .collect()
}

fn pick_best_language(
    default_code: &str,
    accept_language: Option<&str>,
    available: &[LanguageIdentifier],
) -> String {
    let mut best: Option<WeightedLanguage<'_>> = None;

    for candidate in accept_language.map(parse_accept_language).unwrap_or_default() {
        if best.as_ref().map_or(false, |best| best.weight >= candidate.weight) {
            continue;
        }

        let supported = LanguageIdentifier::from_str(candidate.code)
            .map(|identifier| {
                available
                    .iter()
                    .any(|locale| identifier.matches(locale, true, false))
            })
            .unwrap_or(false);

        if supported {
            best = Some(candidate);
        }
    }

    best.map(|language| language.code.to_owned())
        .unwrap_or_else(|| default_code.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages(codes: &[&str]) -> Vec<LanguageIdentifier> {
        codes
            .iter()
            .map(|code| LanguageIdentifier::from_str(code).unwrap())
            .collect()
    }

    #[test]
    fn parses_weights_and_skips_wildcards() {
        assert_eq!(
            parse_accept_language("en-US, en;q=0.9, *;q=0.5, fr;q=0"),
            vec![
                WeightedLanguage {
                    code: "en-US",
                    weight: 1.
                },
                WeightedLanguage {
                    code: "en",
                    weight: 0.9
                },
            ]
        );
        assert!(parse_accept_language("").is_empty());
    }

    #[test]
    fn falls_back_to_the_default() {
        assert_eq!(pick_best_language("en-US", None, &[]), "en-US");
        assert_eq!(
            pick_best_language("en-US", Some("de-DE,de;q=0.8"), &languages(&["en-US", "es"])),
            "en-US"
        );
    }

    #[test]
    fn prefers_the_heaviest_supported_language() {
        let available = languages(&["en-US", "es"]);
        assert_eq!(
            pick_best_language("en-US", Some("de;q=0.9,es-MX;q=0.8,es;q=0.5,en;q=0.2"), &available),
            "es"
        );
        assert_eq!(
            pick_best_language("en-US", Some("en;q=0.2,es;q=0.7"), &available),
            "es"
        );
    }

    #[test]
    fn bundled_strings_resolve() {
        let english = LanguageIdentifier::from_str("en-US").unwrap();
        assert_eq!(
            LOCALES.lookup(&english, "similar-articles-title").as_deref(),
            Some("Similar articles")
        );
    }

    fn localize(args: &[(&str, Value)]) -> tera::Result<Value> {
        use tera::Function;

        let args = args
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<HashMap<_, _>>();
        Localize.call(&args)
    }

    #[test]
    fn localize_passes_numeric_arguments() {
        let one = localize(&[
            ("key", Value::from("how-it-works-revalidate")),
            ("language", Value::from("en-US")),
            ("seconds", Value::from(1)),
        ])
        .unwrap();
        assert!(one.as_str().unwrap().starts_with("After one second "));

        let many = localize(&[
            ("key", Value::from("how-it-works-revalidate")),
            ("language", Value::from("en-US")),
            ("seconds", Value::from(60)),
        ])
        .unwrap();
        assert!(many.as_str().unwrap().starts_with("After 60 seconds "));
    }

    #[test]
    fn unknown_keys_are_template_errors() {
        let result = localize(&[
            ("key", Value::from("no-such-message")),
            ("language", Value::from("en-US")),
        ]);
        assert!(result.is_err());
    }
}
