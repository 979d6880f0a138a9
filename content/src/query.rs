//! A typed builder for content API query strings.
//!
//! The content API parses its query string with `qs`, so nested objects are
//! written as bracketed keys: `filters[categories][name][$eq]=tech`. Values
//! are percent encoded, keys are left as-is.

use std::{cmp::Ordering, fmt};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
}

impl Scalar {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Scalar::Text(expected), Value::String(actual)) => expected == actual,
            (Scalar::Integer(expected), Value::Number(actual)) => {
                actual.as_i64() == Some(*expected)
            }
            (Scalar::Integer(expected), Value::String(actual)) => {
                actual.parse::<i64>().ok() == Some(*expected)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(text) => f.write_str(text),
            Scalar::Integer(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_owned())
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::Text(value.clone())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

/// One node of a filter tree. `Field` descends into an attribute or relation,
/// the remaining variants are the operators the article pages use.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Field(String, Box<Filter>),
    Eq(Scalar),
    Not(Scalar),
    NotIn(Vec<Scalar>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn field(name: impl Into<String>, filter: Filter) -> Self {
        Filter::Field(name.into(), Box::new(filter))
    }

    pub fn eq(value: impl Into<Scalar>) -> Self {
        Filter::Eq(value.into())
    }

    pub fn not(value: impl Into<Scalar>) -> Self {
        Filter::Not(value.into())
    }

    pub fn not_in<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        Filter::NotIn(values.into_iter().map(Into::into).collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Empty lists serialize to nothing, so they constrain nothing.
    pub fn is_unconstrained(&self) -> bool {
        match self {
            Filter::Field(_, inner) => inner.is_unconstrained(),
            Filter::NotIn(values) => values.is_empty(),
            Filter::Or(filters) => filters.is_empty(),
            Filter::Eq(_) | Filter::Not(_) => false,
        }
    }

    fn write_pairs(&self, key: &str, pairs: &mut Vec<(String, String)>) {
        match self {
            Filter::Field(name, inner) => inner.write_pairs(&format!("{}[{}]", key, name), pairs),
            Filter::Eq(value) => pairs.push((format!("{}[$eq]", key), value.to_string())),
            Filter::Not(value) => pairs.push((format!("{}[$not]", key), value.to_string())),
            Filter::NotIn(values) => {
                for (index, value) in values.iter().enumerate() {
                    pairs.push((format!("{}[$notIn][{}]", key, index), value.to_string()));
                }
            }
            Filter::Or(filters) => {
                for (index, filter) in filters.iter().enumerate() {
                    filter.write_pairs(&format!("{}[$or][{}]", key, index), pairs);
                }
            }
        }
    }

    /// Evaluates the filter against a JSON record. Relations are arrays, and
    /// a filter on an array matches when any element matches, the same way a
    /// join behaves in the content API.
    pub fn matches(&self, value: &Value) -> bool {
        if self.is_unconstrained() {
            return true;
        }

        if let Value::Array(items) = value {
            return items.iter().any(|item| self.matches(item));
        }

        match self {
            Filter::Field(name, inner) => value
                .get(name)
                .map(|field| inner.matches(field))
                .unwrap_or(false),
            Filter::Eq(expected) => expected.matches(value),
            Filter::Not(unexpected) => !unexpected.matches(value),
            Filter::NotIn(excluded) => !excluded.iter().any(|scalar| scalar.matches(value)),
            Filter::Or(filters) => filters.iter().any(|filter| filter.matches(value)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Locale {
    All,
    Code(String),
}

impl Locale {
    pub fn as_str(&self) -> &str {
        match self {
            Locale::All => "all",
            Locale::Code(code) => code,
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Locale::All => true,
            Locale::Code(code) => value.as_str() == Some(code.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentQuery {
    locale: Option<Locale>,
    sort: Vec<(String, SortDirection)>,
    populate: Vec<String>,
    limit: Option<usize>,
    filters: Vec<Filter>,
}

impl ContentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    pub fn populate(mut self, relation: impl Into<String>) -> Self {
        self.populate.push(relation.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn requested_locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    pub fn sorting(&self) -> &[(String, SortDirection)] {
        &self.sort
    }

    pub fn page_limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(locale) = &self.locale {
            pairs.push((String::from("locale"), locale.as_str().to_owned()));
        }

        match self.sort.as_slice() {
            [] => {}
            [(field, direction)] => {
                pairs.push((String::from("sort"), format!("{}:{}", field, direction.as_str())))
            }
            sorts => {
                for (index, (field, direction)) in sorts.iter().enumerate() {
                    pairs.push((
                        format!("sort[{}]", index),
                        format!("{}:{}", field, direction.as_str()),
                    ));
                }
            }
        }

        if !self.populate.is_empty() {
            pairs.push((String::from("populate"), self.populate.join(",")));
        }

        if let Some(limit) = self.limit {
            pairs.push((String::from("pagination[limit]"), limit.to_string()));
        }

        for filter in &self.filters {
            filter.write_pairs("filters", &mut pairs);
        }

        pairs
    }

    pub fn to_query_string(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(key, value)| format!("{}={}", key, utf8_percent_encode(value, QUERY_VALUE)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Checks the locale and filters against a record. Sorting and limits are
    /// applied by the caller.
    pub fn matches(&self, record: &Value) -> bool {
        let locale_matches = self
            .locale
            .as_ref()
            .map(|locale| locale.matches(record.get("locale").unwrap_or(&Value::Null)))
            .unwrap_or(true);

        locale_matches && self.filters.iter().all(|filter| filter.matches(record))
    }

    /// Orders two records by this query's sort fields.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (field, direction) in &self.sort {
            let ordering = compare_values(
                a.get(field).unwrap_or(&Value::Null),
                b.get(field).unwrap_or(&Value::Null),
            );
            let ordering = match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
