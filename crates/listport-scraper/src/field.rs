//! Variant decoding for vendor fields that arrive in more than one shape.
//!
//! Vendors disagree with themselves: a price is sometimes `19.99` and
//! sometimes `"$19.99"`, a brand is a string or `{ "name": .., "slogan": .. }`,
//! image lists mix bare URLs with `{ "url": .. }` objects. Each shape is an
//! untagged enum decoded once here, so adapter mappers only ever see
//! `Option<f64>` / `Option<String>`.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};

use listport_core::MAX_PRODUCT_IMAGES;

/// A numeric field that may be sent as a number or a formatted string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberField {
    Number(f64),
    Text(String),
}

impl NumberField {
    /// Numeric value, parsing currency-formatted text when needed.
    pub(crate) fn value(&self) -> Option<f64> {
        match self {
            NumberField::Number(n) if n.is_finite() => Some(*n),
            NumberField::Number(_) => None,
            NumberField::Text(s) => parse_amount(s),
        }
    }
}

/// A brand given either as a plain string or as a nested object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum BrandField {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        slogan: Option<String>,
    },
}

impl BrandField {
    /// Brand name, preferring `name` over `slogan` for the object form.
    pub(crate) fn name(&self) -> Option<String> {
        match self {
            BrandField::Name(name) => non_empty(Some(name.clone())),
            BrandField::Detailed { name, slogan } => {
                non_empty(name.clone()).or_else(|| non_empty(slogan.clone()))
            }
        }
    }
}

/// One entry of an image list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ImageEntry {
    Url(String),
    Object {
        #[serde(alias = "src", alias = "link")]
        url: String,
    },
    Other(IgnoredAny),
}

impl ImageEntry {
    fn as_url(&self) -> Option<&str> {
        match self {
            ImageEntry::Url(url) | ImageEntry::Object { url } => Some(url.trim()),
            ImageEntry::Other(_) => None,
        }
        .filter(|url| is_absolute_http(url))
    }
}

fn is_absolute_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Parses a currency-formatted amount such as `"$1,299.99"`, `"12,50 €"` or
/// `"SAR 45"`.
///
/// A range such as `"US $12.34 - 15.67"` yields its lower bound. Within the
/// amount, the last `.` or `,` followed by one or two digits is the decimal
/// separator; every other separator is a thousands mark.
pub(crate) fn parse_amount(raw: &str) -> Option<f64> {
    let first = raw
        .split(['-', '\u{2013}', '~'])
        .find(|part| part.chars().any(|c| c.is_ascii_digit()))?;
    let cleaned: String = first
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let decimal_pos = cleaned.rfind(['.', ',']).filter(|&pos| {
        let tail = &cleaned[pos + 1..];
        (1..=2).contains(&tail.len())
    });

    let normalized: String = cleaned
        .char_indices()
        .filter_map(|(i, c)| match c {
            '.' | ',' if Some(i) == decimal_pos => Some('.'),
            '.' | ',' => None,
            digit => Some(digit),
        })
        .collect();

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Merges image candidates into the final gallery.
///
/// `lists` are in priority order and only the first one holding at least one
/// absolute URL is used. `leading` single-image fields are placed in front
/// when not already present. The result is deduplicated in order and capped
/// at [`MAX_PRODUCT_IMAGES`].
pub(crate) fn merge_images(lists: &[&[ImageEntry]], leading: &[Option<&str>]) -> Vec<String> {
    let primary: Vec<&str> = lists
        .iter()
        .map(|list| list.iter().filter_map(ImageEntry::as_url).collect::<Vec<_>>())
        .find(|urls| !urls.is_empty())
        .unwrap_or_default();

    let front = leading
        .iter()
        .filter_map(|url| url.map(str::trim))
        .filter(|url| is_absolute_http(url));

    let mut images: Vec<String> = Vec::new();
    for url in front.chain(primary) {
        if images.len() >= MAX_PRODUCT_IMAGES {
            break;
        }
        if !images.iter().any(|seen| seen == url) {
            images.push(url.to_owned());
        }
    }
    images
}

/// An identifier sent either as a string or as a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum IdField {
    Text(String),
    Number(u64),
}

impl IdField {
    pub(crate) fn as_string(&self) -> Option<String> {
        match self {
            IdField::Text(s) => non_empty(Some(s.clone())),
            IdField::Number(n) => Some(n.to_string()),
        }
    }
}

/// `deserialize_with` helper: decodes `T` when the value has the expected
/// shape and yields `None` otherwise, so one odd nested field cannot fail
/// the whole item.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`] for lists, yielding an empty list on a shape mismatch.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Renders a scalar JSON value as specification text; nested values are skipped.
pub(crate) fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => non_empty(Some(s.clone())),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Converts a review count to an integer; zero and negative counts are absent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn count_value(count: f64) -> Option<u64> {
    (count >= 1.0).then(|| count.round() as u64)
}

/// Treats blank strings as absent and trims the rest.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}
