use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// One row of the videos table as NocoDB returns it. Every column is
/// optional; columns that are not listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VideoListItem {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient", rename = "VideoID", skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub thumb_high: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub video_genre: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ticker_symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub main_topic: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sentiment_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub persons: Option<Vec<LabelEntry>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub companies: Option<Vec<LabelEntry>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub indicators: Option<Vec<LabelEntry>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub trends: Option<Vec<LabelEntry>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub institutions: Option<Vec<LabelEntry>>,

    #[serde(default, deserialize_with = "lenient_strings", skip_serializing_if = "Option::is_none")]
    pub investable_assets: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings", skip_serializing_if = "Option::is_none")]
    pub events_fairs: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings", rename = "DOIs", skip_serializing_if = "Option::is_none")]
    pub dois: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings", skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings", skip_serializing_if = "Option::is_none")]
    pub primary_sources: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_strings", skip_serializing_if = "Option::is_none")]
    pub technical_terms: Option<Vec<String>>,
}

/// Columns requested from NocoDB for list views.
pub const VIDEO_LIST_FIELDS: [&str; 26] = [
    "Id",
    "Title",
    "URL",
    "VideoID",
    "ThumbHigh",
    "CreatedAt",
    "PublishedAt",
    "VideoGenre",
    "TickerSymbol",
    "MainTopic",
    "SentimentReason",
    "Channel",
    "Description",
    "Speaker",
    "Sentiment",
    "Persons",
    "Companies",
    "Indicators",
    "Trends",
    "Institutions",
    "InvestableAssets",
    "EventsFairs",
    "DOIs",
    "Hashtags",
    "PrimarySources",
    "TechnicalTerms",
];

/// Reads a column whose stored shape may not match the model. A value of the
/// wrong shape reads as absent rather than failing the whole row.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// String list columns keep their string elements and drop anything else.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(None),
    };

    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
    ))
}

/// Element of a label column. The store holds either bare strings or linked
/// records exposing a `Title` or a `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelEntry {
    Text(String),
    Record(LabelRecord),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    #[serde(default, rename = "Title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LabelEntry {
    /// The text filters compare against: the string itself, else a non-empty
    /// `Title`, else `name`.
    pub fn comparable_label(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Record(record) => record
                .title
                .as_deref()
                .filter(|title| !title.is_empty())
                .or(record.name.as_deref()),
            Self::Other(_) => None,
        }
    }
}

/// Sentiment score, stored either as text or as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sentiment {
    Number(serde_json::Number),
    Text(String),
}

impl Sentiment {
    /// Renders numbers the way a browser would print them: `1.0` reads as
    /// `"1"`, `0.25` as `"0.25"` and `1e21` as `"1e+21"`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text.as_str()),
            Self::Number(number) => {
                if let Some(value) = number.as_i64() {
                    return Cow::Owned(value.to_string());
                }
                if let Some(value) = number.as_u64() {
                    return Cow::Owned(value.to_string());
                }
                match number.as_f64() {
                    Some(value) => Cow::Owned(float_text(value)),
                    None => Cow::Owned(number.to_string()),
                }
            }
        }
    }
}

/// Shortest round-trip form, switching to exponent notation outside
/// `[1e-6, 1e21)` with an explicit sign on positive exponents.
fn float_text(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }

    let exponent_form = format!("{value:e}");
    match exponent_form.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponent_form,
    }
}
