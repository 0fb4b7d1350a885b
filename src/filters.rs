//! Facet filters over video records and their URL token form.
//!
//! A token is the ordered list of active filters rendered as
//! `type:value` pairs joined by `|`, with both sides percent-encoded so the
//! delimiters never appear inside a pair.

use std::{borrow::Cow, collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::video::{LabelEntry, VideoListItem};

const PAIR_DELIMITER: char = '|';
const TYPE_DELIMITER: char = ':';

/// Facet kinds a video can be filtered on. Type strings outside the known
/// set are kept as [`FilterType::Unrecognized`] so tokens survive a round
/// trip and newer clients keep working.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterType {
    Person,
    Company,
    Genre,
    Indicator,
    Trend,
    Asset,
    Ticker,
    Institution,
    Event,
    Doi,
    Hashtag,
    MainTopic,
    PrimarySource,
    Sentiment,
    SentimentReason,
    Channel,
    Description,
    TechnicalTerm,
    Speaker,
    Unrecognized(String),
}

impl FilterType {
    pub const RECOGNIZED: [FilterType; 19] = [
        FilterType::Person,
        FilterType::Company,
        FilterType::Genre,
        FilterType::Indicator,
        FilterType::Trend,
        FilterType::Asset,
        FilterType::Ticker,
        FilterType::Institution,
        FilterType::Event,
        FilterType::Doi,
        FilterType::Hashtag,
        FilterType::MainTopic,
        FilterType::PrimarySource,
        FilterType::Sentiment,
        FilterType::SentimentReason,
        FilterType::Channel,
        FilterType::Description,
        FilterType::TechnicalTerm,
        FilterType::Speaker,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "person",
            Self::Company => "company",
            Self::Genre => "genre",
            Self::Indicator => "indicator",
            Self::Trend => "trend",
            Self::Asset => "asset",
            Self::Ticker => "ticker",
            Self::Institution => "institution",
            Self::Event => "event",
            Self::Doi => "doi",
            Self::Hashtag => "hashtag",
            Self::MainTopic => "mainTopic",
            Self::PrimarySource => "primarySource",
            Self::Sentiment => "sentiment",
            Self::SentimentReason => "sentimentReason",
            Self::Channel => "channel",
            Self::Description => "description",
            Self::TechnicalTerm => "technicalTerm",
            Self::Speaker => "speaker",
            Self::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<&str> for FilterType {
    fn from(value: &str) -> Self {
        Self::RECOGNIZED
            .iter()
            .find(|known| known.as_str() == value)
            .cloned()
            .unwrap_or_else(|| Self::Unrecognized(value.to_string()))
    }
}

impl From<String> for FilterType {
    fn from(value: String) -> Self {
        match Self::from(value.as_str()) {
            Self::Unrecognized(_) => Self::Unrecognized(value),
            known => known,
        }
    }
}

impl From<FilterType> for String {
    fn from(value: FilterType) -> Self {
        match value {
            FilterType::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for FilterType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(value))
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterOption {
    #[serde(rename = "type")]
    pub kind: FilterType,
    pub value: String,
}

impl FilterOption {
    pub fn new(kind: impl Into<FilterType>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, video: &VideoListItem) -> bool {
        let value = self.value.as_str();
        match &self.kind {
            FilterType::Genre => scalar_equals(&video.video_genre, value),
            FilterType::Ticker => scalar_equals(&video.ticker_symbol, value),
            FilterType::MainTopic => scalar_equals(&video.main_topic, value),
            FilterType::SentimentReason => scalar_equals(&video.sentiment_reason, value),
            FilterType::Channel => scalar_equals(&video.channel, value),
            FilterType::Description => scalar_equals(&video.description, value),
            FilterType::Speaker => scalar_equals(&video.speaker, value),
            FilterType::Sentiment => {
                let sentiment = video
                    .sentiment
                    .as_ref()
                    .map(|sentiment| sentiment.as_text())
                    .unwrap_or(Cow::Borrowed(""));
                sentiment == value
            }
            FilterType::Person => any_label(&video.persons, value),
            FilterType::Company => any_label(&video.companies, value),
            FilterType::Indicator => any_label(&video.indicators, value),
            FilterType::Trend => any_label(&video.trends, value),
            FilterType::Institution => any_label(&video.institutions, value),
            FilterType::Asset => contains_text(&video.investable_assets, value),
            FilterType::Event => contains_text(&video.events_fairs, value),
            FilterType::Doi => contains_text(&video.dois, value),
            FilterType::Hashtag => contains_text(&video.hashtags, value),
            FilterType::PrimarySource => contains_text(&video.primary_sources, value),
            FilterType::TechnicalTerm => contains_text(&video.technical_terms, value),
            FilterType::Unrecognized(_) => true,
        }
    }
}

/// Renders filters into a single token for a URL query parameter.
pub fn serialize_filters(filters: &[FilterOption]) -> String {
    filters
        .iter()
        .map(|filter| {
            format!(
                "{}{TYPE_DELIMITER}{}",
                urlencoding::encode(filter.kind.as_str()),
                urlencoding::encode(&filter.value)
            )
        })
        .collect::<Vec<_>>()
        .join(&PAIR_DELIMITER.to_string())
}

/// Reads a token produced by [`serialize_filters`]. Missing or empty tokens
/// give no filters; decoding never fails.
pub fn deserialize_filters(token: Option<&str>) -> Vec<FilterOption> {
    let Some(token) = token.filter(|token| !token.is_empty()) else {
        return Vec::new();
    };

    token
        .split(PAIR_DELIMITER)
        .map(|segment| {
            let (kind, value) = segment.split_once(TYPE_DELIMITER).unwrap_or((segment, ""));
            FilterOption {
                kind: FilterType::from(decode_component(kind)),
                value: decode_component(value),
            }
        })
        .collect()
}

/// Keeps the videos that satisfy every filter, in their original order.
pub fn filter_videos<'a>(
    videos: &'a [VideoListItem],
    filters: &[FilterOption],
) -> Vec<&'a VideoListItem> {
    videos
        .iter()
        .filter(|video| matches_all(video, filters))
        .collect()
}

pub fn matches_all(video: &VideoListItem, filters: &[FilterOption]) -> bool {
    filters.iter().all(|filter| filter.matches(video))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValues {
    #[serde(rename = "type")]
    pub kind: FilterType,
    pub values: Vec<String>,
}

/// Distinct values of one facet across `videos`, sorted.
pub fn facet_values(videos: &[VideoListItem], kind: &FilterType) -> Vec<String> {
    let mut values = BTreeSet::new();

    for video in videos {
        match kind {
            FilterType::Genre => values.extend(video.video_genre.clone()),
            FilterType::Ticker => values.extend(video.ticker_symbol.clone()),
            FilterType::MainTopic => values.extend(video.main_topic.clone()),
            FilterType::SentimentReason => values.extend(video.sentiment_reason.clone()),
            FilterType::Channel => values.extend(video.channel.clone()),
            FilterType::Description => values.extend(video.description.clone()),
            FilterType::Speaker => values.extend(video.speaker.clone()),
            FilterType::Sentiment => values.extend(
                video
                    .sentiment
                    .as_ref()
                    .map(|sentiment| sentiment.as_text().into_owned()),
            ),
            FilterType::Person => values.extend(labels(&video.persons)),
            FilterType::Company => values.extend(labels(&video.companies)),
            FilterType::Indicator => values.extend(labels(&video.indicators)),
            FilterType::Trend => values.extend(labels(&video.trends)),
            FilterType::Institution => values.extend(labels(&video.institutions)),
            FilterType::Asset => values.extend(video.investable_assets.iter().flatten().cloned()),
            FilterType::Event => values.extend(video.events_fairs.iter().flatten().cloned()),
            FilterType::Doi => values.extend(video.dois.iter().flatten().cloned()),
            FilterType::Hashtag => values.extend(video.hashtags.iter().flatten().cloned()),
            FilterType::PrimarySource => {
                values.extend(video.primary_sources.iter().flatten().cloned())
            }
            FilterType::TechnicalTerm => {
                values.extend(video.technical_terms.iter().flatten().cloned())
            }
            FilterType::Unrecognized(_) => {}
        }
    }

    values.retain(|value| !value.trim().is_empty());
    values.into_iter().collect()
}

/// Every recognized facet that has at least one value in `videos`.
pub fn facet_summary(videos: &[VideoListItem]) -> Vec<FacetValues> {
    FilterType::RECOGNIZED
        .iter()
        .filter_map(|kind| {
            let values = facet_values(videos, kind);
            (!values.is_empty()).then(|| FacetValues {
                kind: kind.clone(),
                values,
            })
        })
        .collect()
}

fn scalar_equals(field: &Option<String>, value: &str) -> bool {
    field.as_deref() == Some(value)
}

fn any_label(field: &Option<Vec<LabelEntry>>, value: &str) -> bool {
    field.as_deref().is_some_and(|entries| {
        entries
            .iter()
            .any(|entry| entry.comparable_label() == Some(value))
    })
}

fn contains_text(field: &Option<Vec<String>>, value: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|entries| entries.iter().any(|entry| entry == value))
}

fn labels(field: &Option<Vec<LabelEntry>>) -> impl Iterator<Item = String> + '_ {
    field
        .iter()
        .flatten()
        .filter_map(LabelEntry::comparable_label)
        .map(ToString::to_string)
}

fn decode_component(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    }
}
