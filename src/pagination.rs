//! Normalization of client supplied paging parameters.
//!
//! Raw values are never rejected: anything out of range is clipped into the
//! bounds below, and missing values fall back to their defaults.

use serde::Serialize;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 35;
pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_OFFSET: i64 = 0;
pub const MIN_OFFSET: i64 = 0;
pub const MAX_OFFSET: i64 = 5_000;

/// Paging values as the caller supplied them. Every field is optional and
/// independent of the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedPagination {
    pub page: u64,
    pub limit: u64,
    pub offset: u64,
}

impl PaginationParams {
    /// Builds params from raw query string values. Values that are not numbers
    /// are treated as if they had not been sent.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, offset: Option<&str>) -> Self {
        Self {
            page: parse_query_number(page),
            limit: parse_query_number(limit),
            offset: parse_query_number(offset),
        }
    }
}

impl NormalizedPagination {
    /// Offset of the first record of `page` for the current `limit`.
    pub fn page_start(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

pub fn normalize(params: PaginationParams) -> NormalizedPagination {
    let raw_limit = params
        .limit
        .or_else(|| params.page.map(|_| DEFAULT_LIMIT));
    let raw_page = params.page.unwrap_or(DEFAULT_PAGE);
    let raw_offset = params.offset.unwrap_or(DEFAULT_OFFSET);

    let limit = raw_limit.map_or(DEFAULT_LIMIT, |limit| clamp(limit, MIN_LIMIT, MAX_LIMIT));
    let page = raw_page.max(DEFAULT_PAGE);
    let offset = clamp(raw_offset, MIN_OFFSET, MAX_OFFSET);

    // All three are positive or zero after clamping.
    NormalizedPagination {
        page: page.unsigned_abs(),
        limit: limit.unsigned_abs(),
        offset: offset.unsigned_abs(),
    }
}

/// Record offset to request upstream: an explicit offset wins, otherwise the
/// offset is derived from the page number.
pub fn record_offset(params: &PaginationParams, normalized: &NormalizedPagination) -> u64 {
    if params.offset.is_some() {
        normalized.offset
    } else {
        normalized.page_start()
    }
}

fn clamp(value: i64, lo: i64, hi: i64) -> i64 {
    value.max(lo).min(hi)
}

fn parse_query_number(value: Option<&str>) -> Option<i64> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }

    // "2.5" or "1e3" still count as numbers; float to int casts saturate.
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .map(|parsed| parsed.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, limit: Option<i64>, offset: Option<i64>) -> PaginationParams {
        PaginationParams {
            page,
            limit,
            offset,
        }
    }

    #[test]
    fn empty_input_uses_defaults() {
        assert_eq!(
            normalize(PaginationParams::default()),
            NormalizedPagination {
                page: 1,
                limit: 35,
                offset: 0
            }
        );
    }

    #[test]
    fn limit_is_clamped_to_range() {
        assert_eq!(normalize(params(None, Some(500), None)).limit, 100);
        assert_eq!(normalize(params(None, Some(0), None)).limit, 1);
        assert_eq!(normalize(params(None, Some(-7), None)).limit, 1);
        assert_eq!(normalize(params(None, Some(42), None)).limit, 42);
    }

    #[test]
    fn page_without_limit_uses_default_limit() {
        let normalized = normalize(params(Some(3), None, None));
        assert_eq!(normalized.page, 3);
        assert_eq!(normalized.limit, DEFAULT_LIMIT as u64);
    }

    #[test]
    fn page_is_floored_but_unbounded() {
        assert_eq!(normalize(params(Some(0), None, None)).page, 1);
        assert_eq!(normalize(params(Some(-20), None, None)).page, 1);
        assert_eq!(normalize(params(Some(1_000_000), None, None)).page, 1_000_000);
    }

    #[test]
    fn offset_is_clamped_to_range() {
        assert_eq!(normalize(params(None, None, Some(-1))).offset, 0);
        assert_eq!(normalize(params(None, None, Some(9_999))).offset, 5_000);
        assert_eq!(normalize(params(None, None, Some(120))).offset, 120);
    }

    #[test]
    fn output_is_always_within_bounds() {
        let samples = [i64::MIN, -1, 0, 1, 35, 100, 101, 5_000, 5_001, i64::MAX];
        for page in samples {
            for limit in samples {
                for offset in samples {
                    let normalized = normalize(params(Some(page), Some(limit), Some(offset)));
                    assert!(normalized.page >= 1);
                    assert!((1..=100).contains(&normalized.limit));
                    assert!(normalized.offset <= 5_000);
                }
            }
        }
    }

    #[test]
    fn query_values_that_are_not_numbers_fall_back_to_defaults() {
        let parsed = PaginationParams::from_query(Some("abc"), Some(""), Some("NaN"));
        assert_eq!(parsed, PaginationParams::default());
        assert_eq!(
            normalize(parsed),
            NormalizedPagination {
                page: 1,
                limit: 35,
                offset: 0
            }
        );
    }

    #[test]
    fn query_values_are_trimmed_and_truncated() {
        let parsed = PaginationParams::from_query(Some(" 2 "), Some("10.9"), Some("1e2"));
        assert_eq!(parsed, params(Some(2), Some(10), Some(100)));
    }

    #[test]
    fn record_offset_prefers_explicit_offset() {
        let explicit = params(Some(4), Some(10), Some(7));
        assert_eq!(record_offset(&explicit, &normalize(explicit)), 7);

        let derived = params(Some(4), Some(10), None);
        assert_eq!(record_offset(&derived, &normalize(derived)), 30);

        let first = PaginationParams::default();
        assert_eq!(record_offset(&first, &normalize(first)), 0);
    }
}
