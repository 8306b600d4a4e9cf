//! Page window arithmetic for listing endpoints.
//!
//! Two pagination strategies exist, page/limit and offset/limit; a listing
//! endpoint uses exactly one of them ([`PaginationStyle`]). Both share the
//! same limit rules: default [`DEFAULT_LIMIT`], hard cap [`MAX_LIMIT`], and
//! zero, negative or non-numeric input treated as absent.
//!
//! Windows are recomputed from the current total on every request. No cursor
//! survives between requests, so rows written between two page fetches can
//! shift across a page boundary (a row may repeat or be skipped).

use crate::query::RawPagination;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStyle {
    Page,
    #[default]
    Offset,
}

impl FromStr for PaginationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page" => Ok(PaginationStyle::Page),
            "offset" => Ok(PaginationStyle::Offset),
            other => Err(format!("unknown pagination style: {other}")),
        }
    }
}

impl fmt::Display for PaginationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaginationStyle::Page => "page",
            PaginationStyle::Offset => "offset",
        })
    }
}

/// Parsed pagination request, before the total is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Page { page: u64, limit: u64 },
    Offset { offset: u64, limit: u64 },
}

/// Leading integer of `raw` (optional sign, then digits; trailing text is
/// ignored), saturating at `u64::MAX`. `None` unless strictly positive.
fn positive(raw: Option<&str>) -> Option<u64> {
    let s = raw?.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if negative || digits.is_empty() {
        return None;
    }
    // all-digit input only fails to parse on overflow
    let n = digits.parse::<u64>().unwrap_or(u64::MAX);
    (n > 0).then_some(n)
}

pub fn effective_limit(raw: Option<&str>) -> u64 {
    positive(raw).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
}

impl Pagination {
    pub fn from_raw(style: PaginationStyle, raw: &RawPagination) -> Self {
        let limit = effective_limit(raw.limit.as_deref());
        match style {
            PaginationStyle::Page => Pagination::Page {
                page: positive(raw.page.as_deref()).unwrap_or(1),
                limit,
            },
            PaginationStyle::Offset => Pagination::Offset {
                offset: positive(raw.offset.as_deref()).unwrap_or(0),
                limit,
            },
        }
    }

    pub fn limit(&self) -> u64 {
        match *self {
            Pagination::Page { limit, .. } | Pagination::Offset { limit, .. } => limit,
        }
    }

    pub fn skip(&self) -> u64 {
        match *self {
            Pagination::Page { page, limit } => page.saturating_sub(1).saturating_mul(limit),
            Pagination::Offset { offset, .. } => offset,
        }
    }

    pub fn style(&self) -> PaginationStyle {
        match self {
            Pagination::Page { .. } => PaginationStyle::Page,
            Pagination::Offset { .. } => PaginationStyle::Offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// The concrete skip/limit for one fetch plus the total it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub pagination: Pagination,
    pub skip: u64,
    pub limit: u64,
    pub total: u64,
}

impl PageWindow {
    pub fn new(pagination: Pagination, total: u64) -> Self {
        Self {
            pagination,
            skip: pagination.skip(),
            limit: pagination.limit(),
            total,
        }
    }

    /// Only emitted for page-style windows past the first page whose start
    /// still falls inside the result set.
    pub fn previous(&self) -> Option<PageRef> {
        match self.pagination {
            Pagination::Page { page, limit } if page > 1 && self.skip < self.total => {
                Some(PageRef {
                    page: page - 1,
                    limit,
                })
            }
            _ => None,
        }
    }

    /// The reported limit shrinks to the remaining row count when the next
    /// page is partial.
    pub fn next(&self) -> Option<PageRef> {
        match self.pagination {
            Pagination::Page { page, limit } => {
                let seen = page.saturating_mul(limit);
                (seen < self.total).then(|| PageRef {
                    page: page + 1,
                    limit: limit.min(self.total - seen),
                })
            }
            Pagination::Offset { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Paged {
        data: Vec<T>,
        #[serde(skip_serializing_if = "Option::is_none")]
        next: Option<PageRef>,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<PageRef>,
    },
    Totaled {
        total: u64,
        data: Vec<T>,
    },
}

impl<T> Envelope<T> {
    pub fn assemble(window: &PageWindow, data: Vec<T>) -> Self {
        match window.pagination {
            Pagination::Page { .. } => Envelope::Paged {
                data,
                next: window.next(),
                previous: window.previous(),
            },
            Pagination::Offset { .. } => Envelope::Totaled {
                total: window.total,
                data,
            },
        }
    }

    pub fn data(&self) -> &[T] {
        match self {
            Envelope::Paged { data, .. } | Envelope::Totaled { data, .. } => data,
        }
    }
}
