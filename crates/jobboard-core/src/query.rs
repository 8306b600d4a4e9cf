//! Listing query translation: flat HTTP query parameters in, a [`Filter`]
//! plus raw pagination directives out.
//!
//! Translation runs as three pure steps over parsed terms:
//! 1. [`split_operators`] turns `alias[op]` keys into typed range operators,
//! 2. [`resolve_aliases`] maps alias keys to canonical field paths through
//!    [`ALIASES`], pulling out pagination keys and dropping everything else,
//! 3. [`shape_values`] builds conditions per field shape (one-of splitting,
//!    sentinel removal, numeric parsing, end-of-day widening).
//!
//! Nothing is validated here. Malformed values are passed through as strings
//! and rejected, if at all, by an earlier validation stage.

use crate::filter::{Condition, Filter, RangeBounds, RangeOp};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;

pub type RawQuery = BTreeMap<String, String>;

/// Time appended to a date-only upper bound so the whole day is included.
pub const END_OF_DAY: &str = "T23:59:59";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Comma-separated values; the field is left unconstrained when the list
    /// is empty or contains `sentinel`.
    OneOf { sentinel: Option<&'static str> },
    NumericRange,
    DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    pub alias: &'static str,
    pub path: &'static str,
    pub shape: ValueShape,
}

pub static ALIASES: &[FieldAlias] = &[
    FieldAlias {
        alias: "salcost",
        path: "salary.cost",
        shape: ValueShape::NumericRange,
    },
    FieldAlias {
        alias: "caties",
        path: "category",
        shape: ValueShape::OneOf { sentinel: None },
    },
    FieldAlias {
        alias: "date",
        path: "startDate",
        shape: ValueShape::DateRange,
    },
    FieldAlias {
        alias: "dur",
        path: "duration",
        shape: ValueShape::OneOf {
            sentinel: Some("0"),
        },
    },
];

pub fn lookup_alias(alias: &str) -> Option<&'static FieldAlias> {
    ALIASES.iter().find(|a| a.alias == alias)
}

/// Pagination parameters exactly as received; interpretation belongs to the
/// pager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubKey {
    None,
    Range(RangeOp),
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTerm {
    pub key: String,
    pub sub: SubKey,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTerm {
    pub field: &'static FieldAlias,
    pub op: Option<RangeOp>,
    pub value: String,
}

fn split_key(key: &str) -> (&str, SubKey) {
    match key.split_once('[') {
        Some((base, rest)) => {
            match rest.strip_suffix(']').and_then(RangeOp::parse) {
                Some(op) => (base, SubKey::Range(op)),
                None => (base, SubKey::Unrecognized(rest.to_string())),
            }
        }
        None => (key, SubKey::None),
    }
}

/// Step 1: attach typed operator markers to bracketed sub-keys.
pub fn split_operators(raw: &RawQuery) -> Vec<RawTerm> {
    raw.iter()
        .map(|(key, value)| {
            let (base, sub) = split_key(key);
            RawTerm {
                key: base.to_string(),
                sub,
                value: value.clone(),
            }
        })
        .collect()
}

/// Step 2: rename aliases to canonical fields; pagination keys go to the
/// returned directives, every other key is discarded.
pub fn resolve_aliases(terms: Vec<RawTerm>) -> (Vec<FieldTerm>, RawPagination) {
    let mut pagination = RawPagination::default();
    let mut fields = Vec::with_capacity(terms.len());
    for term in terms {
        let slot = match (term.key.as_str(), &term.sub) {
            ("page", SubKey::None) => Some(&mut pagination.page),
            ("limit", SubKey::None) => Some(&mut pagination.limit),
            ("offset", SubKey::None) => Some(&mut pagination.offset),
            _ => None,
        };
        if let Some(slot) = slot {
            *slot = Some(term.value);
            continue;
        }
        let Some(field) = lookup_alias(&term.key) else {
            debug!(key = %term.key, "dropping unknown listing parameter");
            continue;
        };
        let op = match term.sub {
            SubKey::None => None,
            SubKey::Range(op) => Some(op),
            SubKey::Unrecognized(sub) => {
                debug!(key = %term.key, %sub, "dropping unsupported operator");
                continue;
            }
        };
        fields.push(FieldTerm {
            field,
            op,
            value: term.value,
        });
    }
    (fields, pagination)
}

/// Step 3: fold field terms into per-field conditions.
pub fn shape_values(terms: Vec<FieldTerm>) -> Filter {
    let mut conditions: BTreeMap<String, Condition> = BTreeMap::new();
    let mut unconstrained: Vec<&'static str> = Vec::new();
    for term in terms {
        let path = term.field.path;
        match (term.field.shape, term.op) {
            (ValueShape::OneOf { sentinel }, None) => match split_list(&term.value, sentinel) {
                Some(values) => {
                    conditions.insert(path.to_string(), Condition::OneOf { values });
                }
                None => unconstrained.push(path),
            },
            (ValueShape::OneOf { .. }, Some(op)) => {
                debug!(path, %op, "range operator on a list field ignored");
            }
            (shape, Some(op)) => {
                let bound = range_operand(shape, op, &term.value);
                let bounds = match conditions.remove(path) {
                    Some(Condition::Range(existing)) => existing,
                    _ => RangeBounds::default(),
                };
                conditions.insert(path.to_string(), Condition::Range(bounds.with(op, bound)));
            }
            (shape, None) => {
                // a range on the same field takes precedence over a plain value
                conditions
                    .entry(path.to_string())
                    .or_insert_with(|| Condition::Eq(scalar_operand(shape, &term.value)));
            }
        }
    }
    for path in unconstrained {
        conditions.remove(path);
    }
    Filter(conditions)
}

fn split_list(value: &str, sentinel: Option<&str>) -> Option<Vec<String>> {
    let values: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() || sentinel.is_some_and(|s| values.iter().any(|v| v == s)) {
        return None;
    }
    Some(values)
}

fn range_operand(shape: ValueShape, op: RangeOp, value: &str) -> JsonValue {
    match (shape, op) {
        (ValueShape::DateRange, RangeOp::Lte) => JsonValue::String(widen_to_end_of_day(value)),
        _ => scalar_operand(shape, value),
    }
}

fn scalar_operand(shape: ValueShape, value: &str) -> JsonValue {
    match shape {
        ValueShape::NumericRange => numeric(value),
        _ => JsonValue::String(value.to_string()),
    }
}

fn numeric(value: &str) -> JsonValue {
    let v = value.trim();
    if let Ok(i) = v.parse::<i64>() {
        return JsonValue::from(i);
    }
    v.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(value.to_string()))
}

/// A bound that already carries a time of day is left alone.
pub fn widen_to_end_of_day(date: &str) -> String {
    if date.contains('T') {
        date.to_string()
    } else {
        format!("{date}{END_OF_DAY}")
    }
}

pub fn translate(raw: &RawQuery) -> (Filter, RawPagination) {
    let terms = split_operators(raw);
    let (fields, pagination) = resolve_aliases(terms);
    (shape_values(fields), pagination)
}
