//! Structured filters handed to the storage layer, and their evaluation
//! against JSON documents.
//!
//! A [`Filter`] maps canonical field paths (dotted for nested attributes,
//! e.g. `salary.cost`) to a [`Condition`]. Serialized, a filter uses the
//! operator-marker convention of document stores: `{"$in": [...]}` for
//! one-of sets and `{"$gte": .., "$lte": ..}` for ranges.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeOp {
    Gte,
    Gt,
    Lte,
    Lt,
}

impl RangeOp {
    pub const ALL: [RangeOp; 4] = [RangeOp::Gte, RangeOp::Gt, RangeOp::Lte, RangeOp::Lt];

    /// Accepts both the bare sub-key (`gte`) and the marked form (`$gte`),
    /// so marked input is never marked twice.
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_prefix('$').unwrap_or(s) {
            "gte" => Some(RangeOp::Gte),
            "gt" => Some(RangeOp::Gt),
            "lte" => Some(RangeOp::Lte),
            "lt" => Some(RangeOp::Lt),
            _ => None,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            RangeOp::Gte => "$gte",
            RangeOp::Gt => "$gt",
            RangeOp::Lte => "$lte",
            RangeOp::Lt => "$lt",
        }
    }

    fn admits(self, ord: Ordering) -> bool {
        match self {
            RangeOp::Gte => ord != Ordering::Less,
            RangeOp::Gt => ord == Ordering::Greater,
            RangeOp::Lte => ord != Ordering::Greater,
            RangeOp::Lt => ord == Ordering::Less,
        }
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeBounds {
    #[serde(rename = "$gte", skip_serializing_if = "Option::is_none")]
    pub gte: Option<JsonValue>,
    #[serde(rename = "$gt", skip_serializing_if = "Option::is_none")]
    pub gt: Option<JsonValue>,
    #[serde(rename = "$lte", skip_serializing_if = "Option::is_none")]
    pub lte: Option<JsonValue>,
    #[serde(rename = "$lt", skip_serializing_if = "Option::is_none")]
    pub lt: Option<JsonValue>,
}

impl RangeBounds {
    pub fn get(&self, op: RangeOp) -> Option<&JsonValue> {
        match op {
            RangeOp::Gte => self.gte.as_ref(),
            RangeOp::Gt => self.gt.as_ref(),
            RangeOp::Lte => self.lte.as_ref(),
            RangeOp::Lt => self.lt.as_ref(),
        }
    }

    pub fn with(mut self, op: RangeOp, value: JsonValue) -> Self {
        let slot = match op {
            RangeOp::Gte => &mut self.gte,
            RangeOp::Gt => &mut self.gt,
            RangeOp::Lte => &mut self.lte,
            RangeOp::Lt => &mut self.lt,
        };
        *slot = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        RangeOp::ALL.iter().all(|op| self.get(*op).is_none())
    }

    pub fn bounds(&self) -> impl Iterator<Item = (RangeOp, &JsonValue)> + '_ {
        RangeOp::ALL
            .into_iter()
            .filter_map(move |op| self.get(op).map(|v| (op, v)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    OneOf {
        #[serde(rename = "$in")]
        values: Vec<String>,
    },
    Range(RangeBounds),
    Eq(JsonValue),
}

impl Condition {
    pub fn matches(&self, field: &JsonValue) -> bool {
        match self {
            Condition::Eq(want) => any_element(field, |v| {
                compare_loose(v, want) == Some(Ordering::Equal)
            }),
            Condition::OneOf { values } => any_element(field, |v| {
                values.iter().any(|want| {
                    compare_loose(v, &JsonValue::String(want.clone())) == Some(Ordering::Equal)
                })
            }),
            Condition::Range(bounds) => {
                if field.is_null() {
                    return false;
                }
                bounds.bounds().all(|(op, bound)| {
                    compare_loose(field, bound)
                        .map(|ord| op.admits(ord))
                        .unwrap_or(false)
                })
            }
        }
    }
}

/// Field path → condition. All conditions must hold for a document to match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Filter(pub BTreeMap<String, Condition>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, cond: Condition) -> Self {
        self.0.insert(path.into(), cond);
        self
    }

    pub fn get(&self, path: &str) -> Option<&Condition> {
        self.0.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn matches(&self, doc: &JsonValue) -> bool {
        self.0
            .iter()
            .all(|(path, cond)| cond.matches(resolve_path(doc, path)))
    }
}

/// Resolve a dot-separated attribute path; missing segments yield `Null`.
pub fn resolve_path<'a>(doc: &'a JsonValue, path: &str) -> &'a JsonValue {
    let mut current = doc;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(v) => current = v,
            None => return &JsonValue::Null,
        }
    }
    current
}

fn any_element(field: &JsonValue, pred: impl Fn(&JsonValue) -> bool) -> bool {
    match field {
        JsonValue::Array(items) => items.iter().any(pred),
        other => pred(other),
    }
}

/// Compare a stored value against a filter operand the way a schema-casting
/// document store would: numeric strings compare as numbers against numbers,
/// date-like strings compare as timestamps, everything else by type.
pub fn compare_loose(stored: &JsonValue, operand: &JsonValue) -> Option<Ordering> {
    match (stored, operand) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (JsonValue::Number(a), JsonValue::String(b)) => {
            a.as_f64()?.partial_cmp(&b.trim().parse::<f64>().ok()?)
        }
        (JsonValue::String(a), JsonValue::Number(b)) => {
            a.trim().parse::<f64>().ok()?.partial_cmp(&b.as_f64()?)
        }
        (JsonValue::String(a), JsonValue::String(b)) => {
            match (parse_timestamp(a), parse_timestamp(b)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(a.as_str().cmp(b.as_str())),
            }
        }
        (JsonValue::Bool(a), JsonValue::Bool(b)) => Some(a.cmp(b)),
        (JsonValue::Null, JsonValue::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Parse the date shapes seen in stored records and query strings:
/// RFC 3339, `YYYY-MM-DDTHH:MM[:SS[.f]]` and bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
