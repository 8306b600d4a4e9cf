use serde_json::{Map, Value as JsonValue};

/// Attribute selection applied to returned records.
///
/// Parsed from a space-separated select list: `"salary startDate"` keeps only
/// those attributes (plus `_id`), `"-password -phone"` drops them. Mixing the
/// two forms is rejected by [`Projection::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    Include { fields: Vec<String>, with_id: bool },
    Exclude(Vec<String>),
}

impl Projection {
    pub fn parse(select: &str) -> crate::Result<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for field in select.split_whitespace() {
            match field.strip_prefix('-') {
                Some(f) if !f.is_empty() => exclude.push(f.to_string()),
                Some(_) => {}
                None => include.push(field.to_string()),
            }
        }
        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Ok(Projection::All),
            (false, true) => Ok(Projection::Include {
                fields: include,
                with_id: true,
            }),
            (true, false) => Ok(Projection::Exclude(exclude)),
            (false, false) => {
                // `-_id` is the one exclusion allowed next to inclusions
                if exclude == ["_id"] {
                    Ok(Projection::Include {
                        fields: include,
                        with_id: false,
                    })
                } else {
                    Err(crate::BoardError::Invalid(format!(
                        "cannot mix inclusion and exclusion in select: {select}"
                    )))
                }
            }
        }
    }

    pub fn apply(&self, doc: &JsonValue) -> JsonValue {
        let JsonValue::Object(obj) = doc else {
            return doc.clone();
        };
        match self {
            Projection::All => doc.clone(),
            Projection::Include { fields, with_id } => {
                let mut out = Map::new();
                for (k, v) in obj {
                    if (*with_id && k == "_id") || fields.iter().any(|f| f == k) {
                        out.insert(k.clone(), v.clone());
                    }
                }
                JsonValue::Object(out)
            }
            Projection::Exclude(fields) => {
                let mut out = obj.clone();
                for f in fields {
                    out.remove(f);
                }
                JsonValue::Object(out)
            }
        }
    }
}
