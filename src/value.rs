//! The tagged-value tree and its comparator — the heart of the harness.
//!
//! Grounded directly on the reference `json.go`: a map is a leaf iff it has
//! exactly the two keys `type` and `value`; everything else recurses
//! structurally. Comparison descends in lockstep and produces a single,
//! path-scoped failure at the first mismatch.

use std::collections::BTreeMap;

use crate::error::CompareFailure;

/// One TOML primitive type as carried in a tagged-value leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TomlType {
    String,
    Integer,
    Float,
    Bool,
    Datetime,
    DatetimeLocal,
    DateLocal,
    TimeLocal,
    Array,
    Other,
}

impl TomlType {
    fn parse(s: &str) -> TomlType {
        match s {
            "string" => TomlType::String,
            "integer" => TomlType::Integer,
            "float" => TomlType::Float,
            "bool" => TomlType::Bool,
            "datetime" => TomlType::Datetime,
            "datetime-local" => TomlType::DatetimeLocal,
            "date-local" => TomlType::DateLocal,
            "time-local" => TomlType::TimeLocal,
            "array" => TomlType::Array,
            _ => TomlType::Other,
        }
    }
}

/// The payload of a leaf: a string for every ordinary scalar type, or a
/// nested array of tagged values when `type == "array"`.
#[derive(Debug, Clone)]
pub enum LeafValue {
    Scalar(String),
    Array(Vec<TaggedValue>),
}

/// A node in the tagged-value tree.
#[derive(Debug, Clone)]
pub enum TaggedValue {
    Table(BTreeMap<String, TaggedValue>),
    Array(Vec<TaggedValue>),
    Leaf { ty: String, value: LeafValue },
}

/// Error converting an arbitrary `serde_json::Value` into a [`TaggedValue`].
#[derive(Debug, thiserror::Error)]
pub enum TaggedValueError {
    #[error("expected a JSON object, array, or {{type,value}} leaf, found {0}")]
    UnexpectedShape(&'static str),
    #[error("leaf {{type,value}} must have string fields")]
    NonStringLeafField,
    #[error("leaf typed \"array\" must have a JSON array value")]
    NonArrayLeafValue,
}

impl TaggedValue {
    pub fn from_json(v: &serde_json::Value) -> Result<TaggedValue, TaggedValueError> {
        match v {
            serde_json::Value::Object(map) => {
                if is_leaf_shape(map) {
                    let ty = map["type"]
                        .as_str()
                        .ok_or(TaggedValueError::NonStringLeafField)?
                        .to_string();
                    // An array-typed leaf recurses into its `value` as an
                    // array of tagged values, rather than being treated as
                    // an opaque scalar.
                    let value = if ty == "array" {
                        let items = map["value"]
                            .as_array()
                            .ok_or(TaggedValueError::NonArrayLeafValue)?;
                        let mut out = Vec::with_capacity(items.len());
                        for item in items {
                            out.push(TaggedValue::from_json(item)?);
                        }
                        LeafValue::Array(out)
                    } else {
                        let s = map["value"]
                            .as_str()
                            .ok_or(TaggedValueError::NonStringLeafField)?
                            .to_string();
                        LeafValue::Scalar(s)
                    };
                    Ok(TaggedValue::Leaf { ty, value })
                } else {
                    let mut out = BTreeMap::new();
                    for (k, v) in map {
                        out.insert(k.clone(), TaggedValue::from_json(v)?);
                    }
                    Ok(TaggedValue::Table(out))
                }
            }
            serde_json::Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(TaggedValue::from_json(item)?);
                }
                Ok(TaggedValue::Array(out))
            }
            serde_json::Value::Null => Err(TaggedValueError::UnexpectedShape("null")),
            serde_json::Value::Bool(_) => Err(TaggedValueError::UnexpectedShape("bare bool")),
            serde_json::Value::Number(_) => Err(TaggedValueError::UnexpectedShape("bare number")),
            serde_json::Value::String(_) => Err(TaggedValueError::UnexpectedShape("bare string")),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            TaggedValue::Table(_) => "table",
            TaggedValue::Array(_) => "array",
            TaggedValue::Leaf { .. } => "leaf",
        }
    }
}

fn is_leaf_shape(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.len() == 2 && map.contains_key("type") && map.contains_key("value")
}

/// Compares `want` (the reference answer) against `have` (the parser's
/// output), returning the first mismatch found.
pub fn compare(want: &TaggedValue, have: &TaggedValue) -> Result<(), CompareFailure> {
    compare_at("", want, have)
}

fn compare_at(path: &str, want: &TaggedValue, have: &TaggedValue) -> Result<(), CompareFailure> {
    match (want, have) {
        (TaggedValue::Table(w), TaggedValue::Table(h)) => compare_maps(path, w, h),
        (TaggedValue::Array(w), TaggedValue::Array(h)) => compare_arrays(path, w, h),
        (TaggedValue::Leaf { ty: wt, value: wv }, TaggedValue::Leaf { ty: ht, value: hv }) => {
            compare_leaves(path, wt, wv, ht, hv)
        }
        (w, h) => Err(CompareFailure::mismatch(format!(
            "{}: types don't match: want={}; have={}",
            scoped(path),
            w.kind_name(),
            h.kind_name()
        ))),
    }
}

fn scoped(path: &str) -> &str {
    if path.is_empty() {
        "toplevel"
    } else {
        path
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn compare_maps(
    path: &str,
    want: &BTreeMap<String, TaggedValue>,
    have: &BTreeMap<String, TaggedValue>,
) -> Result<(), CompareFailure> {
    for key in want.keys() {
        if !have.contains_key(key) {
            return Err(CompareFailure::mismatch(format!(
                "{}: key {:?} missing from output",
                scoped(path),
                key
            )));
        }
    }
    for key in have.keys() {
        if !want.contains_key(key) {
            return Err(CompareFailure::mismatch(format!(
                "{}: key {:?} missing from expected output",
                scoped(path),
                key
            )));
        }
    }
    for (key, want_child) in want {
        let have_child = &have[key];
        compare_at(&join(path, key), want_child, have_child)?;
    }
    Ok(())
}

fn compare_arrays(
    path: &str,
    want: &[TaggedValue],
    have: &[TaggedValue],
) -> Result<(), CompareFailure> {
    if want.len() != have.len() {
        return Err(CompareFailure::mismatch(format!(
            "{}: wrong array length: want={}; have={}",
            scoped(path),
            want.len(),
            have.len()
        )));
    }
    for (i, (w, h)) in want.iter().zip(have.iter()).enumerate() {
        compare_at(&format!("{}[{i}]", scoped(path)), w, h)?;
    }
    Ok(())
}

fn compare_leaves(
    path: &str,
    want_ty: &str,
    want_value: &LeafValue,
    have_ty: &str,
    have_value: &LeafValue,
) -> Result<(), CompareFailure> {
    if want_ty != have_ty {
        return Err(CompareFailure::mismatch(format!(
            "{}: types don't match: want={want_ty}; have={have_ty}",
            scoped(path)
        )));
    }

    if let TomlType::Array = TomlType::parse(want_ty) {
        return match (want_value, have_value) {
            (LeafValue::Array(w), LeafValue::Array(h)) => compare_arrays(path, w, h),
            _ => Err(CompareFailure::bug(format!(
                "{}: leaf typed \"array\" must carry an array value",
                scoped(path)
            ))),
        };
    }

    let want_value = expect_scalar(path, want_value)?;
    let have_value = expect_scalar(path, have_value)?;

    match TomlType::parse(want_ty) {
        TomlType::Float => compare_floats(path, want_value, have_value),
        TomlType::Datetime => {
            compare_datetime(path, want_value, have_value, parse_offset_datetime)
        }
        TomlType::DatetimeLocal => {
            compare_datetime(path, want_value, have_value, parse_local_datetime)
        }
        TomlType::DateLocal => compare_datetime(path, want_value, have_value, parse_local_date),
        TomlType::TimeLocal => compare_datetime(path, want_value, have_value, parse_local_time),
        _ => {
            if want_value == have_value {
                Ok(())
            } else {
                Err(CompareFailure::mismatch(format!(
                    "{}: values don't match: want={want_value:?}; have={have_value:?}",
                    scoped(path)
                )))
            }
        }
    }
}

/// Every non-array type carries a scalar value; an array-typed leaf is
/// handled before this point, so reaching `LeafValue::Array` here means a
/// leaf's `type` and `value` shape disagree.
fn expect_scalar<'a>(path: &str, value: &'a LeafValue) -> Result<&'a str, CompareFailure> {
    match value {
        LeafValue::Scalar(s) => Ok(s.as_str()),
        LeafValue::Array(_) => Err(CompareFailure::bug(format!(
            "{}: leaf value is an array but type is not \"array\"",
            scoped(path)
        ))),
    }
}

fn compare_floats(path: &str, want: &str, have: &str) -> Result<(), CompareFailure> {
    // Any two nan-tagged floats are equivalent regardless of sign prefix.
    if want.ends_with("nan") && have.ends_with("nan") {
        return Ok(());
    }
    let w: f64 = want
        .parse()
        .map_err(|_| CompareFailure::bug(format!("{}: invalid float {want:?} in want", scoped(path))))?;
    let h: f64 = have.parse().map_err(|_| {
        CompareFailure::mismatch(format!("{}: invalid float {have:?} in parser output", scoped(path)))
    })?;
    if w == h {
        Ok(())
    } else {
        Err(CompareFailure::mismatch(format!(
            "{}: values don't match: want={want}; have={have}",
            scoped(path)
        )))
    }
}

fn compare_datetime(
    path: &str,
    want: &str,
    have: &str,
    parse: fn(&str) -> Option<chrono::NaiveDateTime>,
) -> Result<(), CompareFailure> {
    let w = parse(want)
        .ok_or_else(|| CompareFailure::bug(format!("{}: invalid datetime {want:?} in want", scoped(path))))?;
    let h = parse(have).ok_or_else(|| {
        CompareFailure::mismatch(format!("{}: invalid datetime {have:?} in parser output", scoped(path)))
    })?;
    if w == h {
        Ok(())
    } else {
        Err(CompareFailure::mismatch(format!(
            "{}: values don't match: want={want}; have={have}",
            scoped(path)
        )))
    }
}

fn canonicalize_datetime(s: &str) -> String {
    s.replace(' ', "T").replace('t', "T").replace('z', "Z")
}

fn parse_offset_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    let s = canonicalize_datetime(s);
    chrono::DateTime::parse_from_rfc3339(&s)
        .ok()
        .map(|dt| dt.naive_utc())
}

fn parse_local_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

fn parse_local_date(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
}

fn parse_local_time(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .ok()
        .map(|t| chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_time(t))
}
