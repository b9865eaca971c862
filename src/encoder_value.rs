//! Comparator for encoder output: two trees decoded straight from TOML
//! (`toml::Value`), rather than the `{type,value}`-tagged JSON schema.
//!
//! Grounded on the reference `toml.go`: primitives compare with
//! `reflect.DeepEqual` semantics plus a NaN-aware float special case; TOML's
//! own grammar already unifies `a=[{}]` and `[[a]]` into the same decoded
//! shape, so no extra array-of-tables accommodation is needed here.

use toml::Value;

use crate::error::CompareFailure;

/// The largest integer magnitude exactly representable as an `f64`.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Recursively converts integers within `[-2^53, 2^53]` into floats, for
/// comparing against encoders that cannot distinguish the two.
pub fn normalize_int_as_float(value: Value) -> Value {
    match value {
        Value::Integer(n) if n.unsigned_abs() <= MAX_SAFE_INTEGER as u64 => Value::Float(n as f64),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(normalize_int_as_float).collect())
        }
        Value::Table(map) => Value::Table(
            map.into_iter()
                .map(|(k, v)| (k, normalize_int_as_float(v)))
                .collect(),
        ),
        other => other,
    }
}

pub fn compare(want: &Value, have: &Value) -> Result<(), CompareFailure> {
    compare_at("", want, have)
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

fn compare_at(path: &str, want: &Value, have: &Value) -> Result<(), CompareFailure> {
    match (want, have) {
        (Value::Table(w), Value::Table(h)) => compare_tables(path, w, h),
        (Value::Array(w), Value::Array(h)) => compare_arrays(path, w, h),
        (Value::Float(w), Value::Float(h)) => {
            if w.is_nan() && h.is_nan() || w == h {
                Ok(())
            } else {
                Err(CompareFailure::mismatch(format!(
                    "{}: values don't match: want={w}; have={h}",
                    scoped(path)
                )))
            }
        }
        (w, h) => {
            if matches!(w, Value::Table(_) | Value::Array(_)) != matches!(h, Value::Table(_) | Value::Array(_)) {
                return Err(CompareFailure::mismatch(format!(
                    "{}: types don't match: want={}; have={}",
                    scoped(path),
                    kind_name(w),
                    kind_name(h)
                )));
            }
            if w == h {
                Ok(())
            } else {
                Err(CompareFailure::mismatch(format!(
                    "{}: values don't match: want={w:?}; have={h:?}",
                    scoped(path)
                )))
            }
        }
    }
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "bool",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}

fn compare_tables(
    path: &str,
    want: &toml::map::Map<String, Value>,
    have: &toml::map::Map<String, Value>,
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
        compare_at(&join(path, key), want_child, &have[key])?;
    }
    Ok(())
}

fn compare_arrays(path: &str, want: &[Value], have: &[Value]) -> Result<(), CompareFailure> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_of_tables_matches_inline_form() {
        let want: Value = toml::from_str("a=[{}]").unwrap();
        let have: Value = toml::from_str("[[a]]").unwrap();
        assert!(compare(&want, &have).is_ok());
    }

    #[test]
    fn array_of_tables_with_key_matches() {
        let want: Value = toml::from_str("a=[{k=1}]").unwrap();
        let have: Value = toml::from_str("[[a]]\nk=1").unwrap();
        assert!(compare(&want, &have).is_ok());
    }

    #[test]
    fn symmetry_on_differing_documents() {
        let a: Value = toml::from_str("a=1").unwrap();
        let b: Value = toml::from_str("a=2").unwrap();
        assert!(compare(&a, &b).is_err());
        assert!(compare(&b, &a).is_err());
    }

    #[test]
    fn nan_equal() {
        let want = Value::Float(f64::NAN);
        let have = Value::Float(f64::NAN);
        assert!(compare(&want, &have).is_ok());
    }

    #[test]
    fn int_as_float_normalization() {
        let want: Value = toml::from_str("a=1").unwrap();
        let normalized = normalize_int_as_float(want);
        let have: Value = toml::from_str("a=1.0").unwrap();
        assert!(compare(&normalized, &have).is_ok());
    }
}
