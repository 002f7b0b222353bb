//! Config caster: validates raw JSON input into typed templates.
//!
//! Runs once at load time. Every field is optional (`null` and missing keys
//! are absent). A [`Choice`] is a union tried in declared order: literal,
//! list of choices, `{min, max}` range. Failures are accumulated rather than
//! short-circuited, so one [`ConfigTypeError`] names every bad field path and
//! every candidate type that was tried.
//!
//! Template types write one explicit parse function each, on top of
//! [`FieldReader`]:
//!
//! ```
//! use serde_json::json;
//! use scenegen_logic::cast::Cast;
//! use scenegen_logic::distribution::Choice;
//!
//! let num = Choice::<i64>::cast("objects[0].num", &json!({"min": 1, "max": 3})).unwrap();
//! assert_eq!(num, Choice::range(1, 3));
//!
//! let err = Choice::<i64>::cast("objects[0].num", &json!(true)).unwrap_err();
//! assert_eq!(err.paths(), vec!["objects[0].num"]);
//! ```

use std::convert::Infallible;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::distribution::{Choice, Draw, Span, Vec3Template};

/// Why one candidate type rejected a raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub candidate: String,
    pub reason: String,
}

/// Every candidate failure for one field path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    pub path: String,
    pub reasons: Vec<CandidateFailure>,
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons = self
            .reasons
            .iter()
            .map(|r| format!("{} ({})", r.candidate, r.reason))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}: {}", display_path(&self.path), reasons)
    }
}

/// Raw input failed every candidate type for one or more fields.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", summarize(.failures))]
pub struct ConfigTypeError {
    pub failures: Vec<FieldFailure>,
}

fn summarize(failures: &[FieldFailure]) -> String {
    format!(
        "{} field(s) failed type checks: {}",
        failures.len(),
        format_failures(failures)
    )
}

fn format_failures(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

impl ConfigTypeError {
    pub fn single(path: &str, candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            failures: vec![FieldFailure {
                path: path.to_string(),
                reasons: vec![CandidateFailure {
                    candidate: candidate.into(),
                    reason: reason.into(),
                }],
            }],
        }
    }

    pub fn extend(&mut self, other: ConfigTypeError) {
        self.failures.extend(other.failures);
    }

    /// Every failing field path, in discovery order.
    pub fn paths(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.path.as_str()).collect()
    }

    /// Short reason text for embedding in an outer union's failure list.
    fn reason_at(&self, path: &str) -> String {
        match self.failures.as_slice() {
            [only] if only.path == path && only.reasons.len() == 1 => only.reasons[0].reason.clone(),
            _ => format_failures(&self.failures),
        }
    }
}

/// Name of the JSON kind, for failure messages.
pub fn describe(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Typed view of raw configuration input.
pub trait Cast: Sized {
    /// Type name used in failure reasons.
    fn expected() -> String;

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError>;
}

/// Path of a list element.
pub fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// Path of an object field.
pub fn field_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

// ── Leaves ──────────────────────────────────────────────────────────────

impl Cast for i64 {
    fn expected() -> String {
        "integer".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        match raw {
            // Booleans are never integers, whatever the source format says
            Value::Bool(_) => Err(ConfigTypeError::single(
                path,
                Self::expected(),
                "boolean is not an integer",
            )),
            Value::Number(n) => n.as_i64().ok_or_else(|| {
                ConfigTypeError::single(path, Self::expected(), format!("{n} is not an integer"))
            }),
            other => Err(ConfigTypeError::single(
                path,
                Self::expected(),
                format!("found {}", describe(other)),
            )),
        }
    }
}

impl Cast for f64 {
    fn expected() -> String {
        "number".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        match raw {
            Value::Bool(_) => Err(ConfigTypeError::single(
                path,
                Self::expected(),
                "boolean is not a number",
            )),
            Value::Number(n) => n.as_f64().ok_or_else(|| {
                ConfigTypeError::single(path, Self::expected(), format!("{n} is out of range"))
            }),
            other => Err(ConfigTypeError::single(
                path,
                Self::expected(),
                format!("found {}", describe(other)),
            )),
        }
    }
}

impl Cast for bool {
    fn expected() -> String {
        "boolean".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        match raw {
            Value::Bool(b) => Ok(*b),
            other => Err(ConfigTypeError::single(
                path,
                Self::expected(),
                format!("found {}", describe(other)),
            )),
        }
    }
}

impl Cast for String {
    fn expected() -> String {
        "non-empty string".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        match raw {
            Value::String(s) if s.trim().is_empty() => Err(ConfigTypeError::single(
                path,
                Self::expected(),
                "string is empty",
            )),
            Value::String(s) => Ok(s.clone()),
            other => Err(ConfigTypeError::single(
                path,
                Self::expected(),
                format!("found {}", describe(other)),
            )),
        }
    }
}

/// Range bound of a non-numeric field: nothing casts.
impl Cast for Infallible {
    fn expected() -> String {
        "numeric bound".into()
    }

    fn cast(path: &str, _raw: &Value) -> Result<Self, ConfigTypeError> {
        Err(ConfigTypeError::single(
            path,
            Self::expected(),
            "ranges are only allowed for numeric fields",
        ))
    }
}

// ── Containers ──────────────────────────────────────────────────────────

/// `null` is absent.
impl<T: Cast> Cast for Option<T> {
    fn expected() -> String {
        format!("null or {}", T::expected())
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        match raw {
            Value::Null => Ok(None),
            other => T::cast(path, other).map(Some),
        }
    }
}

impl<T: Cast> Cast for Vec<T> {
    fn expected() -> String {
        format!("list of {}", T::expected())
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let Value::Array(items) = raw else {
            return Err(ConfigTypeError::single(
                path,
                Self::expected(),
                format!("found {}", describe(raw)),
            ));
        };
        let mut out = Vec::with_capacity(items.len());
        let mut errors = ConfigTypeError { failures: Vec::new() };
        for (i, item) in items.iter().enumerate() {
            match T::cast(&index_path(path, i), item) {
                Ok(v) => out.push(v),
                Err(e) => errors.extend(e),
            }
        }
        if errors.failures.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }
}

impl<T> Cast for Choice<T>
where
    T: Draw + Cast,
    T::Bound: Cast,
{
    fn expected() -> String {
        format!("{} | list | range", T::expected())
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut reasons = Vec::new();

        match T::cast(path, raw) {
            Ok(v) => return Ok(Choice::Fixed(v)),
            Err(e) => reasons.push(CandidateFailure {
                candidate: T::expected(),
                reason: e.reason_at(path),
            }),
        }

        match cast_options::<T>(path, raw) {
            Ok(choice) => return Ok(choice),
            Err(reason) => reasons.push(CandidateFailure {
                candidate: format!("list of {}", T::expected()),
                reason,
            }),
        }

        match cast_span::<T::Bound>(path, raw).and_then(|span| T::check_span(&span).map(|()| span)) {
            Ok(span) => return Ok(Choice::Range(span)),
            Err(reason) => reasons.push(CandidateFailure {
                candidate: "range {min, max}".into(),
                reason,
            }),
        }

        Err(ConfigTypeError {
            failures: vec![FieldFailure {
                path: path.to_string(),
                reasons,
            }],
        })
    }
}

fn cast_options<T>(path: &str, raw: &Value) -> Result<Choice<T>, String>
where
    T: Draw + Cast,
    T::Bound: Cast,
{
    let Value::Array(items) = raw else {
        return Err(format!("found {}", describe(raw)));
    };
    let choices = Vec::<Choice<T>>::cast(path, raw).map_err(|e| format_failures(&e.failures))?;
    if items.is_empty() {
        return Err("list of choices is empty".into());
    }
    Choice::one_of(choices).ok_or_else(|| "list of choices is empty".to_string())
}

fn cast_span<B: Cast + PartialOrd + fmt::Debug>(path: &str, raw: &Value) -> Result<Span<B>, String> {
    let Value::Object(map) = raw else {
        return Err(format!("found {}", describe(raw)));
    };
    if let Some(extra) = map.keys().find(|k| *k != "min" && *k != "max") {
        return Err(format!("unexpected key '{extra}'"));
    }
    let bound = |key: &str| -> Result<B, String> {
        let value = map.get(key).ok_or_else(|| format!("missing '{key}'"))?;
        let key_path = field_path(path, key);
        B::cast(&key_path, value).map_err(|e| e.reason_at(&key_path))
    };
    let min = bound("min")?;
    let max = bound("max")?;
    if min > max {
        return Err(format!("min {min:?} is greater than max {max:?}"));
    }
    Ok(Span { min, max })
}

// ── Composites ──────────────────────────────────────────────────────────

/// Reads the fields of one JSON object, recording failures instead of
/// stopping at the first one. Keys never asked for are reported as
/// unexpected by [`FieldReader::finish`].
pub struct FieldReader<'a> {
    path: String,
    map: &'a Map<String, Value>,
    known: Vec<&'static str>,
    errors: ConfigTypeError,
}

impl<'a> FieldReader<'a> {
    pub fn new(path: &str, raw: &'a Value, expected: &str) -> Result<Self, ConfigTypeError> {
        match raw {
            Value::Object(map) => Ok(Self {
                path: path.to_string(),
                map,
                known: Vec::new(),
                errors: ConfigTypeError { failures: Vec::new() },
            }),
            other => Err(ConfigTypeError::single(
                path,
                expected,
                format!("found {}", describe(other)),
            )),
        }
    }

    /// Absent, `null`, or a valid `T`.
    pub fn optional<T: Cast>(&mut self, key: &'static str) -> Option<T> {
        self.known.push(key);
        let raw = self.map.get(key)?;
        match Option::<T>::cast(&field_path(&self.path, key), raw) {
            Ok(v) => v,
            Err(e) => {
                self.errors.extend(e);
                None
            }
        }
    }

    /// Like [`FieldReader::optional`], but a missing or `null` key is a
    /// failure.
    pub fn required<T: Cast>(&mut self, key: &'static str) -> Option<T> {
        let present = matches!(self.map.get(key), Some(v) if !v.is_null());
        if !present {
            self.known.push(key);
            self.errors.extend(ConfigTypeError::single(
                &field_path(&self.path, key),
                T::expected(),
                "missing required key",
            ));
            return None;
        }
        self.optional(key)
    }

    /// Report unexpected keys and return every failure collected.
    pub fn finish(mut self) -> Result<(), ConfigTypeError> {
        for key in self.map.keys() {
            if !self.known.contains(&key.as_str()) {
                self.errors.extend(ConfigTypeError::single(
                    &field_path(&self.path, key),
                    "known field",
                    format!("unexpected key '{key}'"),
                ));
            }
        }
        if self.errors.failures.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

impl Cast for Vec3Template {
    fn expected() -> String {
        "point {x, y?, z}".into()
    }

    fn cast(path: &str, raw: &Value) -> Result<Self, ConfigTypeError> {
        let mut fields = FieldReader::new(path, raw, &Self::expected())?;
        let x = fields.required::<Choice<f64>>("x");
        let y = fields.optional::<Choice<f64>>("y");
        let z = fields.required::<Choice<f64>>("z");
        fields.finish()?;
        match (x, z) {
            (Some(x), Some(z)) => Ok(Self { x, y, z }),
            _ => Err(ConfigTypeError::single(path, Self::expected(), "missing axis")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_absent() {
        assert_eq!(Option::<i64>::cast("num", &json!(null)).unwrap(), None);
        assert_eq!(Option::<i64>::cast("num", &json!(4)).unwrap(), Some(4));
    }

    #[test]
    fn test_boolean_never_an_integer() {
        let err = i64::cast("num", &json!(true)).unwrap_err();
        assert!(err.to_string().contains("boolean is not an integer"));
        assert!(f64::cast("scale", &json!(false)).is_err());
    }

    #[test]
    fn test_float_is_not_an_integer() {
        assert!(i64::cast("num", &json!(2.5)).is_err());
        assert_eq!(f64::cast("scale", &json!(2)).unwrap(), 2.0);
    }

    #[test]
    fn test_empty_string_rejected() {
        assert!(String::cast("shape", &json!("  ")).is_err());
        assert_eq!(String::cast("shape", &json!("ball")).unwrap(), "ball");
    }

    #[test]
    fn test_choice_union_candidates() {
        assert_eq!(Choice::<i64>::cast("n", &json!(3)).unwrap(), Choice::Fixed(3));
        assert_eq!(
            Choice::<i64>::cast("n", &json!({"min": 1, "max": 4})).unwrap(),
            Choice::range(1, 4)
        );
        let nested = Choice::<i64>::cast("n", &json!([1, [2, 3], {"min": 5, "max": 6}])).unwrap();
        assert_eq!(
            nested,
            Choice::one_of(vec![
                Choice::Fixed(1),
                Choice::one_of(vec![Choice::Fixed(2), Choice::Fixed(3)]).unwrap(),
                Choice::range(5, 6),
            ])
            .unwrap()
        );
    }

    #[test]
    fn test_choice_failure_lists_every_candidate() {
        let err = Choice::<i64>::cast("objects[0].num", &json!(true)).unwrap_err();
        assert_eq!(err.failures.len(), 1);
        let reasons = &err.failures[0].reasons;
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[0].candidate, "integer");
        assert!(reasons[0].reason.contains("boolean"));
        assert!(reasons[2].candidate.contains("range"));
        assert!(err.to_string().contains("objects[0].num"));
    }

    #[test]
    fn test_range_only_for_numbers() {
        let err = Choice::<String>::cast("shape", &json!({"min": 1, "max": 2})).unwrap_err();
        assert!(err.to_string().contains("only allowed for numeric"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = Choice::<f64>::cast("x", &json!({"min": 3.0, "max": 1.0})).unwrap_err();
        assert!(err.to_string().contains("greater than max"));
    }

    #[test]
    fn test_range_too_wide_to_draw_rejected() {
        let err = Choice::<f64>::cast("objects[0].rotation_y", &json!({"min": -1e308, "max": 1e308}))
            .unwrap_err();
        assert_eq!(err.paths(), vec!["objects[0].rotation_y"]);
        assert!(err.to_string().contains("wider than the largest float"), "{err}");
        assert!(Choice::<f64>::cast("x", &json!({"min": -1e300, "max": 1e300})).is_ok());
    }

    #[test]
    fn test_empty_choice_list_rejected() {
        assert!(Choice::<i64>::cast("n", &json!([])).is_err());
    }

    #[test]
    fn test_null_inside_list_is_explicit_null() {
        let choice = Choice::<Option<String>>::cast("relative_to", &json!([null, "shelf"])).unwrap();
        assert_eq!(
            choice,
            Choice::pick(None::<String>, [Some("shelf".to_string())])
        );
    }

    #[test]
    fn test_point_rejects_unexpected_key() {
        let err = Vec3Template::cast("position", &json!({"x": 1, "z": 2, "w": 3})).unwrap_err();
        assert_eq!(err.paths(), vec!["position.w"]);
    }

    #[test]
    fn test_point_requires_axes() {
        let err = Vec3Template::cast("position", &json!({"x": 1})).unwrap_err();
        assert_eq!(err.paths(), vec!["position.z"]);
    }

    #[test]
    fn test_failures_are_aggregated() {
        let err = Vec::<Vec3Template>::cast(
            "points",
            &json!([{"x": true, "z": 0}, {"x": 0, "z": 0}, {"x": 0, "z": "far"}]),
        )
        .unwrap_err();
        assert_eq!(err.paths(), vec!["points[0].x", "points[2].z"]);
    }
}
