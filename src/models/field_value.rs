use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// A scalar value stored in a named record field.
///
/// Serializes to the plain JSON scalar, which is also how it is stored in
/// the `record_fields.value` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl FieldValue {
    /// Converts a JSON value into a field value. Arrays and objects are not
    /// scalar and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(FieldValue::Null),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => Some(FieldValue::Number(n.clone())),
            Value::String(s) => Some(FieldValue::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::String(s) => Value::String(s.clone()),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => number_as_f64(n) != 0.0,
            FieldValue::String(s) => !(s.is_empty() || s == "0"),
        }
    }

    /// Type-coercing equality used for change detection.
    ///
    /// Numeric strings compare numerically against numbers and other numeric
    /// strings (`"1" == 1`, `"1.0" == "1"`), booleans compare against the
    /// truthiness of the other side, and `null` equals `""`, `0` and `false`.
    pub fn loose_eq(&self, other: &FieldValue) -> bool {
        use FieldValue::*;

        match (self, other) {
            (Null, Null) => true,
            (Bool(b), other) | (other, Bool(b)) => *b == other.is_truthy(),
            (Null, String(s)) | (String(s), Null) => s.is_empty(),
            (Null, Number(n)) | (Number(n), Null) => number_as_f64(n) == 0.0,
            (Number(a), Number(b)) => Numeric::of(a).eq(Numeric::of(b)),
            (Number(n), String(s)) | (String(s), Number(n)) => match Numeric::parse(s) {
                Some(v) => v.eq(Numeric::of(n)),
                None => n.to_string() == *s,
            },
            (String(a), String(b)) => match (Numeric::parse(a), Numeric::parse(b)) {
                (Some(x), Some(y)) => x.eq(y),
                _ => a == b,
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

fn number_as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or_default()
}

/// A number or numeric string, kept as an integer when it has an exact `i64`
/// form so large ids compare without rounding.
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn of(n: &Number) -> Self {
        match n.as_i64() {
            Some(i) => Numeric::Int(i),
            None => Numeric::Float(number_as_f64(n)),
        }
    }

    /// Parses a numeric string (surrounding whitespace allowed). Words such
    /// as `inf` or `NaN` are not numeric.
    fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        {
            return None;
        }
        match trimmed.parse::<i64>() {
            Ok(i) => Some(Numeric::Int(i)),
            Err(_) => trimmed.parse::<f64>().ok().map(Numeric::Float),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    fn eq(self, other: Numeric) -> bool {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}
