use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// A single property value carried between domain objects and drivers.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
}

/// Render a timestamp the way every backend stores it.
///
/// Always nine fractional digits and a `Z` suffix: lossless for any
/// `DateTime<Utc>`, and the fixed width keeps the text form sortable.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "bool",
            FieldValue::Date(_) => "date",
        }
    }

    /// Text form used for comparisons against document stores, where
    /// `metadata->>'field'` always yields text. `None` for `Null`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Date(d) => Some(format_date(d)),
        }
    }

    /// Equality as a document store sees it: two values match when their
    /// text forms are equal, so `Integer(5)` matches `String("5")`.
    pub fn matches(&self, other: &FieldValue) -> bool {
        self.as_text() == other.as_text()
    }

    /// Total order used for client-side sorting. Nulls sort first; numbers
    /// and dates compare by value, everything else by text.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        use FieldValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (a, b) => a.as_text().cmp(&b.as_text()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Date(d) => serde_json::Value::String(format_date(d)),
        }
    }

    /// Dates come back as strings; `FromFieldValue` parses them on the way
    /// into the domain type. Nested arrays and objects are kept as JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
            },
            serde_json::Value::String(s) => FieldValue::String(s.clone()),
            other => FieldValue::String(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

/// Why a property could not be read from or written to a domain object.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    UnknownProperty(String),
    TypeMismatch { expected: &'static str, found: String },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::UnknownProperty(name) => write!(f, "unknown property '{name}'"),
            FieldError::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for FieldError {}

fn mismatch(expected: &'static str, value: &FieldValue) -> FieldError {
    FieldError::TypeMismatch {
        expected,
        found: format!("{} `{value}`", value.type_name()),
    }
}

/// Conversion from a domain field into a [`FieldValue`].
pub trait IntoFieldValue {
    fn to_field_value(&self) -> FieldValue;
}

/// Conversion from a stored [`FieldValue`] back into a domain field.
///
/// Lenient in the same way typed configuration is: text is parsed into
/// numbers, booleans and dates, because document stores hand back text.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be read from a stored field",
    note = "built-in types: String, i64, i32, u32, f64, bool, DateTime<Utc>, Option<T>"
)]
pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue) -> Result<Self, FieldError>;
}

impl IntoFieldValue for String {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::String(self.clone())
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Null => Err(mismatch("string", value)),
            other => Ok(other.to_string()),
        }
    }
}

impl IntoFieldValue for i64 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }
}

impl FromFieldValue for i64 {
    fn from_field_value(value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Integer(i) => Ok(*i),
            FieldValue::String(s) => s.trim().parse().map_err(|_| mismatch("integer", value)),
            _ => Err(mismatch("integer", value)),
        }
    }
}

macro_rules! impl_narrow_int {
    ($($ty:ty),+) => {
        $(
            impl IntoFieldValue for $ty {
                fn to_field_value(&self) -> FieldValue {
                    FieldValue::Integer(i64::from(*self))
                }
            }

            impl FromFieldValue for $ty {
                fn from_field_value(value: &FieldValue) -> Result<Self, FieldError> {
                    let wide = i64::from_field_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| mismatch(stringify!($ty), value))
                }
            }
        )+
    };
}

impl_narrow_int!(i32, u32);

impl IntoFieldValue for f64 {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Float(f) => Ok(*f),
            FieldValue::Integer(i) => Ok(*i as f64),
            FieldValue::String(s) => s.trim().parse().map_err(|_| mismatch("float", value)),
            _ => Err(mismatch("float", value)),
        }
    }
}

impl IntoFieldValue for bool {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Bool(b) => Ok(*b),
            FieldValue::String(s) => match s.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(mismatch("bool", value)),
            },
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl IntoFieldValue for DateTime<Utc> {
    fn to_field_value(&self) -> FieldValue {
        FieldValue::Date(*self)
    }
}

impl FromFieldValue for DateTime<Utc> {
    fn from_field_value(value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Date(d) => Ok(*d),
            FieldValue::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| mismatch("date", value)),
            _ => Err(mismatch("date", value)),
        }
    }
}

impl<T: IntoFieldValue> IntoFieldValue for Option<T> {
    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(inner) => inner.to_field_value(),
            None => FieldValue::Null,
        }
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(value: &FieldValue) -> Result<Self, FieldError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn text_values_parse_into_typed_fields() {
        assert_eq!(i64::from_field_value(&"42".into()).unwrap(), 42);
        assert!(bool::from_field_value(&"true".into()).unwrap());
        let date = DateTime::<Utc>::from_field_value(&"2024-03-01T12:00:00.000Z".into()).unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn null_only_fits_optional_fields() {
        assert!(String::from_field_value(&FieldValue::Null).is_err());
        assert_eq!(Option::<String>::from_field_value(&FieldValue::Null).unwrap(), None);
    }

    #[test]
    fn narrow_integers_reject_overflow() {
        assert!(i32::from_field_value(&FieldValue::Integer(i64::MAX)).is_err());
        assert_eq!(u32::from_field_value(&FieldValue::Integer(7)).unwrap(), 7);
    }

    #[test]
    fn loose_matching_compares_text_forms() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(FieldValue::Integer(5).matches(&"5".into()));
        assert!(FieldValue::Date(date).matches(&"2024-03-01T12:00:00.000000000Z".into()));
        assert!(FieldValue::Null.matches(&FieldValue::Null));
        assert!(!FieldValue::Null.matches(&"".into()));
    }

    #[test]
    fn dates_keep_nanoseconds_and_sort_as_text() {
        let early = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let late = Utc.timestamp_opt(1_700_000_000, 900_000_000).unwrap();
        assert_eq!(format_date(&early), "2023-11-14T22:13:20.123456789Z");

        let back = DateTime::<Utc>::from_field_value(&FieldValue::Date(early).to_json().as_str().unwrap().into()).unwrap();
        assert_eq!(back, early);
        assert!(format_date(&early) < format_date(&late));
    }

    #[test]
    fn numbers_sort_numerically() {
        assert_eq!(FieldValue::Integer(9).compare(&FieldValue::Integer(10)), Ordering::Less);
        assert_eq!(FieldValue::Null.compare(&"a".into()), Ordering::Less);
    }
}
