use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use geo::Geometry;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::DataType;
use crate::geometry::BoundingBox;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Values carried by literals, records and bound parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Geometry(Arc<Geometry<f64>>),
    BoundingBox(BoundingBox),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type tag this value naturally belongs to, `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        let data_type = match self {
            Value::Null => return None,
            Value::Boolean(_) => DataType::Boolean,
            Value::Short(_) => DataType::Short,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Decimal(_) => DataType::Decimal,
            Value::String(_) => DataType::String,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Geometry(geometry) => DataType::of_geometry(geometry),
            Value::BoundingBox(_) | Value::List(_) => DataType::Object,
        };
        Some(data_type)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::Decimal(_)
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::Time(_) | Value::Timestamp(_))
    }

    /// Exact decimal form of a numeric value.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Short(v) => Some(Decimal::from(*v)),
            Value::Int(v) => Some(Decimal::from(*v)),
            Value::Long(v) => Some(Decimal::from(*v)),
            Value::Float(v) => Decimal::from_f32(*v),
            Value::Double(v) => Decimal::from_f64(*v),
            Value::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Short(v) => Some(f64::from(*v)),
            Value::Int(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Decimal(v) => v.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            Value::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    /// Dates are promoted to midnight so they order against timestamps.
    pub fn to_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(date) => date.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    /// Converts an arithmetic result back into this value's numeric type.
    ///
    /// Integral targets truncate; a result the target cannot hold stays a
    /// decimal.
    pub fn with_decimal(&self, result: Decimal) -> Value {
        let converted = match self {
            Value::Short(_) => result.trunc().to_i16().map(Value::Short),
            Value::Int(_) => result.trunc().to_i32().map(Value::Int),
            Value::Long(_) => result.trunc().to_i64().map(Value::Long),
            Value::Float(_) => result.to_f32().map(Value::Float),
            Value::Double(_) => result.to_f64().map(Value::Double),
            _ => None,
        };
        converted.unwrap_or(Value::Decimal(result))
    }

    /// As [`with_decimal`](Self::with_decimal) for a result computed in
    /// floating point. Only a float target stays single precision.
    pub fn with_f64(&self, result: f64) -> Value {
        match self {
            Value::Float(_) if result.abs() <= f64::from(f32::MAX) => Value::Float(result as f32),
            _ => Value::Double(result),
        }
    }

    /// Unquoted text form used for string conversion and code lookups.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Date(date) => date.format(DATE_FORMAT).to_string(),
            Value::Time(time) => time.format(TIME_FORMAT).to_string(),
            Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Geometry(geometry) => format!("{:?}", geometry),
            Value::BoundingBox(bbox) => bbox.to_string(),
            other => other.to_string(),
        }
    }
}

/// SQL literal text: quoted strings, JDBC escapes for temporal values.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(true) => write!(f, "TRUE"),
            Value::Boolean(false) => write!(f, "FALSE"),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(s) => write_quoted(f, s),
            Value::Date(date) => write!(f, "{{d '{}'}}", date.format(DATE_FORMAT)),
            Value::Time(time) => write!(f, "{{t '{}'}}", time.format(TIME_FORMAT)),
            Value::Timestamp(ts) => write!(f, "{{ts '{}'}}", ts.format(TIMESTAMP_FORMAT)),
            Value::Geometry(_) | Value::BoundingBox(_) => write_quoted(f, &self.to_plain_string()),
            Value::List(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "'{}'", text.replace('\'', "''"))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Geometry<f64>> for Value {
    fn from(v: Geometry<f64>) -> Self {
        Value::Geometry(Arc::new(v))
    }
}

impl From<BoundingBox> for Value {
    fn from(v: BoundingBox) -> Self {
        Value::BoundingBox(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    #[test]
    fn test_display_quotes_strings() {
        assert_eq!(Value::from("O'Brien").to_string(), "'O''Brien'");
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from(true).to_string(), "TRUE");
    }

    #[test]
    fn test_display_temporal_escapes() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(Value::from(date).to_string(), "{d '2024-03-01'}");

        let time = NaiveTime::from_hms_opt(13, 5, 9).unwrap();
        assert_eq!(Value::from(time).to_string(), "{t '13:05:09'}");

        let ts = date.and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(Value::from(ts).to_string(), "{ts '2024-03-01 08:30:00'}");
    }

    #[test]
    fn test_data_type() {
        assert_eq!(Value::Null.data_type(), None);
        assert_eq!(Value::from(1i64).data_type(), Some(DataType::Long));
        let point: Geometry<f64> = point!(x: 1.0, y: 2.0).into();
        assert_eq!(Value::from(point).data_type(), Some(DataType::Point));
    }

    #[test]
    fn test_with_decimal_keeps_left_type() {
        assert_eq!(Value::Int(7).with_decimal(Decimal::new(35, 1)), Value::Int(3));
        assert_eq!(Value::Double(1.0).with_decimal(Decimal::new(25, 1)), Value::Double(2.5));
        assert_eq!(
            Value::Short(1).with_decimal(Decimal::from(100_000)),
            Value::Decimal(Decimal::from(100_000))
        );
    }

    #[test]
    fn test_with_f64() {
        assert_eq!(Value::Float(1.0).with_f64(2.5), Value::Float(2.5));
        assert_eq!(Value::Float(1.0).with_f64(1e300), Value::Double(1e300));
        assert_eq!(Value::Long(1).with_f64(1e30), Value::Double(1e30));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
    }
}
