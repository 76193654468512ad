use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use geo::Geometry;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::value::{DATE_FORMAT, TIMESTAMP_FORMAT, TIME_FORMAT};
use super::Value;
use crate::error::{ExpressionError, ExpressionResult};

/// Declared type of a field or cast target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    String,
    Date,
    Time,
    Timestamp,
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    Object,
}

impl DataType {
    /// Parses a type name case-insensitively, accepting common SQL aliases.
    /// A length suffix such as `varchar(10)` is ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let base = match name.find('(') {
            Some(paren) => &name[..paren],
            None => name,
        };
        let data_type = match base.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => DataType::Boolean,
            "short" | "smallint" => DataType::Short,
            "int" | "integer" => DataType::Int,
            "long" | "bigint" => DataType::Long,
            "float" | "real" => DataType::Float,
            "double" | "double precision" => DataType::Double,
            "decimal" | "numeric" | "number" => DataType::Decimal,
            "string" | "varchar" | "char" | "text" | "character varying" => DataType::String,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "timestamp" | "datetime" => DataType::Timestamp,
            "geometry" => DataType::Geometry,
            "point" => DataType::Point,
            "linestring" => DataType::LineString,
            "polygon" => DataType::Polygon,
            "multipoint" => DataType::MultiPoint,
            "multilinestring" => DataType::MultiLineString,
            "multipolygon" => DataType::MultiPolygon,
            "geometrycollection" => DataType::GeometryCollection,
            "object" => DataType::Object,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Decimal => "decimal",
            DataType::String => "string",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::Timestamp => "timestamp",
            DataType::Geometry => "geometry",
            DataType::Point => "point",
            DataType::LineString => "linestring",
            DataType::Polygon => "polygon",
            DataType::MultiPoint => "multipoint",
            DataType::MultiLineString => "multilinestring",
            DataType::MultiPolygon => "multipolygon",
            DataType::GeometryCollection => "geometrycollection",
            DataType::Object => "object",
        }
    }

    pub(crate) fn of_geometry(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => DataType::Point,
            Geometry::LineString(_) | Geometry::Line(_) => DataType::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => DataType::Polygon,
            Geometry::MultiPoint(_) => DataType::MultiPoint,
            Geometry::MultiLineString(_) => DataType::MultiLineString,
            Geometry::MultiPolygon(_) => DataType::MultiPolygon,
            Geometry::GeometryCollection(_) => DataType::GeometryCollection,
        }
    }

    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            DataType::Geometry
                | DataType::Point
                | DataType::LineString
                | DataType::Polygon
                | DataType::MultiPoint
                | DataType::MultiLineString
                | DataType::MultiPolygon
                | DataType::GeometryCollection
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Short
                | DataType::Int
                | DataType::Long
                | DataType::Float
                | DataType::Double
                | DataType::Decimal
        )
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Short | DataType::Int | DataType::Long)
    }

    /// Converts `value` to this type, failing with a coercion error.
    ///
    /// `Null` converts to `Null` for every type; an empty string converts to
    /// `Null` for every type except `String`.
    pub fn convert(&self, value: &Value) -> ExpressionResult<Value> {
        if value.is_null() || *self == DataType::Object {
            return Ok(value.clone());
        }
        if let Value::String(text) = value {
            if text.trim().is_empty() && *self != DataType::String {
                return Ok(Value::Null);
            }
        }
        let converted = match self {
            DataType::Boolean => to_boolean(value),
            DataType::Short => to_integral(value, *self).and_then(|d| d.to_i16()).map(Value::Short),
            DataType::Int => to_integral(value, *self).and_then(|d| d.to_i32()).map(Value::Int),
            DataType::Long => to_integral(value, *self).and_then(|d| d.to_i64()).map(Value::Long),
            DataType::Float => to_float(value).map(|v| Value::Float(v as f32)),
            DataType::Double => to_float(value).map(Value::Double),
            DataType::Decimal => to_decimal(value).map(Value::Decimal),
            DataType::String => to_string(value),
            DataType::Date => to_date(value),
            DataType::Time => to_time(value),
            DataType::Timestamp => to_timestamp(value).map(Value::Timestamp),
            DataType::Object => Some(value.clone()),
            geometry_type => to_geometry(value, *geometry_type),
        };
        converted.ok_or_else(|| {
            ExpressionError::coercion(self.name(), value, format!("cannot convert to {}", self))
        })
    }

    /// Like [`DataType::convert`] but returns the original value when it
    /// cannot be converted.
    pub fn convert_lenient(&self, value: &Value) -> Value {
        match self.convert(value) {
            Ok(converted) => converted,
            Err(err) => {
                log::warn!("{}; keeping the original value", err);
                value.clone()
            }
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(text) => parse_decimal(text),
        Value::Boolean(b) => Some(Decimal::from(u8::from(*b))),
        other => other.to_decimal(),
    }
}

fn to_integral(value: &Value, data_type: DataType) -> Option<Decimal> {
    let decimal = to_decimal(value)?;
    if decimal.fract().is_zero() {
        Some(decimal)
    } else {
        log::debug!("{} has a fraction and cannot become {}", decimal, data_type);
        None
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.to_f64(),
    }
}

fn to_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Boolean(b) => Some(Value::Boolean(*b)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "on" => Some(Value::Boolean(true)),
            "false" | "f" | "no" | "n" | "0" | "off" => Some(Value::Boolean(false)),
            _ => None,
        },
        other => other.to_decimal().map(|d| Value::Boolean(!d.is_zero())),
    }
}

fn to_string(value: &Value) -> Option<Value> {
    match value {
        Value::List(_) | Value::Geometry(_) | Value::BoundingBox(_) => None,
        other => Some(Value::String(other.to_plain_string())),
    }
}

fn to_date(value: &Value) -> Option<Value> {
    match value {
        Value::Date(date) => Some(Value::Date(*date)),
        Value::Timestamp(ts) => Some(Value::Date(ts.date())),
        Value::String(text) => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .ok()
            .or_else(|| parse_timestamp(text).map(|ts| ts.date()))
            .map(Value::Date),
        _ => None,
    }
}

fn to_time(value: &Value) -> Option<Value> {
    match value {
        Value::Time(time) => Some(Value::Time(*time)),
        Value::Timestamp(ts) => Some(Value::Time(ts.time())),
        Value::String(text) => NaiveTime::parse_from_str(text.trim(), TIME_FORMAT)
            .ok()
            .map(Value::Time),
        _ => None,
    }
}

fn to_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(text) => parse_timestamp(text).or_else(|| {
            NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        }),
        Value::Long(millis) => chrono::DateTime::<chrono::Utc>::from_timestamp_millis(*millis).map(|dt| dt.naive_utc()),
        other => other.to_timestamp(),
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

fn to_geometry(value: &Value, data_type: DataType) -> Option<Value> {
    match value {
        Value::Geometry(geometry) => {
            let matches = data_type == DataType::Geometry || DataType::of_geometry(geometry) == data_type;
            matches.then(|| value.clone())
        }
        Value::BoundingBox(bbox) if matches!(data_type, DataType::Geometry | DataType::Polygon) => bbox
            .to_polygon()
            .map(|polygon| Value::Geometry(Arc::new(Geometry::Polygon(polygon)))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(DataType::from_name("VARCHAR(10)"), Some(DataType::String));
        assert_eq!(DataType::from_name("Integer"), Some(DataType::Int));
        assert_eq!(DataType::from_name("numeric(10,2)"), Some(DataType::Decimal));
        assert_eq!(DataType::from_name("MultiPolygon"), Some(DataType::MultiPolygon));
        assert_eq!(DataType::from_name("blob"), None);
    }

    #[test]
    fn test_convert_numbers() {
        assert_eq!(DataType::Int.convert(&Value::from("30")).unwrap(), Value::Int(30));
        assert_eq!(DataType::Int.convert(&Value::Long(30)).unwrap(), Value::Int(30));
        assert_eq!(DataType::Long.convert(&Value::Double(4.0)).unwrap(), Value::Long(4));
        assert!(DataType::Int.convert(&Value::Double(4.5)).is_err());
        assert!(DataType::Short.convert(&Value::Int(100_000)).is_err());
        assert!(DataType::Int.convert(&Value::from("abc")).is_err());
        assert_eq!(
            DataType::Decimal.convert(&Value::from("12.50")).unwrap(),
            Value::Decimal(Decimal::new(1250, 2))
        );
    }

    #[test]
    fn test_convert_empty_string_is_null() {
        assert_eq!(DataType::Int.convert(&Value::from("  ")).unwrap(), Value::Null);
        assert_eq!(DataType::String.convert(&Value::from("")).unwrap(), Value::from(""));
        assert_eq!(DataType::Date.convert(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_convert_temporal() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
        assert_eq!(DataType::Date.convert(&Value::from("2021-06-30")).unwrap(), Value::Date(date));
        assert_eq!(
            DataType::Timestamp.convert(&Value::Date(date)).unwrap(),
            Value::Timestamp(date.and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            DataType::Timestamp.convert(&Value::from("2021-06-30 10:15:00")).unwrap(),
            Value::Timestamp(date.and_hms_opt(10, 15, 0).unwrap())
        );
        assert!(DataType::Time.convert(&Value::from("noon")).is_err());
    }

    #[test]
    fn test_convert_boolean_and_string() {
        assert_eq!(DataType::Boolean.convert(&Value::from("Y")).unwrap(), Value::Boolean(true));
        assert_eq!(DataType::Boolean.convert(&Value::Int(0)).unwrap(), Value::Boolean(false));
        assert_eq!(DataType::String.convert(&Value::Int(7)).unwrap(), Value::from("7"));
    }

    #[test]
    fn test_convert_lenient_keeps_original() {
        assert_eq!(DataType::Int.convert_lenient(&Value::from("abc")), Value::from("abc"));
    }
}
