//! The generic term model.
//!
//! A [`Term`] is the schema-indexed decoded form of any payload: enough to
//! inspect, pretty-print, or project to JSON without the producer's type
//! definitions, and the intermediate form the planner's term functions
//! consume. The `name` and `tag` carried by records and variants come from
//! the schema the term was decoded against, never from the wire.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// A generic inhabitant of some schema.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Term {
    Bool(bool),
    Char(char),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// Unbounded integer leaf; the host binding is 128-bit.
    Integer(i128),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Text(String),
    /// Seconds since the POSIX epoch, as carried on the wire.
    Timestamp(f64),
    Vector(Vec<Term>),
    Product(Vec<Term>),
    Record(Vec<(String, Term)>),
    Variant {
        tag: u32,
        name: String,
        payload: Box<Term>,
    },
}

impl Term {
    /// The boolean payload, if this is a `Bool` leaf.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text payload, if this is a `Text` leaf.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The byte payload, if this is a `Bytes` leaf.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Any integral leaf widened to `i128`.
    ///
    /// This is the conversion surface for numeric widening: every bounded
    /// integer leaf and the unbounded `Integer` leaf fit losslessly.
    pub const fn integral_as_i128(&self) -> Option<i128> {
        match self {
            Self::U8(x) => Some(*x as i128),
            Self::U16(x) => Some(*x as i128),
            Self::U32(x) => Some(*x as i128),
            Self::U64(x) => Some(*x as i128),
            Self::I8(x) => Some(*x as i128),
            Self::I16(x) => Some(*x as i128),
            Self::I32(x) => Some(*x as i128),
            Self::I64(x) => Some(*x as i128),
            Self::Integer(x) => Some(*x),
            _ => None,
        }
    }

    /// Any floating leaf widened to `f64`.
    pub fn float_as_f64(&self) -> Option<f64> {
        match self {
            Self::F32(x) => Some(*x as f64),
            Self::F64(x) => Some(*x),
            _ => None,
        }
    }

    /// Project this term to JSON.
    ///
    /// Records become objects, variants become single-entry objects keyed by
    /// constructor name, byte strings become hex strings, timestamps become
    /// RFC 3339 strings. Non-finite floats become `null` (JSON has no NaN).
    /// Integers wider than 64 bits are carried as decimal strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Char(c) => Value::String(c.to_string()),
            Self::U8(x) => Value::from(*x),
            Self::U16(x) => Value::from(*x),
            Self::U32(x) => Value::from(*x),
            Self::U64(x) => Value::from(*x),
            Self::I8(x) => Value::from(*x),
            Self::I16(x) => Value::from(*x),
            Self::I32(x) => Value::from(*x),
            Self::I64(x) => Value::from(*x),
            Self::Integer(x) => {
                if let Ok(small) = i64::try_from(*x) {
                    Value::from(small)
                } else if let Ok(big) = u64::try_from(*x) {
                    Value::from(big)
                } else {
                    Value::String(x.to_string())
                }
            }
            Self::F32(x) => serde_json::Number::from_f64(f64::from(*x))
                .map_or(Value::Null, Value::Number),
            Self::F64(x) => serde_json::Number::from_f64(*x).map_or(Value::Null, Value::Number),
            Self::Bytes(bytes) => Value::String(hex_string(bytes)),
            Self::Text(s) => Value::String(s.clone()),
            Self::Timestamp(secs) => timestamp_to_datetime(*secs).map_or_else(
                || serde_json::Number::from_f64(*secs).map_or(Value::Null, Value::Number),
                |dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ),
            Self::Vector(items) | Self::Product(items) => {
                Value::Array(items.iter().map(Term::to_json).collect())
            }
            Self::Record(fields) => {
                let mut map = serde_json::Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                Value::Object(map)
            }
            Self::Variant { name, payload, .. } => {
                let mut map = serde_json::Map::new();
                map.insert(name.clone(), payload.to_json());
                Value::Object(map)
            }
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    use fmt::Write as _;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Convert wire seconds-since-epoch into a UTC datetime.
///
/// Returns `None` for non-finite input or values outside chrono's range.
#[allow(clippy::cast_possible_truncation)]
pub fn timestamp_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let nanos = ((secs - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Convert a UTC datetime into wire seconds-since-epoch.
#[allow(clippy::cast_precision_loss)]
pub fn datetime_to_timestamp(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Char(c) => write!(f, "{c:?}"),
            Self::U8(x) => write!(f, "{x}"),
            Self::U16(x) => write!(f, "{x}"),
            Self::U32(x) => write!(f, "{x}"),
            Self::U64(x) => write!(f, "{x}"),
            Self::I8(x) => write!(f, "{x}"),
            Self::I16(x) => write!(f, "{x}"),
            Self::I32(x) => write!(f, "{x}"),
            Self::I64(x) => write!(f, "{x}"),
            Self::Integer(x) => write!(f, "{x}"),
            Self::F32(x) => write!(f, "{x}"),
            Self::F64(x) => write!(f, "{x}"),
            Self::Bytes(bytes) => write!(f, "0x{}", hex_string(bytes)),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Timestamp(secs) => match timestamp_to_datetime(*secs) {
                Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                None => write!(f, "@{secs}s"),
            },
            Self::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Product(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Record(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name} = {value}")?;
                }
                f.write_str("}")
            }
            Self::Variant { name, payload, .. } => {
                if matches!(payload.as_ref(), Self::Product(items) if items.is_empty()) {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name} {payload}")
                }
            }
        }
    }
}
