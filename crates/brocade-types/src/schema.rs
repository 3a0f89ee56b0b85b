//! The schema language.
//!
//! A [`Schema`] is a value describing the structural shape of encoded data:
//! primitive leaves, homogeneous vectors, positional products, named records
//! and variants, and recursive types expressed with explicit fixpoints.
//! Every serialized payload carries its schema as a prefix, so schemas are
//! themselves encodable values (see the bootstrap module).
//!
//! Equality is structural and literal: `Fix`/`SelfRef` compare syntactically,
//! with no alpha-equivalence. Two schemas are interchangeable on the wire
//! exactly when they are equal.

use std::fmt;

use brocade_error::{BrocadeError, Result};

/// Uninterpreted metadata attached to a schema node.
///
/// Tags never appear on the wire for the *value*; they travel only inside
/// the schema prefix, and the codec never dispatches on their contents.
/// Applications may read them back from a decoded schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Tag {
    /// An integer datum.
    Int(i128),
    /// A text datum.
    Str(String),
    /// A list of tags.
    List(Vec<Tag>),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// The structural description of an encoded value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Schema {
    /// Single byte; encoders emit 0 or 1, decoders accept any nonzero as true.
    Bool,
    /// Unicode scalar value, varint-encoded.
    Char,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit little-endian integer.
    U16,
    /// Unsigned 32-bit little-endian integer.
    U32,
    /// Unsigned 64-bit little-endian integer.
    U64,
    /// Signed 8-bit integer (two's complement).
    I8,
    /// Signed 16-bit little-endian integer.
    I16,
    /// Signed 32-bit little-endian integer.
    I32,
    /// Signed 64-bit little-endian integer.
    I64,
    /// Unbounded integer, varint-encoded through the unsigned cast.
    Integer,
    /// 32-bit IEEE-754 float.
    F32,
    /// 64-bit IEEE-754 float.
    F64,
    /// Varint byte length followed by raw bytes.
    Bytes,
    /// Varint UTF-8 byte length followed by UTF-8 bytes.
    Text,
    /// 64-bit IEEE-754 seconds since the POSIX epoch.
    Timestamp,
    /// The schema-of-schemas at the given version.
    SchemaRef(u8),
    /// Homogeneous variable-length array.
    Vector(Box<Schema>),
    /// Positional tuple; field order is the encoded order.
    Product(Vec<Schema>),
    /// Named fields; declaration order is the encoded order and is part of
    /// the schema.
    Record(Vec<(String, Schema)>),
    /// Sum of named alternatives; declaration order defines the wire tag.
    Variant(Vec<(String, Schema)>),
    /// Fixpoint binder for recursive schemas.
    Fix(Box<Schema>),
    /// Reference to the n-th enclosing `Fix` (0 = innermost).
    SelfRef(u8),
    /// Uninterpreted metadata around an inner schema.
    Tag(Tag, Box<Schema>),
}

impl Schema {
    /// Build a `Vector` schema.
    pub fn vector(element: Self) -> Self {
        Self::Vector(Box::new(element))
    }

    /// Build a `Product` schema.
    pub fn product(fields: impl IntoIterator<Item = Self>) -> Self {
        Self::Product(fields.into_iter().collect())
    }

    /// Build a `Record` schema.
    pub fn record<N: Into<String>>(fields: impl IntoIterator<Item = (N, Self)>) -> Self {
        Self::Record(fields.into_iter().map(|(n, s)| (n.into(), s)).collect())
    }

    /// Build a `Variant` schema.
    pub fn variant<N: Into<String>>(ctors: impl IntoIterator<Item = (N, Self)>) -> Self {
        Self::Variant(ctors.into_iter().map(|(n, s)| (n.into(), s)).collect())
    }

    /// Build a `Fix` schema.
    pub fn fix(body: Self) -> Self {
        Self::Fix(Box::new(body))
    }

    /// Build a `Tag` schema.
    pub fn tagged(tag: Tag, inner: Self) -> Self {
        Self::Tag(tag, Box::new(inner))
    }

    /// Strip any number of `Tag` wrappers.
    pub fn untagged(&self) -> &Self {
        let mut s = self;
        while let Self::Tag(_, inner) = s {
            s = inner;
        }
        s
    }

    /// Whether this leaf is an integral or floating numeric schema.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::Integer
                | Self::F32
                | Self::F64
        )
    }

    /// Bit width of an unsigned integer leaf.
    pub const fn unsigned_bits(&self) -> Option<u32> {
        match self {
            Self::U8 => Some(8),
            Self::U16 => Some(16),
            Self::U32 => Some(32),
            Self::U64 => Some(64),
            _ => None,
        }
    }

    /// Bit width of a signed integer leaf.
    pub const fn signed_bits(&self) -> Option<u32> {
        match self {
            Self::I8 => Some(8),
            Self::I16 => Some(16),
            Self::I32 => Some(32),
            Self::I64 => Some(64),
            _ => None,
        }
    }

    /// Check well-formedness.
    ///
    /// A well-formed schema has every `SelfRef(n)` under at least `n + 1`
    /// enclosing `Fix` binders, unique field names within each record, and
    /// unique constructor names within each variant. `SchemaRef` versions
    /// are *not* resolved here; an unknown version only fails at decode time.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: u32) -> Result<()> {
        match self {
            Self::SelfRef(n) => {
                if u32::from(*n) >= depth {
                    return Err(BrocadeError::malformed(format!(
                        "self reference {n} under only {depth} fixpoint binder(s)"
                    )));
                }
                Ok(())
            }
            Self::Fix(body) => body.validate_at(depth + 1),
            Self::Vector(element) => element.validate_at(depth),
            Self::Product(fields) => {
                for field in fields {
                    field.validate_at(depth)?;
                }
                Ok(())
            }
            Self::Record(fields) => {
                check_unique_names(fields, "record field")?;
                for (_, field) in fields {
                    field.validate_at(depth)?;
                }
                Ok(())
            }
            Self::Variant(ctors) => {
                check_unique_names(ctors, "variant constructor")?;
                for (_, payload) in ctors {
                    payload.validate_at(depth)?;
                }
                Ok(())
            }
            Self::Tag(_, inner) => inner.validate_at(depth),
            _ => Ok(()),
        }
    }
}

fn check_unique_names(entries: &[(String, Schema)], kind: &str) -> Result<()> {
    for (i, (name, _)) in entries.iter().enumerate() {
        if entries[..i].iter().any(|(seen, _)| seen == name) {
            return Err(BrocadeError::malformed(format!(
                "duplicate {kind} name `{name}`"
            )));
        }
    }
    Ok(())
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("Bool"),
            Self::Char => f.write_str("Char"),
            Self::U8 => f.write_str("U8"),
            Self::U16 => f.write_str("U16"),
            Self::U32 => f.write_str("U32"),
            Self::U64 => f.write_str("U64"),
            Self::I8 => f.write_str("I8"),
            Self::I16 => f.write_str("I16"),
            Self::I32 => f.write_str("I32"),
            Self::I64 => f.write_str("I64"),
            Self::Integer => f.write_str("Integer"),
            Self::F32 => f.write_str("F32"),
            Self::F64 => f.write_str("F64"),
            Self::Bytes => f.write_str("Bytes"),
            Self::Text => f.write_str("Text"),
            Self::Timestamp => f.write_str("Timestamp"),
            Self::SchemaRef(v) => write!(f, "Schema@{v}"),
            Self::Vector(element) => write!(f, "[{element}]"),
            Self::Product(fields) => {
                f.write_str("(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str(")")
            }
            Self::Record(fields) => {
                f.write_str("{")?;
                for (i, (name, field)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {field}")?;
                }
                f.write_str("}")
            }
            Self::Variant(ctors) => {
                f.write_str("<")?;
                for (i, (name, payload)) in ctors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{name}: {payload}")?;
                }
                f.write_str(">")
            }
            Self::Fix(body) => write!(f, "fix {body}"),
            Self::SelfRef(n) => write!(f, "self.{n}"),
            Self::Tag(tag, inner) => write!(f, "tag({tag}, {inner})"),
        }
    }
}
