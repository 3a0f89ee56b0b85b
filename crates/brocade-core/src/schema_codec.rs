//! `Schema` and `Tag` as wire values of their own system.
//!
//! A schema's canonical schema is `SchemaRef(CURRENT_VERSION)`; its encoded
//! form is exactly the encoding of the schema value under the bootstrap
//! schema for that version. The constructor tag order here mirrors the
//! bootstrap constructor order and is part of the wire format.

use brocade_error::{BrocadeError, Result};
use brocade_types::{tag_schema, varint, Schema, Tag, CURRENT_VERSION};

use crate::extract::{Extractor, VariantBuilder};
use crate::reader::ByteReader;
use crate::schematic::{SchemaExpr, SchemaGen, Schematic};

/// Upper bound on speculative `Vec` pre-allocation from wire lengths.
const MAX_PREALLOC: usize = 1024;

const SCHEMA_CTOR_COUNT: usize = 24;

impl Schematic for Tag {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(tag_schema())
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Int(value) => {
                varint::write_uvarint(out, 0);
                #[allow(clippy::cast_sign_loss)]
                varint::write_uvarint128(out, *value as u128);
            }
            Self::Str(text) => {
                varint::write_uvarint(out, 1);
                text.encode(out);
            }
            Self::List(items) => {
                varint::write_uvarint(out, 2);
                #[allow(clippy::cast_possible_truncation)]
                varint::write_uvarint(out, items.len() as u64);
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        match r.uvarint()? {
            #[allow(clippy::cast_possible_wrap)]
            0 => Ok(Self::Int(r.uvarint128()? as i128)),
            1 => Ok(Self::Str(r.text()?)),
            2 => {
                let len = r.length_prefix()?;
                let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
                for _ in 0..len {
                    items.push(Self::decode_native(r)?);
                }
                Ok(Self::List(items))
            }
            tag => Err(BrocadeError::InvalidTag { tag, arity: 3 }),
        }
    }

    fn extractor() -> Extractor<Self> {
        VariantBuilder::new()
            .arm("TagInt", i128::extractor().map(Tag::Int))
            .arm("TagStr", String::extractor().map(Tag::Str))
            .arm("TagList", Vec::<Tag>::extractor().map(Tag::List))
            .into_extractor()
    }
}

impl Schematic for Schema {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::SchemaRef(CURRENT_VERSION))
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Fix(body) => {
                varint::write_uvarint(out, 0);
                body.encode(out);
            }
            Self::SelfRef(depth) => {
                varint::write_uvarint(out, 1);
                out.push(*depth);
            }
            Self::Vector(element) => {
                varint::write_uvarint(out, 2);
                element.encode(out);
            }
            Self::Product(fields) => {
                varint::write_uvarint(out, 3);
                #[allow(clippy::cast_possible_truncation)]
                varint::write_uvarint(out, fields.len() as u64);
                for field in fields {
                    field.encode(out);
                }
            }
            Self::Record(fields) => {
                varint::write_uvarint(out, 4);
                encode_named_entries(out, fields);
            }
            Self::Variant(ctors) => {
                varint::write_uvarint(out, 5);
                encode_named_entries(out, ctors);
            }
            Self::SchemaRef(version) => {
                varint::write_uvarint(out, 6);
                out.push(*version);
            }
            Self::Bool => varint::write_uvarint(out, 7),
            Self::Char => varint::write_uvarint(out, 8),
            Self::U8 => varint::write_uvarint(out, 9),
            Self::U16 => varint::write_uvarint(out, 10),
            Self::U32 => varint::write_uvarint(out, 11),
            Self::U64 => varint::write_uvarint(out, 12),
            Self::I8 => varint::write_uvarint(out, 13),
            Self::I16 => varint::write_uvarint(out, 14),
            Self::I32 => varint::write_uvarint(out, 15),
            Self::I64 => varint::write_uvarint(out, 16),
            Self::Integer => varint::write_uvarint(out, 17),
            Self::F32 => varint::write_uvarint(out, 18),
            Self::F64 => varint::write_uvarint(out, 19),
            Self::Bytes => varint::write_uvarint(out, 20),
            Self::Text => varint::write_uvarint(out, 21),
            Self::Timestamp => varint::write_uvarint(out, 22),
            Self::Tag(tag, inner) => {
                varint::write_uvarint(out, 23);
                tag.encode(out);
                inner.encode(out);
            }
        }
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        let tag = r.uvarint()?;
        match tag {
            0 => Ok(Self::Fix(Box::new(Self::decode_native(r)?))),
            1 => Ok(Self::SelfRef(r.byte()?)),
            2 => Ok(Self::Vector(Box::new(Self::decode_native(r)?))),
            3 => {
                let len = r.length_prefix()?;
                let mut fields = Vec::with_capacity(len.min(MAX_PREALLOC));
                for _ in 0..len {
                    fields.push(Self::decode_native(r)?);
                }
                Ok(Self::Product(fields))
            }
            4 => decode_named_entries(r).map(Self::Record),
            5 => decode_named_entries(r).map(Self::Variant),
            6 => Ok(Self::SchemaRef(r.byte()?)),
            7 => Ok(Self::Bool),
            8 => Ok(Self::Char),
            9 => Ok(Self::U8),
            10 => Ok(Self::U16),
            11 => Ok(Self::U32),
            12 => Ok(Self::U64),
            13 => Ok(Self::I8),
            14 => Ok(Self::I16),
            15 => Ok(Self::I32),
            16 => Ok(Self::I64),
            17 => Ok(Self::Integer),
            18 => Ok(Self::F32),
            19 => Ok(Self::F64),
            20 => Ok(Self::Bytes),
            21 => Ok(Self::Text),
            22 => Ok(Self::Timestamp),
            23 => {
                let tag_value = Tag::decode_native(r)?;
                let inner = Self::decode_native(r)?;
                Ok(Self::tagged(tag_value, inner))
            }
            _ => Err(BrocadeError::InvalidTag {
                tag,
                arity: SCHEMA_CTOR_COUNT,
            }),
        }
    }

    fn extractor() -> Extractor<Self> {
        let builder = VariantBuilder::new()
            .arm("SFix", <(Schema,)>::extractor().map(|(s,)| Schema::fix(s)))
            .arm(
                "SSelf",
                <(u8,)>::extractor().map(|(n,)| Schema::SelfRef(n)),
            )
            .arm(
                "SVector",
                <(Schema,)>::extractor().map(|(s,)| Schema::vector(s)),
            )
            .arm(
                "SProduct",
                <(Vec<Schema>,)>::extractor().map(|(fields,)| Schema::Product(fields)),
            )
            .arm(
                "SRecord",
                <(Vec<(String, Schema)>,)>::extractor().map(|(fields,)| Schema::Record(fields)),
            )
            .arm(
                "SVariant",
                <(Vec<(String, Schema)>,)>::extractor().map(|(ctors,)| Schema::Variant(ctors)),
            )
            .arm(
                "SSchema",
                <(u8,)>::extractor().map(|(v,)| Schema::SchemaRef(v)),
            )
            .arm(
                "STag",
                <(Tag, Schema)>::extractor().map(|(tag, inner)| Schema::tagged(tag, inner)),
            );

        let leaves: [(&str, fn() -> Schema); 16] = [
            ("SBool", || Schema::Bool),
            ("SChar", || Schema::Char),
            ("SW8", || Schema::U8),
            ("SW16", || Schema::U16),
            ("SW32", || Schema::U32),
            ("SW64", || Schema::U64),
            ("SI8", || Schema::I8),
            ("SI16", || Schema::I16),
            ("SI32", || Schema::I32),
            ("SI64", || Schema::I64),
            ("SInteger", || Schema::Integer),
            ("SFloat", || Schema::F32),
            ("SDouble", || Schema::F64),
            ("SBytes", || Schema::Bytes),
            ("SText", || Schema::Text),
            ("SUTCTime", || Schema::Timestamp),
        ];
        leaves
            .into_iter()
            .fold(builder, |builder, (name, make)| {
                builder.arm(name, <()>::extractor().map(move |()| make()))
            })
            .into_extractor()
    }
}

fn encode_named_entries(out: &mut Vec<u8>, entries: &[(String, Schema)]) {
    #[allow(clippy::cast_possible_truncation)]
    varint::write_uvarint(out, entries.len() as u64);
    for (name, schema) in entries {
        name.encode(out);
        schema.encode(out);
    }
}

fn decode_named_entries(r: &mut ByteReader<'_>) -> Result<Vec<(String, Schema)>> {
    let len = r.length_prefix()?;
    let mut entries = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        let name = r.text()?;
        let schema = Schema::decode_native(r)?;
        entries.push((name, schema));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_term;
    use crate::extract::PlanEnv;
    use brocade_types::bootstrap;

    fn encode_of<T: Schematic>(value: &T) -> Vec<u8> {
        let mut out = Vec::new();
        value.encode(&mut out);
        out
    }

    fn complex_schema() -> Schema {
        Schema::fix(Schema::variant([
            ("Stop", Schema::product([])),
            (
                "Go",
                Schema::record([
                    ("speed", Schema::U16),
                    ("note", Schema::tagged(Tag::Str("doc".to_owned()), Schema::Text)),
                    ("trail", Schema::SelfRef(0)),
                    ("meta", Schema::SchemaRef(3)),
                ]),
            ),
        ]))
    }

    #[test]
    fn leaf_golden_bytes() {
        assert_eq!(encode_of(&Schema::Bool), [0x07]);
        assert_eq!(encode_of(&Schema::U8), [0x09]);
        assert_eq!(encode_of(&Schema::Timestamp), [0x16]);
        assert_eq!(encode_of(&Schema::SchemaRef(3)), [0x06, 0x03]);
        assert_eq!(encode_of(&Schema::SelfRef(1)), [0x01, 0x01]);
    }

    #[test]
    fn record_golden_bytes() {
        // SRecord, one entry, name "x", SI32.
        let schema = Schema::record([("x", Schema::I32)]);
        assert_eq!(encode_of(&schema), [0x04, 0x01, 0x01, b'x', 0x0F]);
    }

    #[test]
    fn schema_native_roundtrip() {
        for schema in [
            Schema::Bool,
            Schema::vector(Schema::U16),
            Schema::product([Schema::I8, Schema::Text]),
            complex_schema(),
            Schema::tagged(
                Tag::List(vec![Tag::Int(-5), Tag::Str("v".to_owned())]),
                Schema::Bytes,
            ),
        ] {
            let bytes = encode_of(&schema);
            let mut r = ByteReader::new(&bytes);
            let back = Schema::decode_native(&mut r).unwrap();
            assert_eq!(back, schema);
            assert!(r.is_empty());
        }
    }

    #[test]
    fn tag_native_roundtrip() {
        for tag in [
            Tag::Int(0),
            Tag::Int(-1),
            Tag::Int(i128::MAX),
            Tag::Str("release".to_owned()),
            Tag::List(vec![Tag::Int(1), Tag::List(vec![Tag::Str(String::new())])]),
        ] {
            let bytes = encode_of(&tag);
            let mut r = ByteReader::new(&bytes);
            assert_eq!(Tag::decode_native(&mut r).unwrap(), tag);
        }
    }

    #[test]
    fn schema_bytes_decode_as_terms_under_bootstrap() {
        // The encoding of a schema is a value of the bootstrap schema; the
        // generic term decoder must accept it.
        let schema = complex_schema();
        let bytes = encode_of(&schema);
        let mut r = ByteReader::new(&bytes);
        let term = decode_term(bootstrap(3).unwrap(), &mut r).unwrap();
        assert!(r.is_empty());

        // And the schema extractor recovers the schema from that term.
        let mut env = PlanEnv::new();
        let f = Schema::extractor()
            .plan(bootstrap(3).unwrap(), &mut env)
            .unwrap();
        assert_eq!(f(&term).unwrap(), schema);
    }

    #[test]
    fn unknown_constructor_tag_is_invalid() {
        let mut r = ByteReader::new(&[24]);
        let err = Schema::decode_native(&mut r).unwrap_err();
        assert_eq!(
            err,
            BrocadeError::InvalidTag {
                tag: 24,
                arity: 24
            }
        );
    }
}
