//! Schema-driven decoding of a byte stream into a generic [`Term`].
//!
//! The decoder walks the schema and the input in lockstep: the schema alone
//! determines the layout, the wire carries no per-field framing. Recursive
//! schemas are handled with a stack of enclosing `Fix` bodies indexed by
//! `SelfRef` depth; re-entering a fixpoint truncates the stack back to that
//! binder's depth, so inner binders never leak into outer recursion.

use brocade_error::{BrocadeError, Result};
use brocade_types::{bootstrap, Schema, Term};

use crate::reader::ByteReader;

/// Upper bound on speculative `Vec` pre-allocation from wire lengths.
const MAX_PREALLOC: usize = 1024;

/// Decode one term of shape `schema` from `r`.
pub fn decode_term(schema: &Schema, r: &mut ByteReader<'_>) -> Result<Term> {
    let mut points = Vec::new();
    decode_at(schema, &mut points, r)
}

fn decode_at<'s>(
    schema: &'s Schema,
    points: &mut Vec<&'s Schema>,
    r: &mut ByteReader<'_>,
) -> Result<Term> {
    match schema {
        Schema::Bool => Ok(Term::Bool(r.boolean()?)),
        Schema::Char => Ok(Term::Char(r.character()?)),
        Schema::U8 => Ok(Term::U8(r.byte()?)),
        Schema::U16 => Ok(Term::U16(r.u16_le()?)),
        Schema::U32 => Ok(Term::U32(r.u32_le()?)),
        Schema::U64 => Ok(Term::U64(r.u64_le()?)),
        #[allow(clippy::cast_possible_wrap)]
        Schema::I8 => Ok(Term::I8(r.byte()? as i8)),
        #[allow(clippy::cast_possible_wrap)]
        Schema::I16 => Ok(Term::I16(r.u16_le()? as i16)),
        #[allow(clippy::cast_possible_wrap)]
        Schema::I32 => Ok(Term::I32(r.u32_le()? as i32)),
        #[allow(clippy::cast_possible_wrap)]
        Schema::I64 => Ok(Term::I64(r.u64_le()? as i64)),
        #[allow(clippy::cast_possible_wrap)]
        Schema::Integer => Ok(Term::Integer(r.uvarint128()? as i128)),
        Schema::F32 => Ok(Term::F32(r.f32_le()?)),
        Schema::F64 => Ok(Term::F64(r.f64_le()?)),
        Schema::Bytes => Ok(Term::Bytes(r.byte_string()?)),
        Schema::Text => Ok(Term::Text(r.text()?)),
        Schema::Timestamp => Ok(Term::Timestamp(r.f64_le()?)),
        Schema::SchemaRef(version) => {
            let resolved = bootstrap(*version).ok_or(BrocadeError::UnknownSchemaVersion {
                version: *version,
            })?;
            // The bootstrap schema is closed; it cannot see outer binders.
            decode_term(resolved, r)
        }
        Schema::Vector(element) => {
            let len = r.length_prefix()?;
            let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
            for _ in 0..len {
                items.push(decode_at(element, points, r)?);
            }
            Ok(Term::Vector(items))
        }
        Schema::Product(fields) => {
            let mut items = Vec::with_capacity(fields.len());
            for field in fields {
                items.push(decode_at(field, points, r)?);
            }
            Ok(Term::Product(items))
        }
        Schema::Record(fields) => {
            let mut items = Vec::with_capacity(fields.len());
            for (name, field) in fields {
                items.push((name.clone(), decode_at(field, points, r)?));
            }
            Ok(Term::Record(items))
        }
        Schema::Variant(ctors) => {
            let tag = r.uvarint()?;
            let index = usize::try_from(tag)
                .ok()
                .filter(|&i| i < ctors.len())
                .ok_or(BrocadeError::InvalidTag {
                    tag,
                    arity: ctors.len(),
                })?;
            let (name, payload_schema) = &ctors[index];
            let payload = decode_at(payload_schema, points, r)?;
            let tag = u32::try_from(index).map_err(|_| BrocadeError::InvalidTag {
                tag,
                arity: ctors.len(),
            })?;
            Ok(Term::Variant {
                tag,
                name: name.clone(),
                payload: Box::new(payload),
            })
        }
        Schema::Fix(body) => {
            points.push(body);
            let result = decode_at(body, points, r);
            points.pop();
            result
        }
        Schema::SelfRef(depth) => {
            let index = points
                .len()
                .checked_sub(usize::from(*depth) + 1)
                .ok_or_else(|| {
                    BrocadeError::malformed(format!(
                        "self reference {depth} under only {} fixpoint binder(s)",
                        points.len()
                    ))
                })?;
            let target = points[index];
            // Re-enter the referenced binder with its own environment: the
            // binders inside the current branch are out of scope there.
            let mut inner = points.split_off(index + 1);
            let result = decode_at(target, points, r);
            points.append(&mut inner);
            result
        }
        Schema::Tag(_, inner) => decode_at(inner, points, r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(schema: &Schema, bytes: &[u8]) -> Result<Term> {
        let mut r = ByteReader::new(bytes);
        decode_term(schema, &mut r)
    }

    #[test]
    fn primitive_leaves() {
        assert_eq!(decode(&Schema::Bool, &[0x01]).unwrap(), Term::Bool(true));
        assert_eq!(decode(&Schema::U8, &[0x2A]).unwrap(), Term::U8(42));
        assert_eq!(
            decode(&Schema::I32, &[0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            Term::I32(-1)
        );
        assert_eq!(
            decode(&Schema::Text, &[0x02, b'h', b'i']).unwrap(),
            Term::Text("hi".to_owned())
        );
    }

    #[test]
    fn vector_of_u16_scenario() {
        // [1, 2, 3] under [U16]: 03 01 00 02 00 03 00
        let schema = Schema::vector(Schema::U16);
        let term = decode(&schema, &[0x03, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00]).unwrap();
        assert_eq!(
            term,
            Term::Vector(vec![Term::U16(1), Term::U16(2), Term::U16(3)])
        );
    }

    #[test]
    fn record_preserves_declared_order() {
        let schema = Schema::record([("y", Schema::I32), ("x", Schema::I32)]);
        let term = decode(&schema, &[0x02, 0, 0, 0, 0x01, 0, 0, 0]).unwrap();
        assert_eq!(
            term,
            Term::Record(vec![
                ("y".to_owned(), Term::I32(2)),
                ("x".to_owned(), Term::I32(1)),
            ])
        );
    }

    #[test]
    fn variant_names_come_from_schema() {
        let schema = Schema::variant([
            ("Nothing", Schema::product([])),
            ("Just", Schema::I32),
        ]);
        let none = decode(&schema, &[0x00]).unwrap();
        assert_eq!(
            none,
            Term::Variant {
                tag: 0,
                name: "Nothing".to_owned(),
                payload: Box::new(Term::Product(vec![])),
            }
        );

        let some = decode(&schema, &[0x01, 0x2A, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(
            some,
            Term::Variant {
                tag: 1,
                name: "Just".to_owned(),
                payload: Box::new(Term::I32(42)),
            }
        );
    }

    #[test]
    fn variant_tag_out_of_range() {
        let schema = Schema::variant([("A", Schema::product([]))]);
        let err = decode(&schema, &[0x05]).unwrap_err();
        assert_eq!(err, BrocadeError::InvalidTag { tag: 5, arity: 1 });
    }

    #[test]
    fn recursive_tree_scenario() {
        // fix <Leaf: () | Node: (I32, self.0, self.0)>
        let schema = Schema::fix(Schema::variant([
            ("Leaf", Schema::product([])),
            (
                "Node",
                Schema::product([Schema::I32, Schema::SelfRef(0), Schema::SelfRef(0)]),
            ),
        ]));
        // Node(1, Leaf, Leaf) = 01 01 00 00 00 00 00
        let term = decode(&schema, &[0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(term.to_string(), "Node (1, Leaf, Leaf)");
    }

    #[test]
    fn nested_fixpoints_resolve_by_depth() {
        // fix [ fix <Stop: () | More: (self.1, self.0)> ]
        // self.1 refers to the outer vector-of-inner schema.
        let inner = Schema::variant([
            ("Stop", Schema::product([])),
            (
                "More",
                Schema::product([Schema::SelfRef(1), Schema::SelfRef(0)]),
            ),
        ]);
        let schema = Schema::fix(Schema::vector(Schema::fix(inner)));
        // Outer vector with one element: More((empty vector), Stop)
        let bytes = [0x01, 0x01, 0x00, 0x00];
        let term = decode(&schema, &bytes).unwrap();
        assert_eq!(term.to_string(), "[More ([], Stop)]");
    }

    #[test]
    fn self_out_of_scope_is_malformed() {
        let err = decode(&Schema::SelfRef(0), &[]).unwrap_err();
        assert!(matches!(err, BrocadeError::MalformedSchema { .. }));
    }

    #[test]
    fn tag_is_transparent() {
        let schema = Schema::tagged(brocade_types::Tag::Int(9), Schema::U8);
        assert_eq!(decode(&schema, &[0x07]).unwrap(), Term::U8(7));
    }

    #[test]
    fn unknown_schema_ref_version_fails() {
        let err = decode(&Schema::SchemaRef(9), &[0x00]).unwrap_err();
        assert_eq!(err, BrocadeError::UnknownSchemaVersion { version: 9 });
    }

    #[test]
    fn truncated_input_reports_eof() {
        let schema = Schema::vector(Schema::U16);
        let err = decode(&schema, &[0x03, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, BrocadeError::UnexpectedEof { .. }));
    }
}
