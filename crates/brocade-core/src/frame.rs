//! The payload envelope: version byte, schema prefix, value bytes.
//!
//! `to_bytes` writes `[CURRENT_VERSION] ++ encode(bootstrap, schema(T)) ++
//! encode(schema(T), value)`. `from_bytes` reads the version, decodes the
//! schema under the bootstrap schema for that version, then takes the fast
//! native path when the decoded schema equals the target's canonical schema
//! and the plan-and-extract path otherwise. Trailing bytes after the value
//! are not an error; the caller owns the buffer boundary.

use brocade_error::{BrocadeError, Result};
use brocade_types::{bootstrap, Schema, Term, CURRENT_VERSION};
use tracing::debug;

use crate::decode::decode_term;
use crate::extract::PlanEnv;
use crate::reader::ByteReader;
use crate::schematic::Schematic;

/// Serialize a value with its self-describing envelope.
pub fn to_bytes<T: Schematic>(value: &T) -> Vec<u8> {
    let mut out = vec![CURRENT_VERSION];
    T::schema().encode(&mut out);
    value.encode(&mut out);
    out
}

/// Deserialize a value from a self-describing payload.
///
/// The payload's schema does not need to equal `T`'s canonical schema;
/// anything `T`'s extractor can negotiate (reordered record fields, missing
/// defaulted fields, a constructor subset, numeric widening) decodes too.
pub fn from_bytes<T: Schematic>(bytes: &[u8]) -> Result<T> {
    let (version, mut r) = split_version(bytes)?;
    let schema = read_schema(version, &mut r)?;
    schema.validate()?;

    if schema == T::schema() {
        debug!(version, "schema matches, native decode");
        T::decode_native(&mut r)
    } else {
        debug!(version, schema = %schema, "schema differs, planning extractor");
        let mut env = PlanEnv::new();
        let run = T::extractor().plan(&schema, &mut env)?;
        let term = decode_term(&schema, &mut r)?;
        run(&term)
    }
}

/// Read only the schema prefix of a payload.
pub fn schema_from_bytes(bytes: &[u8]) -> Result<Schema> {
    let (version, mut r) = split_version(bytes)?;
    let schema = read_schema(version, &mut r)?;
    schema.validate()?;
    Ok(schema)
}

/// Decode a payload into its schema and a generic term, with no target type.
///
/// This is the inspection surface: the result can be pretty-printed or
/// projected to JSON without any knowledge of the producer's types.
pub fn term_from_bytes(bytes: &[u8]) -> Result<(Schema, Term)> {
    let (version, mut r) = split_version(bytes)?;
    let schema = read_schema(version, &mut r)?;
    schema.validate()?;
    let term = decode_term(&schema, &mut r)?;
    Ok((schema, term))
}

fn split_version(bytes: &[u8]) -> Result<(u8, ByteReader<'_>)> {
    let (version, rest) = bytes.split_first().ok_or(BrocadeError::EmptyInput)?;
    Ok((*version, ByteReader::new(rest)))
}

fn read_schema(version: u8, r: &mut ByteReader<'_>) -> Result<Schema> {
    if version == CURRENT_VERSION {
        return Schema::decode_native(r);
    }
    // A payload from a different (but recognized) schema-language version:
    // negotiate the schema itself through the planner.
    let described_by = bootstrap(version).ok_or(BrocadeError::UnknownSchemaVersion { version })?;
    let mut env = PlanEnv::new();
    let run = Schema::extractor().plan(described_by, &mut env)?;
    let term = decode_term(described_by, r)?;
    run(&term)
}
