//! Codec, planner, and framing for the brocade self-describing
//! serialization system.
//!
//! The pieces, bottom up: [`reader`] is the checked byte cursor, [`decode`]
//! turns schema + bytes into a generic [`Term`], [`schematic`] binds host
//! types to schemas and wire forms, [`extract`] plans schema-negotiating
//! decoders, and [`frame`] wraps it all in the version-byte envelope. The
//! [`schematic_record!`] and [`schematic_variant!`] macros derive the whole
//! binding for user structs and enums.

pub mod decode;
pub mod extract;
pub mod frame;
mod macros;
pub mod reader;
pub mod schema_codec;
pub mod schematic;

pub use decode::decode_term;
pub use extract::{extract_constructor, extract_field, pair, Extractor, PlanEnv};
pub use frame::{from_bytes, schema_from_bytes, term_from_bytes, to_bytes};
pub use reader::ByteReader;
pub use schematic::{Blob, SchemaExpr, SchemaGen, Schematic};

// Re-exported so macro expansions resolve everything through `$crate`.
pub use brocade_error::{BrocadeError, Result};
pub use brocade_types::{varint, Schema, Term};
