//! Self-describing binary serialization with schema negotiation.
//!
//! Every payload carries a one-byte schema-language version and an encoding
//! of its own schema ahead of the value bytes. A reader can decode without
//! the producer's type definitions, inspect payloads as generic terms, and
//! reconcile structural drift: reordered record fields, missing fields with
//! defaults, producer variants with a constructor subset, and numeric
//! widening.
//!
//! ```
//! use brocade::{from_bytes, schematic_record, to_bytes};
//!
//! schematic_record! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct User {
//!         pub name: String,
//!         pub age: u32 = 0,
//!     }
//! }
//!
//! let user = User { name: "ada".to_owned(), age: 36 };
//! let bytes = to_bytes(&user);
//! assert_eq!(from_bytes::<User>(&bytes).unwrap(), user);
//! ```

pub use brocade_core::{
    decode_term, extract, extract_constructor, extract_field, from_bytes, pair, schema_from_bytes,
    schematic_record, schematic_variant, term_from_bytes, to_bytes, Blob, ByteReader, Extractor,
    PlanEnv, SchemaExpr, SchemaGen, Schematic,
};
pub use brocade_error::{BrocadeError, Result};
pub use brocade_types::{
    bootstrap, tag_schema, varint, Schema, Tag, Term, CURRENT_VERSION,
};
