//! Core data model for the brocade self-describing serialization system:
//! the schema language, the generic term model, the bootstrap
//! schema-of-schemas, and the wire-level integer/primitive codecs.

pub mod bootstrap;
pub mod encoding;
pub mod schema;
pub mod term;
pub mod varint;

pub use bootstrap::{bootstrap, tag_schema, CURRENT_VERSION};
pub use schema::{Schema, Tag};
pub use term::{datetime_to_timestamp, timestamp_to_datetime, Term};
