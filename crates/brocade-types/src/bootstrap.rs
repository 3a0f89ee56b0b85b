//! The bootstrap schema: a schema describing `Schema` itself.
//!
//! Every payload starts with a one-byte schema-language version; the schema
//! prefix that follows is encoded under the bootstrap schema for that
//! version. This is what lets the schema language itself evolve: a reader
//! that recognizes the version byte can decode the schema, then the value.
//!
//! Version 3 is the current layout. The constructor order below is the wire
//! tag order and must never be rearranged within a version.

use std::sync::LazyLock;

use crate::schema::Schema;

/// The schema-language version written by encoders.
pub const CURRENT_VERSION: u8 = 3;

static BOOTSTRAP_V3: LazyLock<Schema> = LazyLock::new(build_v3);

/// The schema-of-schemas for a recognized `version`, or `None`.
pub fn bootstrap(version: u8) -> Option<&'static Schema> {
    match version {
        CURRENT_VERSION => Some(&BOOTSTRAP_V3),
        _ => None,
    }
}

/// The schema of [`crate::schema::Tag`]: a fixpoint over the
/// int / str / list sum.
pub fn tag_schema() -> Schema {
    Schema::fix(Schema::variant([
        ("TagInt", Schema::Integer),
        ("TagStr", Schema::Text),
        ("TagList", Schema::vector(Schema::SelfRef(0))),
    ]))
}

fn build_v3() -> Schema {
    // (Text, Self 0) pairs carry record fields and variant constructors.
    let named_entry = || Schema::product([Schema::Text, Schema::SelfRef(0)]);

    Schema::fix(Schema::variant([
        ("SFix", Schema::product([Schema::SelfRef(0)])),
        ("SSelf", Schema::product([Schema::U8])),
        ("SVector", Schema::product([Schema::SelfRef(0)])),
        (
            "SProduct",
            Schema::product([Schema::vector(Schema::SelfRef(0))]),
        ),
        ("SRecord", Schema::product([Schema::vector(named_entry())])),
        ("SVariant", Schema::product([Schema::vector(named_entry())])),
        ("SSchema", Schema::product([Schema::U8])),
        ("SBool", Schema::product([])),
        ("SChar", Schema::product([])),
        ("SW8", Schema::product([])),
        ("SW16", Schema::product([])),
        ("SW32", Schema::product([])),
        ("SW64", Schema::product([])),
        ("SI8", Schema::product([])),
        ("SI16", Schema::product([])),
        ("SI32", Schema::product([])),
        ("SI64", Schema::product([])),
        ("SInteger", Schema::product([])),
        ("SFloat", Schema::product([])),
        ("SDouble", Schema::product([])),
        ("SBytes", Schema::product([])),
        ("SText", Schema::product([])),
        ("SUTCTime", Schema::product([])),
        (
            "STag",
            Schema::product([tag_schema(), Schema::SelfRef(0)]),
        ),
    ]))
}
