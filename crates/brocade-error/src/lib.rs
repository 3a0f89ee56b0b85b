use thiserror::Error;

/// Primary error type for brocade encode/decode/plan operations.
///
/// Errors fall into two categories with different lifecycles:
///
/// - **Plan-time errors** are structural: a schema encountered in a payload
///   cannot be reconciled with the requested target type. They are produced
///   before any value bytes are touched.
/// - **Decode-time errors** are data-level: truncated input, invalid UTF-8,
///   an out-of-range constructor tag.
///
/// Use [`BrocadeError::is_plan_error`] / [`BrocadeError::is_data_error`] to
/// distinguish them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrocadeError {
    // === Envelope errors ===
    /// The input buffer was empty (no version byte).
    #[error("empty input")]
    EmptyInput,

    /// The payload's schema-language version byte is not recognized.
    #[error("unknown schema version: {version}")]
    UnknownSchemaVersion { version: u8 },

    // === Plan-time errors ===
    /// A sub-schema in the payload cannot be consumed by the target type.
    ///
    /// `subject` is a human-readable path into the target type, e.g.
    /// ``field `email`"``. Empty when the mismatch is at the root.
    #[error("schema mismatch{}: expected {expected}, got {got}", fmt_subject(.subject))]
    SchemaMismatch {
        subject: String,
        expected: String,
        got: String,
    },

    /// A target record field is absent from the payload schema and has no
    /// default.
    #[error("missing field `{field}`")]
    MissingField { field: String },

    /// The payload variant declares a constructor the target does not know.
    #[error("unmatched constructor `{name}`")]
    UnmatchedConstructor { name: String },

    /// Recursion in the payload schema does not line up with recursion in
    /// the target type (type-erased fixpoint slot downcast failed).
    #[error("recursive schema does not match target type recursion (Self {depth})")]
    TypeRecursionMismatch { depth: u8 },

    /// The schema itself is ill-formed: a `Self` reference without enough
    /// enclosing `Fix` binders, or duplicate names in a record or variant.
    #[error("malformed schema: {detail}")]
    MalformedSchema { detail: String },

    // === Decode-time errors ===
    /// A variant tag in the byte stream is out of range for its schema.
    #[error("invalid variant tag {tag} (arity {arity})")]
    InvalidTag { tag: u64, arity: usize },

    /// The byte stream ended before the schema was fully consumed.
    #[error("unexpected end of input: needed {needed} more byte(s)")]
    UnexpectedEof { needed: usize },

    /// A `Text` payload was not valid UTF-8.
    #[error("invalid UTF-8 in text payload")]
    InvalidUtf8,

    /// A `Char` payload was not a Unicode scalar value.
    #[error("invalid char code point {code:#x}")]
    InvalidChar { code: u64 },

    /// A timestamp payload was not a finite, in-range seconds value.
    #[error("invalid timestamp (bits {bits:#018x})")]
    InvalidTimestamp { bits: u64 },

    /// A term handed to a planned extractor did not match the schema the
    /// plan was made for. This indicates a bug in the producer of the term,
    /// not in the payload.
    #[error("corrupt term: {detail}")]
    CorruptTerm { detail: String },
}

fn fmt_subject(subject: &str) -> String {
    if subject.is_empty() {
        String::new()
    } else {
        format!(" at {subject}")
    }
}

impl BrocadeError {
    /// Create a schema mismatch with no subject path.
    ///
    /// `expected` and `got` are pre-rendered schema descriptions.
    pub fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            subject: String::new(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a malformed-schema error.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedSchema {
            detail: detail.into(),
        }
    }

    /// Attach a subject path to a mismatch that does not already carry one.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_subject(self, subject: &str) -> Self {
        match self {
            Self::SchemaMismatch {
                subject: old,
                expected,
                got,
            } if old.is_empty() => Self::SchemaMismatch {
                subject: subject.to_owned(),
                expected,
                got,
            },
            other => other,
        }
    }

    /// Whether this error was produced while reconciling schemas, before any
    /// value bytes were decoded.
    pub const fn is_plan_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. }
                | Self::MissingField { .. }
                | Self::UnmatchedConstructor { .. }
                | Self::TypeRecursionMismatch { .. }
                | Self::MalformedSchema { .. }
        )
    }

    /// Create a corrupt-term error.
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::CorruptTerm {
            detail: detail.into(),
        }
    }

    /// Whether this error was produced by the byte stream itself.
    pub const fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::UnknownSchemaVersion { .. }
                | Self::InvalidTag { .. }
                | Self::UnexpectedEof { .. }
                | Self::InvalidUtf8
                | Self::InvalidChar { .. }
                | Self::InvalidTimestamp { .. }
                | Self::CorruptTerm { .. }
        )
    }
}

/// Result type alias using `BrocadeError`.
pub type Result<T> = std::result::Result<T, BrocadeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mismatch_without_subject() {
        let err = BrocadeError::mismatch("I32", "Text");
        assert_eq!(err.to_string(), "schema mismatch: expected I32, got Text");
    }

    #[test]
    fn display_mismatch_with_subject() {
        let err = BrocadeError::mismatch("I32", "Text").with_subject("field `age`");
        assert_eq!(
            err.to_string(),
            "schema mismatch at field `age`: expected I32, got Text"
        );
    }

    #[test]
    fn with_subject_does_not_overwrite() {
        let err = BrocadeError::mismatch("I32", "Text")
            .with_subject("field `a`")
            .with_subject("field `b`");
        assert!(err.to_string().contains("field `a`"));
    }

    #[test]
    fn with_subject_leaves_other_variants_alone() {
        let err = BrocadeError::InvalidUtf8.with_subject("field `a`");
        assert_eq!(err, BrocadeError::InvalidUtf8);
    }

    #[test]
    fn display_missing_field() {
        let err = BrocadeError::missing_field("email");
        assert_eq!(err.to_string(), "missing field `email`");
    }

    #[test]
    fn display_invalid_tag() {
        let err = BrocadeError::InvalidTag { tag: 7, arity: 2 };
        assert_eq!(err.to_string(), "invalid variant tag 7 (arity 2)");
    }

    #[test]
    fn display_unknown_version() {
        let err = BrocadeError::UnknownSchemaVersion { version: 9 };
        assert_eq!(err.to_string(), "unknown schema version: 9");
    }

    #[test]
    fn classification_is_exhaustive_and_disjoint() {
        let plan = [
            BrocadeError::mismatch("a", "b"),
            BrocadeError::missing_field("f"),
            BrocadeError::UnmatchedConstructor {
                name: "Gone".to_owned(),
            },
            BrocadeError::TypeRecursionMismatch { depth: 0 },
            BrocadeError::malformed("Self 2 out of scope"),
        ];
        let data = [
            BrocadeError::EmptyInput,
            BrocadeError::UnknownSchemaVersion { version: 0 },
            BrocadeError::InvalidTag { tag: 1, arity: 1 },
            BrocadeError::UnexpectedEof { needed: 4 },
            BrocadeError::InvalidUtf8,
            BrocadeError::InvalidChar { code: 0xD800 },
            BrocadeError::InvalidTimestamp { bits: 0 },
            BrocadeError::corrupt("variant tag 3 in a 2-arm plan"),
        ];
        for err in &plan {
            assert!(err.is_plan_error(), "{err}");
            assert!(!err.is_data_error(), "{err}");
        }
        for err in &data {
            assert!(err.is_data_error(), "{err}");
            assert!(!err.is_plan_error(), "{err}");
        }
    }
}
