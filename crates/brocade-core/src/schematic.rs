//! The host-type binding: canonical schema, native encoder, native decoder,
//! and extractor for every supported type.
//!
//! The encoder is total and emits no per-field framing; byte layout is fully
//! determined by the canonical schema. The native decoder is the fast path
//! taken when a payload's schema equals the canonical one. The extractor is
//! the slow path that negotiates any other compatible schema.
//!
//! Schema generation goes through [`SchemaGen`], which detects type-level
//! recursion: when a type's schema is requested while that same type is
//! already being generated, the site becomes a `SelfRef` and the enclosing
//! occurrence is wrapped in `Fix`. Binder depths are assigned only after the
//! whole traversal, so mutual recursion and recursion through containers
//! resolve to consistent de Bruijn indices.
//!
//! Numeric extractors accept their own leaf and every strictly narrower
//! compatible leaf (widening); the reverse direction fails at plan time so
//! data is never silently truncated.

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;

use brocade_error::{BrocadeError, Result};
use brocade_types::{datetime_to_timestamp, encoding, timestamp_to_datetime, varint, Schema, Term};
use chrono::{DateTime, Utc};

use crate::extract::{Extractor, TermFn};
use crate::reader::ByteReader;

/// A type that can describe, emit, and reconstruct itself on the wire.
pub trait Schematic: Sized + 'static {
    /// Generate this type's schema structure.
    ///
    /// Child schemas must be requested through [`SchemaGen::of`] so that
    /// recursive types resolve to fixpoints instead of diverging.
    fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr;

    /// The canonical schema for this type.
    fn schema() -> Schema {
        SchemaGen::root::<Self>()
    }

    /// Append the wire encoding of `self` (no schema inside).
    fn encode(&self, out: &mut Vec<u8>);

    /// Decode a value whose payload schema is known to equal
    /// [`Schematic::schema`].
    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self>;

    /// The schema-negotiating decoder for this type.
    fn extractor() -> Extractor<Self>;
}

/// Schema generation context: the set of types whose schemas are currently
/// being built, used to turn type-level cycles into `Fix`/`SelfRef`.
#[derive(Default)]
pub struct SchemaGen {
    open: HashSet<TypeId>,
}

impl SchemaGen {
    /// The schema of `T`, with `Fix` introduced around any type that turns
    /// out to reference itself.
    pub fn of<T: Schematic>(&mut self) -> SchemaExpr {
        let id = TypeId::of::<T>();
        if self.open.contains(&id) {
            return SchemaExpr {
                refs: HashSet::from([id]),
                build: Box::new(move |binders| {
                    let depth = binders
                        .iter()
                        .position(|&open_id| open_id == id)
                        .expect("self-referenced type gained a binder");
                    Schema::SelfRef(u8::try_from(depth).expect("fixpoint nesting fits in u8"))
                }),
            };
        }

        self.open.insert(id);
        let mut expr = T::schema_gen(self);
        self.open.remove(&id);

        if expr.refs.remove(&id) {
            let body = expr.build;
            expr.build = Box::new(move |binders| {
                let mut inner = Vec::with_capacity(binders.len() + 1);
                inner.push(id);
                inner.extend_from_slice(binders);
                Schema::fix(body(&inner))
            });
        }
        expr
    }

    fn root<T: Schematic>() -> Schema {
        let mut ctx = Self::default();
        let expr = ctx.of::<T>();
        (expr.build)(&[])
    }
}

type SchemaThunk = Box<dyn FnOnce(&[TypeId]) -> Schema>;

/// A schema under construction: the set of in-progress types it referred
/// back to, and a builder that produces the final schema once the binder
/// stack (innermost first) is known.
pub struct SchemaExpr {
    refs: HashSet<TypeId>,
    build: SchemaThunk,
}

impl SchemaExpr {
    /// A closed schema with no recursive references.
    pub fn leaf(schema: Schema) -> Self {
        Self {
            refs: HashSet::new(),
            build: Box::new(move |_| schema),
        }
    }

    /// Wrap the built schema.
    #[must_use]
    pub fn map(self, f: impl FnOnce(Schema) -> Schema + 'static) -> Self {
        let body = self.build;
        Self {
            refs: self.refs,
            build: Box::new(move |binders| f(body(binders))),
        }
    }

    /// A positional product of sub-schemas.
    pub fn product(items: Vec<Self>) -> Self {
        let (refs, builds) = Self::split(items);
        Self {
            refs,
            build: Box::new(move |binders| {
                Schema::Product(builds.into_iter().map(|build| build(binders)).collect())
            }),
        }
    }

    /// A named record of sub-schemas.
    pub fn record(fields: Vec<(String, Self)>) -> Self {
        let (refs, builds) = Self::split_named(fields);
        Self {
            refs,
            build: Box::new(move |binders| {
                Schema::Record(
                    builds
                        .into_iter()
                        .map(|(name, build)| (name, build(binders)))
                        .collect(),
                )
            }),
        }
    }

    /// A named variant of sub-schemas.
    pub fn variant(ctors: Vec<(String, Self)>) -> Self {
        let (refs, builds) = Self::split_named(ctors);
        Self {
            refs,
            build: Box::new(move |binders| {
                Schema::Variant(
                    builds
                        .into_iter()
                        .map(|(name, build)| (name, build(binders)))
                        .collect(),
                )
            }),
        }
    }

    fn split(items: Vec<Self>) -> (HashSet<TypeId>, Vec<SchemaThunk>) {
        let mut refs = HashSet::new();
        let mut builds = Vec::with_capacity(items.len());
        for item in items {
            refs.extend(item.refs);
            builds.push(item.build);
        }
        (refs, builds)
    }

    fn split_named(items: Vec<(String, Self)>) -> (HashSet<TypeId>, Vec<(String, SchemaThunk)>) {
        let mut refs = HashSet::new();
        let mut builds = Vec::with_capacity(items.len());
        for (name, item) in items {
            refs.extend(item.refs);
            builds.push((name, item.build));
        }
        (refs, builds)
    }
}

/// An owned byte string, the host binding of the `Bytes` leaf.
///
/// Distinct from `Vec<u8>`, which encodes as a vector of `U8` elements; the
/// `Bytes` leaf is a single length-prefixed run. The extractor accepts
/// either shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    /// View the contents as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap into the inner vector.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Upper bound on speculative `Vec` pre-allocation from wire lengths.
const MAX_PREALLOC: usize = 1024;

#[allow(clippy::cast_possible_truncation)]
fn write_len(out: &mut Vec<u8>, len: usize) {
    varint::write_uvarint(out, len as u64);
}

/// Extractor accepting exactly one leaf schema.
fn exact_leaf<T: 'static>(
    expected: Schema,
    get: impl Fn(&Term) -> Result<T> + 'static,
) -> Extractor<T> {
    let get = Rc::new(get);
    Extractor::from_plan(move |schema, _env| {
        if *schema == expected {
            let get = get.clone();
            Ok(Rc::new(move |term: &Term| get(term)) as TermFn<T>)
        } else {
            Err(BrocadeError::mismatch(
                expected.to_string(),
                schema.to_string(),
            ))
        }
    })
}

/// Extractor over the integral widening ladder: `accepts` admits a schema
/// leaf, `convert` narrows the 128-bit intermediate into the target.
fn integral<T: 'static>(
    expected: &'static str,
    accepts: fn(&Schema) -> bool,
    convert: fn(i128) -> Option<T>,
) -> Extractor<T> {
    Extractor::from_plan(move |schema, _env| {
        if accepts(schema) {
            Ok(Rc::new(move |term: &Term| {
                let wide = term.integral_as_i128().ok_or_else(|| {
                    BrocadeError::corrupt(format!("expected an integral term, got {term}"))
                })?;
                convert(wide).ok_or_else(|| {
                    BrocadeError::corrupt(format!("integral term {wide} outside planned range"))
                })
            }) as TermFn<T>)
        } else {
            Err(BrocadeError::mismatch(expected, schema.to_string()))
        }
    })
}

impl Schematic for bool {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::Bool)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        r.boolean()
    }

    fn extractor() -> Extractor<Self> {
        exact_leaf(Schema::Bool, |term| {
            term.as_bool()
                .ok_or_else(|| BrocadeError::corrupt(format!("expected a Bool term, got {term}")))
        })
    }
}

impl Schematic for char {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::Char)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        varint::write_uvarint(out, u64::from(u32::from(*self)));
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        r.character()
    }

    fn extractor() -> Extractor<Self> {
        exact_leaf(Schema::Char, |term| match term {
            Term::Char(c) => Ok(*c),
            other => Err(BrocadeError::corrupt(format!(
                "expected a Char term, got {other}"
            ))),
        })
    }
}

impl Schematic for u8 {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::U8)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        r.byte()
    }

    fn extractor() -> Extractor<Self> {
        integral(
            "U8",
            |s| s.unsigned_bits().is_some_and(|n| n <= 8),
            |v| Self::try_from(v).ok(),
        )
    }
}

impl Schematic for i8 {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::I8)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        #[allow(clippy::cast_sign_loss)]
        out.push(*self as u8);
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        #[allow(clippy::cast_possible_wrap)]
        Ok(r.byte()? as Self)
    }

    fn extractor() -> Extractor<Self> {
        integral(
            "I8",
            |s| s.signed_bits().is_some_and(|n| n <= 8),
            |v| Self::try_from(v).ok(),
        )
    }
}

macro_rules! impl_unsigned {
    ($ty:ty, $leaf:ident, $bits:expr, $write:path, $read:ident) => {
        impl Schematic for $ty {
            fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
                SchemaExpr::leaf(Schema::$leaf)
            }

            fn encode(&self, out: &mut Vec<u8>) {
                $write(out, *self);
            }

            fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
                r.$read()
            }

            fn extractor() -> Extractor<Self> {
                integral(
                    concat!(stringify!($leaf), " or narrower unsigned"),
                    |s| s.unsigned_bits().is_some_and(|n| n <= $bits),
                    |v| <$ty>::try_from(v).ok(),
                )
            }
        }
    };
}

impl_unsigned!(u16, U16, 16, encoding::write_u16_le, u16_le);
impl_unsigned!(u32, U32, 32, encoding::write_u32_le, u32_le);
impl_unsigned!(u64, U64, 64, encoding::write_u64_le, u64_le);

macro_rules! impl_signed {
    ($ty:ty, $unsigned:ty, $leaf:ident, $bits:expr, $write:path, $read:ident) => {
        impl Schematic for $ty {
            fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
                SchemaExpr::leaf(Schema::$leaf)
            }

            fn encode(&self, out: &mut Vec<u8>) {
                #[allow(clippy::cast_sign_loss)]
                $write(out, *self as $unsigned);
            }

            fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
                #[allow(clippy::cast_possible_wrap)]
                Ok(r.$read()? as Self)
            }

            fn extractor() -> Extractor<Self> {
                integral(
                    concat!(stringify!($leaf), " or narrower"),
                    |s| {
                        s.signed_bits().is_some_and(|n| n <= $bits)
                            || s.unsigned_bits().is_some_and(|n| n < $bits)
                    },
                    |v| <$ty>::try_from(v).ok(),
                )
            }
        }
    };
}

impl_signed!(i16, u16, I16, 16, encoding::write_u16_le, u16_le);
impl_signed!(i32, u32, I32, 32, encoding::write_u32_le, u32_le);
impl_signed!(i64, u64, I64, 64, encoding::write_u64_le, u64_le);

impl Schematic for i128 {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::Integer)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        #[allow(clippy::cast_sign_loss)]
        varint::write_uvarint128(out, *self as u128);
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        #[allow(clippy::cast_possible_wrap)]
        Ok(r.uvarint128()? as Self)
    }

    fn extractor() -> Extractor<Self> {
        // The catch-all integral target: every integer leaf widens in.
        integral(
            "an integral schema",
            |s| {
                matches!(s, Schema::Integer)
                    || s.unsigned_bits().is_some()
                    || s.signed_bits().is_some()
            },
            Some,
        )
    }
}

impl Schematic for f32 {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::F32)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        encoding::write_f32_le(out, *self);
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        r.f32_le()
    }

    fn extractor() -> Extractor<Self> {
        exact_leaf(Schema::F32, |term| match term {
            Term::F32(x) => Ok(*x),
            other => Err(BrocadeError::corrupt(format!(
                "expected an F32 term, got {other}"
            ))),
        })
    }
}

impl Schematic for f64 {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::F64)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        encoding::write_f64_le(out, *self);
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        r.f64_le()
    }

    fn extractor() -> Extractor<Self> {
        Extractor::from_plan(|schema, _env| match schema {
            Schema::F32 | Schema::F64 => Ok(Rc::new(|term: &Term| {
                term.float_as_f64().ok_or_else(|| {
                    BrocadeError::corrupt(format!("expected a floating term, got {term}"))
                })
            }) as TermFn<Self>),
            other => Err(BrocadeError::mismatch(
                "F64 or narrower",
                other.to_string(),
            )),
        })
    }
}

impl Schematic for String {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::Text)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        out.extend_from_slice(self.as_bytes());
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        r.text()
    }

    fn extractor() -> Extractor<Self> {
        exact_leaf(Schema::Text, |term| {
            term.as_text().map(str::to_owned).ok_or_else(|| {
                BrocadeError::corrupt(format!("expected a Text term, got {term}"))
            })
        })
    }
}

impl Schematic for Blob {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::Bytes)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        write_len(out, self.0.len());
        out.extend_from_slice(&self.0);
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        r.byte_string().map(Blob)
    }

    fn extractor() -> Extractor<Self> {
        let bytes_leaf = exact_leaf(Schema::Bytes, |term| {
            term.as_bytes().map(Blob::from).ok_or_else(|| {
                BrocadeError::corrupt(format!("expected a Bytes term, got {term}"))
            })
        });
        // A producer may have written its bytes as a plain vector of U8.
        bytes_leaf.or(Vec::<u8>::extractor().map(Blob))
    }
}

impl Schematic for DateTime<Utc> {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::Timestamp)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        encoding::write_f64_le(out, datetime_to_timestamp(self));
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        let seconds = r.f64_le()?;
        timestamp_to_datetime(seconds).ok_or(BrocadeError::InvalidTimestamp {
            bits: seconds.to_bits(),
        })
    }

    fn extractor() -> Extractor<Self> {
        exact_leaf(Schema::Timestamp, |term| match term {
            Term::Timestamp(seconds) => {
                timestamp_to_datetime(*seconds).ok_or(BrocadeError::InvalidTimestamp {
                    bits: seconds.to_bits(),
                })
            }
            other => Err(BrocadeError::corrupt(format!(
                "expected a Timestamp term, got {other}"
            ))),
        })
    }
}

impl Schematic for () {
    fn schema_gen(_ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::leaf(Schema::product([]))
    }

    fn encode(&self, _out: &mut Vec<u8>) {}

    fn decode_native(_r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(())
    }

    fn extractor() -> Extractor<Self> {
        Extractor::from_plan(|schema, _env| match schema {
            Schema::Product(fields) if fields.is_empty() => {
                Ok(Rc::new(|term: &Term| match term {
                    Term::Product(items) if items.is_empty() => Ok(()),
                    other => Err(BrocadeError::corrupt(format!(
                        "expected an empty product term, got {other}"
                    ))),
                }) as TermFn<Self>)
            }
            other => Err(BrocadeError::mismatch(
                "an empty product",
                other.to_string(),
            )),
        })
    }
}

impl<T: Schematic> Schematic for Box<T> {
    fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr {
        ctx.of::<T>()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        (**self).encode(out);
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        T::decode_native(r).map(Box::new)
    }

    fn extractor() -> Extractor<Self> {
        T::extractor().map(Box::new)
    }
}

impl<T: Schematic> Schematic for Option<T> {
    fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::variant(vec![
            ("None".to_owned(), SchemaExpr::leaf(Schema::product([]))),
            ("Some".to_owned(), ctx.of::<T>()),
        ])
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            None => varint::write_uvarint(out, 0),
            Some(value) => {
                varint::write_uvarint(out, 1);
                value.encode(out);
            }
        }
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        match r.uvarint()? {
            0 => Ok(None),
            1 => T::decode_native(r).map(Some),
            tag => Err(BrocadeError::InvalidTag { tag, arity: 2 }),
        }
    }

    fn extractor() -> Extractor<Self> {
        // Any two-constructor variant, dispatched by index: 0 is none, 1 is
        // some. Constructor names are not consulted, so a producer's
        // "Nothing"/"Just" pair works as well as "None"/"Some".
        Extractor::from_plan(|schema, env| match schema {
            Schema::Variant(ctors) if ctors.len() == 2 => {
                let some = T::extractor()
                    .plan(&ctors[1].1, env)
                    .map_err(|err| err.with_subject("the some-constructor payload"))?;
                Ok(Rc::new(move |term: &Term| match term {
                    Term::Variant { tag: 0, .. } => Ok(None),
                    Term::Variant {
                        tag: 1, payload, ..
                    } => some(payload).map(Some),
                    other => Err(BrocadeError::corrupt(format!(
                        "expected a two-constructor variant term, got {other}"
                    ))),
                }) as TermFn<Self>)
            }
            other => Err(BrocadeError::mismatch(
                "a two-constructor variant",
                other.to_string(),
            )),
        })
    }
}

impl<A: Schematic, B: Schematic> Schematic for std::result::Result<A, B> {
    fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr {
        SchemaExpr::variant(vec![
            ("Err".to_owned(), ctx.of::<A>()),
            ("Ok".to_owned(), ctx.of::<B>()),
        ])
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Err(err) => {
                varint::write_uvarint(out, 0);
                err.encode(out);
            }
            Ok(ok) => {
                varint::write_uvarint(out, 1);
                ok.encode(out);
            }
        }
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        match r.uvarint()? {
            0 => A::decode_native(r).map(Err),
            1 => B::decode_native(r).map(Ok),
            tag => Err(BrocadeError::InvalidTag { tag, arity: 2 }),
        }
    }

    fn extractor() -> Extractor<Self> {
        Extractor::from_plan(|schema, env| match schema {
            Schema::Variant(ctors) if ctors.len() == 2 => {
                let left = A::extractor()
                    .plan(&ctors[0].1, env)
                    .map_err(|err| err.with_subject("the first constructor payload"))?;
                let right = B::extractor()
                    .plan(&ctors[1].1, env)
                    .map_err(|err| err.with_subject("the second constructor payload"))?;
                Ok(Rc::new(move |term: &Term| match term {
                    Term::Variant {
                        tag: 0, payload, ..
                    } => left(payload).map(Err),
                    Term::Variant {
                        tag: 1, payload, ..
                    } => right(payload).map(Ok),
                    other => Err(BrocadeError::corrupt(format!(
                        "expected a two-constructor variant term, got {other}"
                    ))),
                }) as TermFn<Self>)
            }
            other => Err(BrocadeError::mismatch(
                "a two-constructor variant",
                other.to_string(),
            )),
        })
    }
}

impl<T: Schematic> Schematic for Vec<T> {
    fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr {
        ctx.of::<T>().map(Schema::vector)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        for item in self {
            item.encode(out);
        }
    }

    fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
        let len = r.length_prefix()?;
        let mut items = Self::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            items.push(T::decode_native(r)?);
        }
        Ok(items)
    }

    fn extractor() -> Extractor<Self> {
        Extractor::from_plan(|schema, env| match schema {
            Schema::Vector(element) => {
                let item = T::extractor().plan(element, env)?;
                Ok(Rc::new(move |term: &Term| match term {
                    Term::Vector(items) => items.iter().map(|t| item(t)).collect(),
                    other => Err(BrocadeError::corrupt(format!(
                        "expected a vector term, got {other}"
                    ))),
                }) as TermFn<Self>)
            }
            other => Err(BrocadeError::mismatch("a vector", other.to_string())),
        })
    }
}

macro_rules! impl_via_vec {
    ($ty:ty, $item:ty, [$($bound:tt)*]) => {
        impl<$($bound)*> Schematic for $ty {
            fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr {
                ctx.of::<Vec<$item>>()
            }

            fn encode(&self, out: &mut Vec<u8>) {
                write_len(out, self.len());
                for item in self {
                    Schematic::encode(item, out);
                }
            }

            fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
                <Vec<$item>>::decode_native(r).map(Self::from_iter)
            }

            fn extractor() -> Extractor<Self> {
                <Vec<$item>>::extractor().map(Self::from_iter)
            }
        }
    };
}

impl_via_vec!(VecDeque<T>, T, [T: Schematic]);
impl_via_vec!(BTreeSet<T>, T, [T: Schematic + Ord]);
impl_via_vec!(HashSet<T>, T, [T: Schematic + Eq + Hash]);

macro_rules! impl_map_via_vec {
    ($ty:ty, [$($bound:tt)*]) => {
        impl<$($bound)*> Schematic for $ty {
            fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr {
                ctx.of::<Vec<(K, V)>>()
            }

            fn encode(&self, out: &mut Vec<u8>) {
                write_len(out, self.len());
                for (key, value) in self {
                    key.encode(out);
                    value.encode(out);
                }
            }

            fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
                <Vec<(K, V)>>::decode_native(r).map(Self::from_iter)
            }

            fn extractor() -> Extractor<Self> {
                <Vec<(K, V)>>::extractor().map(Self::from_iter)
            }
        }
    };
}

impl_map_via_vec!(BTreeMap<K, V>, [K: Schematic + Ord, V: Schematic]);
impl_map_via_vec!(HashMap<K, V>, [K: Schematic + Eq + Hash, V: Schematic]);

macro_rules! impl_tuple {
    ($len:expr => $(($T:ident, $f:ident, $idx:tt)),+) => {
        impl<$($T: Schematic),+> Schematic for ($($T,)+) {
            fn schema_gen(ctx: &mut SchemaGen) -> SchemaExpr {
                SchemaExpr::product(vec![$(ctx.of::<$T>()),+])
            }

            fn encode(&self, out: &mut Vec<u8>) {
                $( self.$idx.encode(out); )+
            }

            fn decode_native(r: &mut ByteReader<'_>) -> Result<Self> {
                Ok(($($T::decode_native(r)?,)+))
            }

            fn extractor() -> Extractor<Self> {
                Extractor::from_plan(|schema, env| {
                    let fields = match schema {
                        Schema::Product(fields) if fields.len() == $len => fields,
                        other => {
                            return Err(BrocadeError::mismatch(
                                format!("a product of arity {}", $len),
                                other.to_string(),
                            ));
                        }
                    };
                    let mut field_iter = fields.iter();
                    $(
                        let $f = $T::extractor()
                            .plan(field_iter.next().expect("arity checked"), env)?;
                    )+
                    Ok(Rc::new(move |term: &Term| match term {
                        Term::Product(items) if items.len() == $len => {
                            let mut item_iter = items.iter();
                            Ok(($( $f(item_iter.next().expect("arity checked"))?, )+))
                        }
                        other => Err(BrocadeError::corrupt(format!(
                            "expected a product term of arity {}, got {other}",
                            $len
                        ))),
                    }) as TermFn<Self>)
                })
            }
        }
    };
}

impl_tuple!(1 => (A, fa, 0));
impl_tuple!(2 => (A, fa, 0), (B, fb, 1));
impl_tuple!(3 => (A, fa, 0), (B, fb, 1), (C, fc, 2));
impl_tuple!(4 => (A, fa, 0), (B, fb, 1), (C, fc, 2), (D, fd, 3));
