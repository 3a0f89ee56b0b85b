//! The planner: two-phase conversion from encountered schemas to typed
//! values.
//!
//! An [`Extractor<T>`] is planned against the schema found in a payload.
//! Planning either produces a term function `Fn(&Term) -> Result<T>` or
//! fails with a structural error; once a plan exists, running it over terms
//! never re-dispatches. This split is what makes schema negotiation cheap:
//! all name lookup, field reordering, and constructor matching happens once
//! per payload, not once per value.
//!
//! Recursive schemas tie the knot through a stack of type-erased placeholder
//! slots, one per enclosing `Fix`. A `SelfRef` site downcasts the slot at
//! its depth back to the concrete term-function type; the slot is filled in
//! when the binder's plan completes. The downcast is checked at plan time,
//! so a schema whose recursion does not line up with the target type's
//! recursion fails the plan instead of corrupting a decode.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use brocade_error::{BrocadeError, Result};
use brocade_types::{bootstrap, Schema, Term};
use tracing::trace;

use crate::schematic::Schematic;

/// A planned conversion from terms to `T`.
pub type TermFn<T> = Rc<dyn Fn(&Term) -> Result<T>>;

/// Stack of type-erased fixpoint slots, one per enclosing `Fix` binder of
/// the schema being planned. Index 0 is the outermost binder.
#[derive(Default)]
pub struct PlanEnv {
    slots: Vec<Rc<dyn Any>>,
}

impl PlanEnv {
    /// An empty environment, for planning at the top of a schema.
    pub fn new() -> Self {
        Self::default()
    }
}

type Slot<T> = RefCell<Option<TermFn<T>>>;
type RawPlan<T> = dyn Fn(&Schema, &mut PlanEnv) -> Result<TermFn<T>>;

/// A two-phase schema-negotiating decoder for `T`.
pub struct Extractor<T> {
    plan_fn: Rc<RawPlan<T>>,
}

impl<T> Clone for Extractor<T> {
    fn clone(&self) -> Self {
        Self {
            plan_fn: self.plan_fn.clone(),
        }
    }
}

impl<T: 'static> Extractor<T> {
    /// Build an extractor from a raw planning function.
    ///
    /// The raw function never sees `Tag`, `SchemaRef`, `Fix`, or `SelfRef`
    /// nodes: those are handled uniformly before it is consulted. `Fix`
    /// binds a placeholder slot typed for `T`, which is why combinators like
    /// [`Extractor::map`] delegate planning to their inner extractor instead
    /// of wrapping `from_plan` again.
    pub fn from_plan(
        raw: impl Fn(&Schema, &mut PlanEnv) -> Result<TermFn<T>> + 'static,
    ) -> Self {
        let raw: Rc<RawPlan<T>> = Rc::new(raw);
        Self {
            plan_fn: Rc::new(move |schema, env| dispatch(&raw, schema, env)),
        }
    }

    fn from_plan_fn(
        plan_fn: impl Fn(&Schema, &mut PlanEnv) -> Result<TermFn<T>> + 'static,
    ) -> Self {
        Self {
            plan_fn: Rc::new(plan_fn),
        }
    }

    /// Plan this extractor against an encountered schema.
    pub fn plan(&self, schema: &Schema, env: &mut PlanEnv) -> Result<TermFn<T>> {
        (self.plan_fn)(schema, env)
    }

    /// Covariant composition: convert the extracted value.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Extractor<U> {
        let f = Rc::new(f);
        Extractor::from_plan_fn(move |schema, env| {
            let inner = self.plan(schema, env)?;
            let f = f.clone();
            let g: TermFn<U> = Rc::new(move |term| inner(term).map(|value| f(value)));
            Ok(g)
        })
    }

    /// Plan-time alternative: try `self`, and on a *plan* failure try
    /// `other`. Data-level errors are not recovered.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::from_plan_fn(move |schema, env| match self.plan(schema, env) {
            Ok(f) => Ok(f),
            Err(err) if err.is_plan_error() => other.plan(schema, env),
            Err(err) => Err(err),
        })
    }
}

/// Applicative composition: plan both extractors against the same schema
/// and pair the results.
pub fn pair<A: 'static, B: 'static>(a: Extractor<A>, b: Extractor<B>) -> Extractor<(A, B)> {
    Extractor::from_plan_fn(move |schema, env| {
        let fa = a.plan(schema, env)?;
        let fb = b.plan(schema, env)?;
        let g: TermFn<(A, B)> = Rc::new(move |term| Ok((fa(term)?, fb(term)?)));
        Ok(g)
    })
}

fn dispatch<T: 'static>(
    raw: &Rc<RawPlan<T>>,
    schema: &Schema,
    env: &mut PlanEnv,
) -> Result<TermFn<T>> {
    match schema {
        Schema::Tag(_, inner) => dispatch(raw, inner, env),
        Schema::SchemaRef(version) => {
            let resolved = bootstrap(*version).ok_or(BrocadeError::UnknownSchemaVersion {
                version: *version,
            })?;
            dispatch(raw, resolved, env)
        }
        Schema::Fix(body) => {
            let slot: Rc<Slot<T>> = Rc::new(RefCell::new(None));
            env.slots.push(slot.clone());
            let planned = dispatch(raw, body, env);
            env.slots.pop();
            let f = planned?;
            *slot.borrow_mut() = Some(f.clone());
            Ok(f)
        }
        Schema::SelfRef(depth) => {
            let index = env
                .slots
                .len()
                .checked_sub(usize::from(*depth) + 1)
                .ok_or_else(|| {
                    BrocadeError::malformed(format!(
                        "self reference {depth} under only {} fixpoint binder(s)",
                        env.slots.len()
                    ))
                })?;
            let slot = env.slots[index]
                .clone()
                .downcast::<Slot<T>>()
                .map_err(|_| BrocadeError::TypeRecursionMismatch { depth: *depth })?;
            let g: TermFn<T> = Rc::new(move |term| {
                let f = slot
                    .borrow()
                    .clone()
                    .expect("fixpoint slot resolved after planning");
                f(term)
            });
            Ok(g)
        }
        other => raw(other, env),
    }
}

/// Require a record schema, yielding its field list.
pub fn expect_record(schema: &Schema) -> Result<&[(String, Schema)]> {
    match schema {
        Schema::Record(fields) => Ok(fields),
        other => Err(BrocadeError::mismatch("a record", other.to_string())),
    }
}

/// Plan the extraction of one named field out of an incoming record.
///
/// The returned term function positions into `Term::Record` by the field's
/// index in the *incoming* schema, so producer field order is irrelevant.
/// A missing field is [`BrocadeError::MissingField`].
pub fn plan_field<A: Schematic>(
    fields: &[(String, Schema)],
    name: &str,
    env: &mut PlanEnv,
) -> Result<TermFn<A>> {
    plan_field_inner(fields, name, env, None)
}

/// Like [`plan_field`], but a missing field falls back to `make_default`.
pub fn plan_field_or<A: Schematic>(
    fields: &[(String, Schema)],
    name: &str,
    env: &mut PlanEnv,
    make_default: impl Fn() -> A + 'static,
) -> Result<TermFn<A>> {
    plan_field_inner(fields, name, env, Some(Rc::new(make_default)))
}

#[allow(clippy::type_complexity)]
fn plan_field_inner<A: Schematic>(
    fields: &[(String, Schema)],
    name: &str,
    env: &mut PlanEnv,
    default: Option<Rc<dyn Fn() -> A>>,
) -> Result<TermFn<A>> {
    let found = fields
        .iter()
        .position(|(field_name, _)| field_name == name);
    match found {
        Some(index) => {
            trace!(field = name, index, "field resolved");
            let inner = A::extractor()
                .plan(&fields[index].1, env)
                .map_err(|err| err.with_subject(&format!("field `{name}`")))?;
            let field = name.to_owned();
            Ok(Rc::new(move |term| match term {
                Term::Record(items) => {
                    let (_, value) = items.get(index).ok_or_else(|| {
                        BrocadeError::corrupt(format!(
                            "record term has no index {index} for field `{field}`"
                        ))
                    })?;
                    inner(value)
                }
                other => Err(BrocadeError::corrupt(format!(
                    "expected a record term for field `{field}`, got {other}"
                ))),
            }))
        }
        None => {
            trace!(field = name, "field absent, using default");
            let make_default =
                default.ok_or_else(|| BrocadeError::missing_field(name.to_owned()))?;
            Ok(Rc::new(move |_| Ok(make_default())))
        }
    }
}

/// A single-field extractor for hand-built backward compatibility: pull one
/// named field out of whatever record arrives.
pub fn extract_field<A: Schematic>(name: impl Into<String>) -> Extractor<A> {
    let name = name.into();
    Extractor::from_plan(move |schema, env| {
        let fields = expect_record(schema)?;
        plan_field::<A>(fields, &name, env)
    })
}

/// Builder for variant extractors: one arm per target constructor, each arm
/// extracting the whole target value from that constructor's payload.
pub struct VariantBuilder<T> {
    arms: Vec<(String, Extractor<T>)>,
}

impl<T: 'static> VariantBuilder<T> {
    pub fn new() -> Self {
        Self { arms: Vec::new() }
    }

    /// Add an arm for the named constructor.
    #[must_use]
    pub fn arm(mut self, name: impl Into<String>, extractor: Extractor<T>) -> Self {
        self.arms.push((name.into(), extractor));
        self
    }

    /// Finish the builder.
    ///
    /// Planning walks the *incoming* constructor list: every incoming
    /// constructor must name a known arm (an unknown one fails the plan);
    /// arms with no incoming counterpart are legal and simply never fire.
    /// The term function dispatches on the stored tag in O(1).
    pub fn into_extractor(self) -> Extractor<T> {
        let arms = Rc::new(self.arms);
        Extractor::from_plan(move |schema, env| {
            let ctors = match schema {
                Schema::Variant(ctors) => ctors,
                other => {
                    return Err(BrocadeError::mismatch("a variant", other.to_string()));
                }
            };
            let mut plans: Vec<TermFn<T>> = Vec::with_capacity(ctors.len());
            for (name, payload_schema) in ctors {
                let (_, arm) = arms
                    .iter()
                    .find(|(arm_name, _)| arm_name == name)
                    .ok_or_else(|| BrocadeError::UnmatchedConstructor { name: name.clone() })?;
                trace!(constructor = %name, "constructor resolved");
                let plan = arm
                    .plan(payload_schema, env)
                    .map_err(|err| err.with_subject(&format!("constructor `{name}`")))?;
                plans.push(plan);
            }
            Ok(Rc::new(move |term: &Term| match term {
                Term::Variant { tag, payload, .. } => {
                    let plan = plans.get(*tag as usize).ok_or_else(|| {
                        BrocadeError::corrupt(format!(
                            "variant tag {tag} outside the {}-arm plan",
                            plans.len()
                        ))
                    })?;
                    plan(payload)
                }
                other => Err(BrocadeError::corrupt(format!(
                    "expected a variant term, got {other}"
                ))),
            }) as TermFn<T>)
        })
    }
}

impl<T: 'static> Default for VariantBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A single-constructor extractor for hand-built backward compatibility.
///
/// Extracts `Some` when the decoded variant is the named constructor, `None`
/// for any other constructor of the incoming schema. The named constructor
/// may be absent from the incoming schema entirely, in which case the result
/// is always `None`.
pub fn extract_constructor<A: Schematic>(name: impl Into<String>) -> Extractor<Option<A>> {
    let name = name.into();
    Extractor::from_plan(move |schema, env| {
        let ctors = match schema {
            Schema::Variant(ctors) => ctors,
            other => {
                return Err(BrocadeError::mismatch("a variant", other.to_string()));
            }
        };
        let found = ctors.iter().position(|(ctor_name, _)| ctor_name == &name);
        let planned = match found {
            Some(index) => {
                let plan = A::extractor()
                    .plan(&ctors[index].1, env)
                    .map_err(|err| err.with_subject(&format!("constructor `{name}`")))?;
                Some((index, plan))
            }
            None => None,
        };
        Ok(Rc::new(move |term: &Term| match term {
            Term::Variant { tag, payload, .. } => match &planned {
                Some((index, plan)) if *tag as usize == *index => plan(payload).map(Some),
                _ => Ok(None),
            },
            other => Err(BrocadeError::corrupt(format!(
                "expected a variant term, got {other}"
            ))),
        }) as TermFn<Option<A>>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_term;
    use crate::reader::ByteReader;
    use crate::schematic::Schematic;

    fn plan_and_run<T: Schematic>(schema: &Schema, bytes: &[u8]) -> Result<T> {
        let mut env = PlanEnv::new();
        let f = T::extractor().plan(schema, &mut env)?;
        let mut r = ByteReader::new(bytes);
        let term = decode_term(schema, &mut r)?;
        f(&term)
    }

    #[test]
    fn map_converts() {
        let doubled = u16::extractor().map(|x| u32::from(x) * 2);
        let mut env = PlanEnv::new();
        let f = doubled.plan(&Schema::U16, &mut env).unwrap();
        assert_eq!(f(&Term::U16(21)).unwrap(), 42);
    }

    #[test]
    fn or_falls_back_on_plan_failure_only() {
        let lenient = String::extractor()
            .map(|s| s.len() as u64)
            .or(u64::extractor());
        let mut env = PlanEnv::new();
        let f = lenient.plan(&Schema::U64, &mut env).unwrap();
        assert_eq!(f(&Term::U64(9)).unwrap(), 9);

        let f = lenient.plan(&Schema::Text, &mut env).unwrap();
        assert_eq!(f(&Term::Text("four".to_owned())).unwrap(), 4);

        let err = lenient.plan(&Schema::Bool, &mut env).unwrap_err();
        assert!(err.is_plan_error());
    }

    #[test]
    fn pair_consumes_one_schema() {
        let both = pair(
            extract_field::<u32>("x"),
            extract_field::<String>("label"),
        );
        let schema = Schema::record([
            ("label", Schema::Text),
            ("x", Schema::U32),
        ]);
        let mut env = PlanEnv::new();
        let f = both.plan(&schema, &mut env).unwrap();
        let term = Term::Record(vec![
            ("label".to_owned(), Term::Text("p".to_owned())),
            ("x".to_owned(), Term::U32(5)),
        ]);
        assert_eq!(f(&term).unwrap(), (5, "p".to_owned()));
    }

    #[test]
    fn field_reordering_is_transparent() {
        // Writer ordered (y, x); target asks for x then y.
        let schema = Schema::record([("y", Schema::I32), ("x", Schema::I32)]);
        let bytes = [0x02, 0, 0, 0, 0x01, 0, 0, 0];
        let (x, y) = plan_and_run::<(i32, i32)>(
            &Schema::product([Schema::I32, Schema::I32]),
            &[0x01, 0, 0, 0, 0x02, 0, 0, 0],
        )
        .unwrap();
        assert_eq!((x, y), (1, 2));

        let both = pair(extract_field::<i32>("x"), extract_field::<i32>("y"));
        let mut env = PlanEnv::new();
        let f = both.plan(&schema, &mut env).unwrap();
        let mut r = ByteReader::new(&bytes);
        let term = decode_term(&schema, &mut r).unwrap();
        assert_eq!(f(&term).unwrap(), (1, 2));
    }

    #[test]
    fn missing_field_without_default_fails_plan() {
        let schema = Schema::record([("x", Schema::I32)]);
        let mut env = PlanEnv::new();
        let err = extract_field::<i32>("y")
            .plan(&schema, &mut env)
            .unwrap_err();
        assert_eq!(
            err,
            BrocadeError::MissingField {
                field: "y".to_owned()
            }
        );
    }

    #[test]
    fn missing_field_with_default_succeeds() {
        let schema = Schema::record([("x", Schema::I32)]);
        let ex: Extractor<i32> = Extractor::from_plan(|schema, env| {
            let fields = expect_record(schema)?;
            plan_field_or::<i32>(fields, "y", env, || -7)
        });
        let mut env = PlanEnv::new();
        let f = ex.plan(&schema, &mut env).unwrap();
        let term = Term::Record(vec![("x".to_owned(), Term::I32(1))]);
        assert_eq!(f(&term).unwrap(), -7);
    }

    #[test]
    fn extra_incoming_fields_are_ignored() {
        let schema = Schema::record([
            ("x", Schema::I32),
            ("debug", Schema::Text),
            ("y", Schema::I32),
        ]);
        let both = pair(extract_field::<i32>("x"), extract_field::<i32>("y"));
        let mut env = PlanEnv::new();
        let f = both.plan(&schema, &mut env).unwrap();
        let term = Term::Record(vec![
            ("x".to_owned(), Term::I32(1)),
            ("debug".to_owned(), Term::Text("ignored".to_owned())),
            ("y".to_owned(), Term::I32(2)),
        ]);
        assert_eq!(f(&term).unwrap(), (1, 2));
    }

    #[test]
    fn unmatched_incoming_constructor_fails_plan() {
        let target = VariantBuilder::<bool>::new()
            .arm("Yes", <()>::extractor().map(|()| true))
            .arm("No", <()>::extractor().map(|()| false))
            .into_extractor();

        let subset = Schema::variant([("No", Schema::product([]))]);
        let mut env = PlanEnv::new();
        let f = target.plan(&subset, &mut env).unwrap();
        let term = Term::Variant {
            tag: 0,
            name: "No".to_owned(),
            payload: Box::new(Term::Product(vec![])),
        };
        assert!(!f(&term).unwrap());

        let superset = Schema::variant([
            ("Yes", Schema::product([])),
            ("No", Schema::product([])),
            ("Maybe", Schema::product([])),
        ]);
        let err = target.plan(&superset, &mut env).unwrap_err();
        assert_eq!(
            err,
            BrocadeError::UnmatchedConstructor {
                name: "Maybe".to_owned()
            }
        );
    }

    #[test]
    fn extract_constructor_is_optional() {
        let schema = Schema::variant([
            ("Ping", Schema::product([])),
            ("Data", Schema::U32),
        ]);
        let ex = extract_constructor::<u32>("Data");
        let mut env = PlanEnv::new();
        let f = ex.plan(&schema, &mut env).unwrap();

        let data = Term::Variant {
            tag: 1,
            name: "Data".to_owned(),
            payload: Box::new(Term::U32(8)),
        };
        assert_eq!(f(&data).unwrap(), Some(8));

        let ping = Term::Variant {
            tag: 0,
            name: "Ping".to_owned(),
            payload: Box::new(Term::Product(vec![])),
        };
        assert_eq!(f(&ping).unwrap(), None);

        // Constructor absent from the incoming schema: always None.
        let other = Schema::variant([("Ping", Schema::product([]))]);
        let f = ex.plan(&other, &mut env).unwrap();
        assert_eq!(f(&ping).unwrap(), None);
    }

    #[test]
    fn recursion_mismatch_is_a_plan_error() {
        // fix [self.0] is an infinitely nested vector; no finite host type
        // recursion lines up with it from a u32 extractor's point of view.
        let schema = Schema::fix(Schema::vector(Schema::SelfRef(0)));
        let mut env = PlanEnv::new();
        let err = Vec::<u32>::extractor().plan(&schema, &mut env).unwrap_err();
        assert!(matches!(
            err,
            BrocadeError::TypeRecursionMismatch { depth: 0 }
        ));
    }

    #[test]
    fn corrupt_term_is_reported_not_swallowed() {
        let schema = Schema::record([("x", Schema::I32)]);
        let ex = extract_field::<i32>("x");
        let mut env = PlanEnv::new();
        let f = ex.plan(&schema, &mut env).unwrap();
        let err = f(&Term::Bool(true)).unwrap_err();
        assert!(matches!(err, BrocadeError::CorruptTerm { .. }));
    }
}
