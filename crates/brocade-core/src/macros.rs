//! Declarative derivation surface for user types.
//!
//! [`schematic_record!`] and [`schematic_variant!`] define a struct or enum
//! together with its full [`Schematic`](crate::Schematic) impl: canonical
//! schema, total encoder, native decoder, and negotiating extractor. Record
//! fields may carry a `= default` clause consulted when a payload's schema
//! lacks the field.
//!
//! Variant payloads follow the wire convention for constructors: no fields
//! encode as an empty product, a single field encodes as that field's
//! schema, and multiple fields encode as a product.

/// Define a struct and derive its `Schematic` impl.
///
/// ```
/// use brocade_core::schematic_record;
///
/// schematic_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct User {
///         pub name: String,
///         pub age: u32 = 0,
///     }
/// }
/// ```
#[macro_export]
macro_rules! schematic_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty $(= $default:expr)?
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )+
        }

        impl $crate::Schematic for $name {
            fn schema_gen(ctx: &mut $crate::SchemaGen) -> $crate::SchemaExpr {
                $crate::SchemaExpr::record(vec![
                    $( (stringify!($field).to_owned(), ctx.of::<$ty>()) ),+
                ])
            }

            fn encode(&self, out: &mut ::std::vec::Vec<u8>) {
                $( $crate::Schematic::encode(&self.$field, out); )+
            }

            fn decode_native(r: &mut $crate::ByteReader<'_>) -> $crate::Result<Self> {
                ::std::result::Result::Ok(Self {
                    $( $field: <$ty as $crate::Schematic>::decode_native(r)?, )+
                })
            }

            fn extractor() -> $crate::Extractor<Self> {
                $crate::Extractor::from_plan(|schema, env| {
                    let fields = $crate::extract::expect_record(schema)?;
                    $(
                        let $field = $crate::schematic_record!(
                            @plan_one fields, env, $field : $ty $(= $default)?
                        );
                    )+
                    ::std::result::Result::Ok(::std::rc::Rc::new(
                        move |term: &$crate::Term| {
                            ::std::result::Result::Ok($name {
                                $( $field: $field(term)?, )+
                            })
                        },
                    ) as $crate::extract::TermFn<Self>)
                })
            }
        }
    };

    (@plan_one $fields:ident, $env:ident, $field:ident : $ty:ty) => {
        $crate::extract::plan_field::<$ty>($fields, stringify!($field), $env)?
    };
    (@plan_one $fields:ident, $env:ident, $field:ident : $ty:ty = $default:expr) => {
        $crate::extract::plan_field_or::<$ty>($fields, stringify!($field), $env, || $default)?
    };
}

/// Define an enum and derive its `Schematic` impl.
///
/// ```
/// use brocade_core::schematic_variant;
///
/// schematic_variant! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub enum Shape {
///         Empty,
///         Circle(f64),
///         Rect(f64, f64),
///     }
/// }
/// ```
#[macro_export]
macro_rules! schematic_variant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident $( ( $($ty:ty),+ $(,)? ) )? ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $variant $( ( $($ty),+ ) )?, )+
        }

        impl $crate::Schematic for $name {
            fn schema_gen(ctx: &mut $crate::SchemaGen) -> $crate::SchemaExpr {
                $crate::SchemaExpr::variant(vec![
                    $(
                        (
                            stringify!($variant).to_owned(),
                            $crate::schematic_variant!(@ctor_schema ctx $(, $($ty),+ )?),
                        )
                    ),+
                ])
            }

            fn encode(&self, out: &mut ::std::vec::Vec<u8>) {
                $crate::schematic_variant!(
                    @encode self, out, 0u64, []; $( $variant $( ( $($ty),+ ) )? ,)+
                );
            }

            fn decode_native(r: &mut $crate::ByteReader<'_>) -> $crate::Result<Self> {
                let tag = r.uvarint()?;
                $crate::schematic_variant!(
                    @decode r, tag, 0u64; $( $variant $( ( $($ty),+ ) )? ,)+
                );
                ::std::result::Result::Err($crate::BrocadeError::InvalidTag {
                    tag,
                    arity: [ $( stringify!($variant) ),+ ].len(),
                })
            }

            fn extractor() -> $crate::Extractor<Self> {
                $crate::extract::VariantBuilder::new()
                    $(
                        .arm(
                            stringify!($variant),
                            $crate::schematic_variant!(@arm $name $variant ; $( $($ty),+ )?),
                        )
                    )+
                    .into_extractor()
            }
        }
    };

    // Constructor payload schemas: empty, single, multi.
    (@ctor_schema $ctx:ident) => {
        $crate::SchemaExpr::leaf($crate::Schema::product([]))
    };
    (@ctor_schema $ctx:ident, $t0:ty) => { $ctx.of::<$t0>() };
    (@ctor_schema $ctx:ident, $($t:ty),+) => {
        $crate::SchemaExpr::product(vec![ $( $ctx.of::<$t>() ),+ ])
    };

    // Encoder: accumulate match arms with running constructor indices.
    (@encode $self_:ident, $out:ident, $n:expr, [$($acc:tt)*]; ) => {
        match $self_ { $($acc)* }
    };
    (@encode $self_:ident, $out:ident, $n:expr, [$($acc:tt)*];
     $variant:ident, $($rest:tt)*) => {
        $crate::schematic_variant!(@encode $self_, $out, ($n + 1u64), [
            $($acc)*
            Self::$variant => {
                $crate::varint::write_uvarint($out, $n);
            },
        ]; $($rest)*)
    };
    (@encode $self_:ident, $out:ident, $n:expr, [$($acc:tt)*];
     $variant:ident ($t0:ty), $($rest:tt)*) => {
        $crate::schematic_variant!(@encode $self_, $out, ($n + 1u64), [
            $($acc)*
            Self::$variant(x0) => {
                $crate::varint::write_uvarint($out, $n);
                <$t0 as $crate::Schematic>::encode(x0, $out);
            },
        ]; $($rest)*)
    };
    (@encode $self_:ident, $out:ident, $n:expr, [$($acc:tt)*];
     $variant:ident ($t0:ty, $t1:ty), $($rest:tt)*) => {
        $crate::schematic_variant!(@encode $self_, $out, ($n + 1u64), [
            $($acc)*
            Self::$variant(x0, x1) => {
                $crate::varint::write_uvarint($out, $n);
                <$t0 as $crate::Schematic>::encode(x0, $out);
                <$t1 as $crate::Schematic>::encode(x1, $out);
            },
        ]; $($rest)*)
    };
    (@encode $self_:ident, $out:ident, $n:expr, [$($acc:tt)*];
     $variant:ident ($t0:ty, $t1:ty, $t2:ty), $($rest:tt)*) => {
        $crate::schematic_variant!(@encode $self_, $out, ($n + 1u64), [
            $($acc)*
            Self::$variant(x0, x1, x2) => {
                $crate::varint::write_uvarint($out, $n);
                <$t0 as $crate::Schematic>::encode(x0, $out);
                <$t1 as $crate::Schematic>::encode(x1, $out);
                <$t2 as $crate::Schematic>::encode(x2, $out);
            },
        ]; $($rest)*)
    };
    (@encode $self_:ident, $out:ident, $n:expr, [$($acc:tt)*];
     $variant:ident ($t0:ty, $t1:ty, $t2:ty, $t3:ty), $($rest:tt)*) => {
        $crate::schematic_variant!(@encode $self_, $out, ($n + 1u64), [
            $($acc)*
            Self::$variant(x0, x1, x2, x3) => {
                $crate::varint::write_uvarint($out, $n);
                <$t0 as $crate::Schematic>::encode(x0, $out);
                <$t1 as $crate::Schematic>::encode(x1, $out);
                <$t2 as $crate::Schematic>::encode(x2, $out);
                <$t3 as $crate::Schematic>::encode(x3, $out);
            },
        ]; $($rest)*)
    };

    // Native decoder: one early return per constructor index.
    (@decode $r:ident, $tag:ident, $n:expr; ) => {};
    (@decode $r:ident, $tag:ident, $n:expr; $variant:ident, $($rest:tt)*) => {
        if $tag == $n {
            return ::std::result::Result::Ok(Self::$variant);
        }
        $crate::schematic_variant!(@decode $r, $tag, ($n + 1u64); $($rest)*)
    };
    (@decode $r:ident, $tag:ident, $n:expr; $variant:ident ($($t:ty),+), $($rest:tt)*) => {
        if $tag == $n {
            return ::std::result::Result::Ok(Self::$variant(
                $( <$t as $crate::Schematic>::decode_native($r)? ),+
            ));
        }
        $crate::schematic_variant!(@decode $r, $tag, ($n + 1u64); $($rest)*)
    };

    // Extractor arms: extract the whole enum value out of one payload.
    (@arm $name:ident $variant:ident ;) => {
        <() as $crate::Schematic>::extractor().map(|()| $name::$variant)
    };
    (@arm $name:ident $variant:ident ; $t0:ty) => {
        <$t0 as $crate::Schematic>::extractor().map($name::$variant)
    };
    (@arm $name:ident $variant:ident ; $t0:ty, $t1:ty) => {
        <($t0, $t1) as $crate::Schematic>::extractor()
            .map(|(x0, x1)| $name::$variant(x0, x1))
    };
    (@arm $name:ident $variant:ident ; $t0:ty, $t1:ty, $t2:ty) => {
        <($t0, $t1, $t2) as $crate::Schematic>::extractor()
            .map(|(x0, x1, x2)| $name::$variant(x0, x1, x2))
    };
    (@arm $name:ident $variant:ident ; $t0:ty, $t1:ty, $t2:ty, $t3:ty) => {
        <($t0, $t1, $t2, $t3) as $crate::Schematic>::extractor()
            .map(|(x0, x1, x2, x3)| $name::$variant(x0, x1, x2, x3))
    };
}

#[cfg(test)]
mod tests {
    use crate::frame::{from_bytes, to_bytes};
    use crate::schematic::Schematic;
    use brocade_types::Schema;

    schematic_record! {
        #[derive(Debug, Clone, PartialEq)]
        pub struct User {
            pub name: String,
            pub age: u32 = 0,
            pub emails: Vec<String>,
        }
    }

    schematic_variant! {
        #[derive(Debug, Clone, PartialEq)]
        pub enum Shape {
            Empty,
            Circle(f64),
            Rect(f64, f64),
            Labeled(String, f64, f64, bool),
        }
    }

    schematic_variant! {
        #[derive(Debug, Clone, PartialEq)]
        pub enum Tree {
            Leaf,
            Node(i32, Box<Tree>, Box<Tree>),
        }
    }

    fn sample_user() -> User {
        User {
            name: "ada".to_owned(),
            age: 36,
            emails: vec!["ada@example.org".to_owned()],
        }
    }

    #[test]
    fn record_schema_lists_fields_in_declaration_order() {
        assert_eq!(
            User::schema(),
            Schema::record([
                ("name", Schema::Text),
                ("age", Schema::U32),
                ("emails", Schema::vector(Schema::Text)),
            ])
        );
    }

    #[test]
    fn record_roundtrip() {
        let user = sample_user();
        assert_eq!(from_bytes::<User>(&to_bytes(&user)).unwrap(), user);
    }

    #[test]
    fn variant_schema_follows_payload_conventions() {
        assert_eq!(
            Shape::schema(),
            Schema::variant([
                ("Empty", Schema::product([])),
                ("Circle", Schema::F64),
                ("Rect", Schema::product([Schema::F64, Schema::F64])),
                (
                    "Labeled",
                    Schema::product([Schema::Text, Schema::F64, Schema::F64, Schema::Bool]),
                ),
            ])
        );
    }

    #[test]
    fn variant_roundtrips_every_arity() {
        for shape in [
            Shape::Empty,
            Shape::Circle(1.5),
            Shape::Rect(2.0, 3.0),
            Shape::Labeled("box".to_owned(), 2.0, 3.0, true),
        ] {
            assert_eq!(from_bytes::<Shape>(&to_bytes(&shape)).unwrap(), shape);
        }
    }

    #[test]
    fn variant_wire_tags_follow_declaration_order() {
        let mut out = Vec::new();
        Shape::Rect(0.0, 0.0).encode(&mut out);
        assert_eq!(out[0], 2);

        let mut out = Vec::new();
        Shape::Empty.encode(&mut out);
        assert_eq!(out, [0]);
    }

    #[test]
    fn recursive_enum_schema_introduces_a_fixpoint() {
        let expected = Schema::fix(Schema::variant([
            ("Leaf", Schema::product([])),
            (
                "Node",
                Schema::product([Schema::I32, Schema::SelfRef(0), Schema::SelfRef(0)]),
            ),
        ]));
        assert_eq!(Tree::schema(), expected);
        // Recursion through the box resolves to the same schema.
        assert_eq!(<Box<Tree>>::schema(), expected);
        Tree::schema().validate().unwrap();
    }

    #[test]
    fn mutually_recursive_schemas_bind_at_the_root() {
        schematic_record! {
            #[derive(Debug, Clone, PartialEq)]
            struct Forest {
                trees: Vec<Sapling>,
            }
        }

        schematic_record! {
            #[derive(Debug, Clone, PartialEq)]
            struct Sapling {
                label: String,
                below: Option<Box<Forest>>,
            }
        }

        let schema = Forest::schema();
        schema.validate().unwrap();
        assert_eq!(
            schema,
            Schema::fix(Schema::record([(
                "trees",
                Schema::vector(Schema::record([
                    ("label", Schema::Text),
                    (
                        "below",
                        Schema::variant([
                            ("None", Schema::product([])),
                            ("Some", Schema::SelfRef(0)),
                        ]),
                    ),
                ])),
            )]))
        );

        let forest = Forest {
            trees: vec![Sapling {
                label: "oak".to_owned(),
                below: Some(Box::new(Forest { trees: vec![] })),
            }],
        };
        assert_eq!(from_bytes::<Forest>(&to_bytes(&forest)).unwrap(), forest);
    }

    #[test]
    fn recursive_enum_roundtrips() {
        let tree = Tree::Node(
            1,
            Box::new(Tree::Node(2, Box::new(Tree::Leaf), Box::new(Tree::Leaf))),
            Box::new(Tree::Leaf),
        );
        assert_eq!(from_bytes::<Tree>(&to_bytes(&tree)).unwrap(), tree);
    }

    #[test]
    fn recursive_enum_value_layout() {
        // Node(1, Leaf, Leaf) = 01 01 00 00 00 00 00
        let mut out = Vec::new();
        Tree::Node(1, Box::new(Tree::Leaf), Box::new(Tree::Leaf)).encode(&mut out);
        assert_eq!(out, [0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn defaulted_field_fills_in_when_absent() {
        schematic_record! {
            #[derive(Debug, Clone, PartialEq)]
            struct UserV1 {
                name: String,
                emails: Vec<String>,
            }
        }

        let old = UserV1 {
            name: "ada".to_owned(),
            emails: vec![],
        };
        let migrated = from_bytes::<User>(&to_bytes(&old)).unwrap();
        assert_eq!(migrated.name, "ada");
        assert_eq!(migrated.age, 0);
    }

    #[test]
    fn missing_field_without_default_fails() {
        schematic_record! {
            #[derive(Debug, Clone, PartialEq)]
            struct Nameless {
                age: u32,
            }
        }

        let err = from_bytes::<User>(&to_bytes(&Nameless { age: 3 })).unwrap_err();
        assert_eq!(
            err,
            brocade_error::BrocadeError::MissingField {
                field: "name".to_owned()
            }
        );
    }

    #[test]
    fn reordered_and_extended_producer_record_decodes() {
        schematic_record! {
            #[derive(Debug, Clone, PartialEq)]
            struct UserV3 {
                emails: Vec<String>,
                nickname: String,
                age: u32,
                name: String,
            }
        }

        let v3 = UserV3 {
            emails: vec!["a@b".to_owned()],
            nickname: "countess".to_owned(),
            age: 36,
            name: "ada".to_owned(),
        };
        let user = from_bytes::<User>(&to_bytes(&v3)).unwrap();
        assert_eq!(
            user,
            User {
                name: "ada".to_owned(),
                age: 36,
                emails: vec!["a@b".to_owned()],
            }
        );
    }

    #[test]
    fn recursive_evolution_goes_through_the_planner() {
        // Same shape, narrower payload type: the schemas differ, so the
        // envelope must plan an extractor, and the recursion has to tie the
        // knot through the fixpoint while widening I16 into I32.
        schematic_variant! {
            #[derive(Debug, Clone, PartialEq)]
            enum SmallTree {
                Leaf,
                Node(i16, Box<SmallTree>, Box<SmallTree>),
            }
        }

        assert_ne!(SmallTree::schema(), Tree::schema());

        let small = SmallTree::Node(
            -5,
            Box::new(SmallTree::Node(
                7,
                Box::new(SmallTree::Leaf),
                Box::new(SmallTree::Leaf),
            )),
            Box::new(SmallTree::Leaf),
        );
        let wide = from_bytes::<Tree>(&to_bytes(&small)).unwrap();
        assert_eq!(
            wide,
            Tree::Node(
                -5,
                Box::new(Tree::Node(7, Box::new(Tree::Leaf), Box::new(Tree::Leaf))),
                Box::new(Tree::Leaf),
            )
        );
    }

    #[test]
    fn producer_constructor_subset_decodes_into_larger_enum() {
        schematic_variant! {
            #[derive(Debug, Clone, PartialEq)]
            enum ShapeV1 {
                Empty,
                Circle(f64),
            }
        }

        let decoded = from_bytes::<Shape>(&to_bytes(&ShapeV1::Circle(2.5))).unwrap();
        assert_eq!(decoded, Shape::Circle(2.5));
    }

    #[test]
    fn producer_constructor_superset_fails_the_plan() {
        schematic_variant! {
            #[derive(Debug, Clone, PartialEq)]
            enum ShapeV9 {
                Empty,
                Circle(f64),
                Blob(f64),
            }
        }

        let err = from_bytes::<Shape>(&to_bytes(&ShapeV9::Empty)).unwrap_err();
        assert_eq!(
            err,
            brocade_error::BrocadeError::UnmatchedConstructor {
                name: "Blob".to_owned()
            }
        );
    }
}
