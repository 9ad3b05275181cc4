//! End-to-end tests through the `introspect` facade.

use std::mem::offset_of;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::rc::Rc;

use introspect::{
    Argument, CastError, ConversionError, DynamicType, InvokeError, ParamType, Reflect,
    ReflectError, Registry, Signature, SymbolKind, Variant, VariantError, converters, find_type,
    type_id, types,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Type ids
// ============================================================================

#[derive(Reflect)]
#[reflect(name = "unit::LateType")]
struct LateType;

#[test]
fn type_ids_are_stable() {
    assert!(!find_type("unit::LateType").is_valid());

    let id = type_id::<LateType>();
    for _ in 0..16 {
        assert_eq!(type_id::<LateType>(), id);
    }
    assert_eq!(find_type("unit::LateType").id(), id);
    assert_eq!(types().by_name("unit::LateType"), Some(id));
    assert_eq!(find_type("int").id(), type_id::<i32>());

    let const_ref = find_type("const unit::LateType&");
    assert!(const_ref.is_valid());
    assert!(const_ref.is_const());
    assert_eq!(const_ref.decayed(), id);
}

// ============================================================================
// Variant round trips and conversions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Reflect)]
#[reflect(name = "unit::Celsius", clone, eq)]
struct Celsius(f64);

#[derive(Debug, Clone, PartialEq, Reflect)]
#[reflect(name = "unit::Fahrenheit", clone, eq)]
struct Fahrenheit(f64);

impl From<Celsius> for Fahrenheit {
    fn from(c: Celsius) -> Self {
        Fahrenheit(c.0 * 9.0 / 5.0 + 32.0)
    }
}

#[test]
fn round_trips() {
    init_tracing();

    let boxed = Variant::new(42i32);
    assert_eq!(boxed.to::<i32>().unwrap(), 42);
    assert_eq!(boxed.get::<i32>().unwrap(), &42);

    let text = Variant::new(String::from("reflect"));
    assert_eq!(text.to::<String>().unwrap(), "reflect");

    let number = Variant::new(256i32);
    let direct = converters()
        .convert(&number, type_id::<String>())
        .unwrap()
        .into_value::<String>()
        .unwrap();
    assert_eq!(number.to::<String>().unwrap(), direct);
    assert_eq!(direct, "256");

    let err = Variant::new(String::from("abc")).to::<i32>().unwrap_err();
    assert!(matches!(
        err,
        VariantError::Conversion(ConversionError::Failed { .. })
    ));
}

#[test]
fn user_converters_are_single_hop() {
    converters().register_from::<Celsius, Fahrenheit>().unwrap();
    assert!(converters().register_from::<Celsius, Fahrenheit>().is_err());

    let boiling = Variant::new(Celsius(100.0));
    assert_eq!(boiling.to::<Fahrenheit>().unwrap(), Fahrenheit(212.0));

    // No path from Celsius to string through Fahrenheit.
    assert!(boiling.to::<String>().is_err());
    assert!(Variant::new(Fahrenheit(1.0)).to::<Celsius>().is_err());
}

#[test]
fn equality() {
    assert_eq!(Variant::empty(), Variant::empty());
    assert_ne!(Variant::empty(), Variant::new(0i32));
    assert_ne!(Variant::new(0i32), Variant::empty());

    let number = Variant::new(256i32);
    let text = Variant::new(String::from("256"));
    assert_ne!(number, text);
    assert!(number.loose_eq(&text));
    assert!(text.loose_eq(&number));
    assert!(!number.loose_eq(&Variant::new(String::from("257"))));
    assert!(!number.loose_eq(&Variant::empty()));
    assert!(Variant::empty().loose_eq(&Variant::empty()));

    let value = 256i32;
    assert_eq!(Variant::alias(&value), number);
}

// ============================================================================
// Single inheritance: A <- B <- C
// ============================================================================

#[derive(Reflect)]
#[reflect(name = "chain::A")]
struct A {
    #[reflect(dynamic)]
    dynamic: DynamicType,
    #[reflect(get, set)]
    a: i32,
}

#[derive(Reflect)]
#[reflect(name = "chain::B")]
struct B {
    base: A,
    b: i32,
}

#[derive(Reflect)]
#[reflect(name = "chain::C")]
struct C {
    base: B,
    c: i32,
}

#[derive(Reflect)]
#[reflect(name = "chain::Sibling")]
struct Sibling {
    base: A,
    s: i32,
}

fn chain_registry() -> Registry {
    let mut registry = Registry::new();
    registry.class::<A>().fields().unwrap().build().unwrap();
    registry
        .class::<B>()
        .base_with::<A, _, _>(|b: &B| &b.base, |b: &mut B| &mut b.base)
        .build()
        .unwrap();
    registry
        .class::<C>()
        .base_with::<B, _, _>(|c: &C| &c.base, |c: &mut C| &mut c.base)
        .build()
        .unwrap();
    registry
        .class::<Sibling>()
        .base_with::<A, _, _>(|s: &Sibling| &s.base, |s: &mut Sibling| &mut s.base)
        .build()
        .unwrap();
    registry
}

/// A heap object reached only through the pointer its sub-object tags hold.
struct Rooted<T> {
    ptr: NonNull<T>,
}

impl<T> Rooted<T> {
    fn new(value: T) -> Self {
        Self {
            ptr: NonNull::from(Box::leak(Box::new(value))),
        }
    }
}

impl<T> Deref for Rooted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `ptr` owns a live leaked box until drop.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for Rooted<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, borrowed uniquely through `self`.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for Rooted<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `Box::leak` and is released once.
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

fn make_c() -> Rooted<C> {
    let c = Rooted::new(C {
        base: B {
            base: A {
                dynamic: DynamicType::none(),
                a: 1,
            },
            b: 2,
        },
        c: 3,
    });
    let top = c.ptr;
    // SAFETY: the `A` stays inside this `C`, which is only reached through
    // `top` and freed after every reference to it is gone.
    unsafe {
        (*top.as_ptr()).base.base.dynamic =
            DynamicType::within(top, offset_of!(C, base) + offset_of!(B, base));
    }
    c
}

#[test]
fn chain_upcasts() {
    init_tracing();
    let registry = chain_registry();
    let c = make_c();

    assert_eq!(registry.cast_ptr::<C, A>(&c).unwrap().a, 1);
    assert_eq!(registry.cast_ptr::<C, B>(&c).unwrap().b, 2);
    assert_eq!(registry.cast_ptr::<C, C>(&c).unwrap().c, 3);
    assert!(registry.inherits_from(type_id::<C>(), type_id::<A>()));
    assert!(!registry.inherits_from(type_id::<C>(), type_id::<Sibling>()));

    assert!(registry.cast_ptr::<C, Sibling>(&c).is_none());
    assert!(matches!(
        registry.cast_ref::<C, Sibling>(&c),
        Err(CastError::BadMetaCast { .. })
    ));
}

#[test]
fn chain_downcasts_follow_the_dynamic_type() {
    let registry = chain_registry();
    let mut c = make_c();
    let a = &c.base.base;

    assert_eq!(registry.cast_ptr::<A, C>(a).unwrap().c, 3);
    assert_eq!(registry.cast_ptr::<A, B>(a).unwrap().b, 2);
    assert!(registry.cast_ptr::<A, Sibling>(a).is_none());

    // Read-only aliases dispatch on the dynamic type.
    let alias = Variant::alias(a);
    assert_eq!(registry.class_of(&alias).unwrap().type_id, type_id::<C>());
    assert_eq!(registry.cast_variant::<C>(&alias).unwrap().c, 3);
    drop(alias);

    let a = &mut c.base.base;
    assert!(matches!(
        registry.cast_mut::<A, C>(a),
        Err(CastError::ImmutablePath { .. })
    ));
    registry.cast_mut::<A, A>(a).unwrap().a = 4;
    assert_eq!(c.base.base.a, 4);

    let sibling = Sibling {
        base: A {
            dynamic: DynamicType::none(),
            a: 9,
        },
        s: 4,
    };
    assert_eq!(sibling.s, 4);
    assert!(registry.cast_ptr::<A, C>(&sibling.base).is_none());
    assert_eq!(registry.cast_ptr::<A, A>(&sibling.base).unwrap().a, 9);
}

#[test]
fn inherited_properties_and_dispatch() {
    let registry = chain_registry();
    let mut c = Variant::new(C {
        base: B {
            base: A {
                dynamic: DynamicType::none(),
                a: 5,
            },
            b: 6,
        },
        c: 7,
    });

    assert_eq!(registry.get_property(&c, "a").unwrap().to::<i32>().unwrap(), 5);
    registry.set_property(&mut c, "a", Variant::new(8i32)).unwrap();
    assert_eq!(c.get::<C>().unwrap().base.base.a, 8);
    assert_eq!(registry.lineage(type_id::<C>()).len(), 3);

    // The property is registered as int; a string converts in one hop.
    registry
        .set_property(&mut c, "a", Variant::new(String::from("11")))
        .unwrap();
    assert_eq!(c.get::<C>().unwrap().base.base.a, 11);
}

// ============================================================================
// Virtual inheritance: VB1: virtual VBase, VB2: virtual VBase, VC: VB1, VB2
// ============================================================================

#[derive(Reflect)]
#[reflect(name = "diamond::VBase")]
struct VBase {
    v: i32,
}

#[derive(Reflect)]
#[reflect(name = "diamond::VB1")]
struct VB1 {
    shared: Rc<VBase>,
    x: i32,
}

#[derive(Reflect)]
#[reflect(name = "diamond::VB2")]
struct VB2 {
    shared: Rc<VBase>,
    y: i32,
}

#[derive(Reflect)]
#[reflect(name = "diamond::VC")]
struct VC {
    left: VB1,
    right: VB2,
}

fn diamond_registry() -> Registry {
    let mut registry = Registry::new();
    registry.class::<VBase>().build().unwrap();
    registry
        .class::<VB1>()
        .virtual_base::<VBase, _>(|d: &VB1| &*d.shared)
        .build()
        .unwrap();
    registry
        .class::<VB2>()
        .virtual_base::<VBase, _>(|d: &VB2| &*d.shared)
        .build()
        .unwrap();
    registry
        .class::<VC>()
        .base_with::<VB1, _, _>(|d: &VC| &d.left, |d: &mut VC| &mut d.left)
        .base_with::<VB2, _, _>(|d: &VC| &d.right, |d: &mut VC| &mut d.right)
        .build()
        .unwrap();
    registry
}

#[test]
fn virtual_diamond_shares_one_base() {
    init_tracing();
    let registry = diamond_registry();
    let shared = Rc::new(VBase { v: 10 });
    let mut vc = VC {
        left: VB1 {
            shared: Rc::clone(&shared),
            x: 1,
        },
        right: VB2 {
            shared: Rc::clone(&shared),
            y: 2,
        },
    };

    let left = registry.cast_ptr::<VC, VB1>(&vc).unwrap();
    let right = registry.cast_ptr::<VC, VB2>(&vc).unwrap();
    assert_eq!((left.x, right.y), (1, 2));
    assert!(!ptr::eq(
        left as *const VB1 as *const u8,
        right as *const VB2 as *const u8
    ));

    let base = registry.cast_ptr::<VC, VBase>(&vc).unwrap();
    assert_eq!(base.v, 10);
    assert!(ptr::eq(base, Rc::as_ptr(&shared)));
    assert!(ptr::eq(
        registry.cast_ptr::<VB2, VBase>(&vc.right).unwrap(),
        Rc::as_ptr(&shared)
    ));
    assert!(ptr::eq(
        registry.cast_ptr::<VB1, VBase>(&vc.left).unwrap(),
        Rc::as_ptr(&shared)
    ));

    assert!(matches!(
        registry.cast_mut::<VC, VBase>(&mut vc),
        Err(CastError::ImmutablePath { .. })
    ));
    registry.cast_mut::<VC, VB2>(&mut vc).unwrap().y = 20;
    assert_eq!(vc.right.y, 20);

    let value = Variant::new(vc);
    assert_eq!(registry.cast_variant::<VBase>(&value).unwrap().v, 10);
}

// ============================================================================
// Multiple inheritance: E: D, C; C: B; B: A
// ============================================================================

#[derive(Reflect)]
#[reflect(name = "multi::MA")]
struct MA {
    a: i32,
}

#[derive(Reflect)]
#[reflect(name = "multi::MB")]
struct MB {
    base: MA,
    b: i32,
}

#[derive(Reflect)]
#[reflect(name = "multi::MC")]
struct MC {
    base: MB,
    c: i32,
}

#[derive(Reflect)]
#[reflect(name = "multi::MD")]
struct MD {
    d: i32,
}

#[derive(Reflect)]
#[reflect(name = "multi::ME")]
struct ME {
    d: MD,
    c: MC,
    e: i32,
}

macro_rules! embeds {
    ($derived:ty => $base:ty, $field:ident) => {
        impl AsRef<$base> for $derived {
            fn as_ref(&self) -> &$base {
                &self.$field
            }
        }

        impl AsMut<$base> for $derived {
            fn as_mut(&mut self) -> &mut $base {
                &mut self.$field
            }
        }
    };
}

embeds!(MB => MA, base);
embeds!(MC => MB, base);
embeds!(ME => MD, d);
embeds!(ME => MC, c);

fn multi_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .class::<MA>()
        .method("value_a", |m: &MA| m.a)
        .unwrap()
        .method("bump_a", |m: &mut MA, by: i32| m.a += by)
        .unwrap()
        .build()
        .unwrap();
    registry.class::<MB>().base::<MA>().build().unwrap();
    registry.class::<MC>().base::<MB>().build().unwrap();
    registry.class::<MD>().build().unwrap();
    registry
        .class::<ME>()
        .base::<MD>()
        .base::<MC>()
        .build()
        .unwrap();
    registry
}

fn make_e() -> ME {
    ME {
        d: MD { d: 4 },
        c: MC {
            base: MB {
                base: MA { a: 1 },
                b: 2,
            },
            c: 3,
        },
        e: 5,
    }
}

#[test]
fn multiple_inheritance_casts() {
    let registry = multi_registry();
    let e = make_e();

    assert_eq!(registry.cast_ptr::<ME, MD>(&e).unwrap().d, 4);
    assert_eq!(registry.cast_ptr::<ME, MC>(&e).unwrap().c, 3);
    assert_eq!(registry.cast_ptr::<ME, MB>(&e).unwrap().b, 2);
    assert_eq!(registry.cast_ptr::<ME, MA>(&e).unwrap().a, 1);
    assert_eq!(registry.cast_ptr::<ME, ME>(&e).unwrap().e, 5);
    assert!(registry.cast_ptr::<MD, MA>(&e.d).is_none());

    assert_eq!(
        registry.base_classes(type_id::<ME>()),
        vec![type_id::<MD>(), type_id::<MC>()]
    );
    assert!(registry.inherits_from(type_id::<ME>(), type_id::<MA>()));
    assert!(!registry.inherits_from(type_id::<MA>(), type_id::<ME>()));
}

#[test]
fn methods_are_found_through_bases() {
    let registry = multi_registry();
    let mut e = make_e();

    let a = registry
        .call(Argument::constant(&e), "value_a", vec![])
        .unwrap();
    assert_eq!(a.to::<i32>().unwrap(), 1);

    registry
        .call(Argument::lvalue(&mut e), "bump_a", vec![Argument::value(6i32)])
        .unwrap();
    assert_eq!(e.c.base.base.a, 7);

    let err = registry
        .call(Argument::constant(&e), "bump_a", vec![Argument::value(1i32)])
        .unwrap_err();
    assert!(matches!(err, ReflectError::Invoke(InvokeError::ConstThis(_))));
}

// ============================================================================
// Argument binding
// ============================================================================

#[derive(Reflect)]
#[reflect(name = "bind::Gauge")]
struct Gauge {
    limit: i32,
}

fn gauge_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .class::<Gauge>()
        .method_with(
            "check",
            Signature::new()
                .param(ParamType::value::<i32>())
                .param(ParamType::mut_ref::<bool>()),
            |args| {
                let limit = args.this::<Gauge>()?.limit;
                let reading = args.take::<i32>(0)?;
                *args.get_mut::<bool>(1)? = reading > limit;
                Ok(Variant::empty())
            },
        )
        .unwrap()
        .build()
        .unwrap();
    registry
        .namespace("bind")
        .function_with(
            "consume",
            Signature::new()
                .param(ParamType::rvalue::<String>())
                .returns::<usize>(),
            |args| Ok(Variant::new(args.take::<String>(0)?.len())),
        )
        .unwrap();
    registry
}

#[test]
fn mutable_reference_parameters() {
    init_tracing();
    let registry = gauge_registry();
    let gauge = Gauge { limit: 100 };

    let mut flag = false;
    let result = registry
        .call(
            Argument::constant(&gauge),
            "check",
            vec![Argument::value(123i32), Argument::lvalue(&mut flag)],
        )
        .unwrap();
    assert!(result.is_empty());
    assert!(flag);

    let frozen = false;
    let err = registry
        .call(
            Argument::constant(&gauge),
            "check",
            vec![Argument::value(123i32), Argument::constant(&frozen)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ReflectError::Invoke(InvokeError::Unbindable { index: 1, .. })
    ));

    let err = registry
        .call(
            Argument::constant(&gauge),
            "check",
            vec![Argument::value(123i32), Argument::value(true)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ReflectError::Invoke(InvokeError::Unbindable { index: 1, .. })
    ));

    let err = registry
        .call(Argument::constant(&gauge), "check", vec![Argument::value(1i32)])
        .unwrap_err();
    assert!(matches!(
        err,
        ReflectError::Invoke(InvokeError::ArityMismatch { .. })
    ));
}

#[test]
fn converted_and_rvalue_parameters() {
    let registry = gauge_registry();
    let gauge = Gauge { limit: 10 };

    // "42" binds to the int parameter through the string converter.
    let mut flag = false;
    registry
        .call(
            Argument::constant(&gauge),
            "check",
            vec![
                Argument::value(String::from("42")),
                Argument::lvalue(&mut flag),
            ],
        )
        .unwrap();
    assert!(flag);

    let len = registry
        .invoke("bind::consume", vec![Argument::value(String::from("four"))])
        .unwrap();
    assert_eq!(len.to::<usize>().unwrap(), 4);

    let mut named = String::from("named");
    let err = registry
        .invoke("bind::consume", vec![Argument::lvalue(&mut named)])
        .unwrap_err();
    assert!(matches!(
        err,
        ReflectError::Invoke(InvokeError::Unbindable { index: 0, .. })
    ));
    assert_eq!(named, "named");
}

// ============================================================================
// Derived reflection and properties
// ============================================================================

#[derive(Debug, Clone, PartialEq, Reflect)]
#[reflect(name = "game::Player", clone, eq)]
struct Player {
    #[reflect(get, set)]
    health: i32,
    #[reflect(get, name = "id")]
    player_id: u64,
    secret: String,
}

fn player_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .class::<Player>()
        .constructor(|health: i32, id: u64| Player {
            health,
            player_id: id,
            secret: String::new(),
        })
        .unwrap()
        .fields()
        .unwrap()
        .method("heal", |p: &mut Player, by: i32| p.health += by)
        .unwrap()
        .build()
        .unwrap();
    registry
}

#[test]
fn derived_hooks() {
    let player = Player {
        health: 10,
        player_id: 1,
        secret: String::from("x"),
    };
    assert_eq!(Player::type_name(), "game::Player");
    assert_eq!(player.clone_value(), Some(player.clone()));
    assert_eq!(player.eq_value(&player), Some(true));
    assert_eq!(player.secret, "x");

    let boxed = Variant::new(player);
    let copy = boxed.try_clone().unwrap();
    assert_eq!(boxed, copy);
}

#[test]
fn read_only_properties() {
    let registry = player_registry();
    let mut player = registry
        .construct(
            "game::Player",
            vec![Argument::value(50i32), Argument::value(7u64)],
        )
        .unwrap();

    let mut id = registry.get_property(&player, "id").unwrap();
    assert!(matches!(id.get_mut::<u64>(), Err(VariantError::ReadOnly(_))));
    assert_eq!(id.get::<u64>().unwrap(), &7);
    assert_eq!(id.to::<u64>().unwrap(), 7);

    let err = registry
        .set_property(&mut player, "id", Variant::new(8u64))
        .unwrap_err();
    assert!(matches!(
        err,
        ReflectError::Invoke(InvokeError::ReadOnlyProperty(_))
    ));

    registry
        .set_property(&mut player, "health", Variant::new(20i32))
        .unwrap();
    registry
        .call(
            Argument::variant_lvalue(&mut player),
            "heal",
            vec![Argument::value(5i32)],
        )
        .unwrap();
    assert_eq!(player.get::<Player>().unwrap().health, 25);
    assert!(registry.get_property(&player, "secret").unwrap_err().is_lookup());
}

// ============================================================================
// Lookups
// ============================================================================

#[test]
fn symbol_lookups() {
    let registry = player_registry();
    let class = registry.resolve_class("game::Player").unwrap();
    assert_eq!(class.name, "Player");
    assert_eq!(class.properties.len(), 2);
    assert!(registry.find_method(type_id::<Player>(), "heal").is_some());
    assert!(registry.find_property(type_id::<Player>(), "health").is_some());
    assert!(registry.has_namespace("game"));
    assert_eq!(
        registry.members("game").unwrap(),
        vec![("Player", SymbolKind::Class)]
    );

    let err = registry.resolve_class("game::Monster").unwrap_err();
    assert_eq!(err.to_string(), "class not found: 'game::Monster'");
    assert!(registry.members("nowhere").is_err());
}

#[test]
fn registries_are_shared_across_threads() {
    let registry = player_registry();
    std::thread::scope(|scope| {
        for health in 0..4i32 {
            let registry = &registry;
            scope.spawn(move || {
                let player: Player = registry
                    .construct_type(vec![Argument::value(health), Argument::value(1u64)])
                    .unwrap();
                assert_eq!(player.health, health);
            });
        }
    });
}
