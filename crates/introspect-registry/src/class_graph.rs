//! Class Graph - the cast engine.
//!
//! Inheritance is stored as a `petgraph::DiGraph`:
//! - Nodes: class [`TypeId`]s, created on first mention so a class may name a
//!   base before the base itself is registered
//! - Edges: derived -> direct base, each carrying a [`CastEdge`] that maps the
//!   address of a derived object to the address of its base sub-object
//!
//! Edge functions, not constant offsets, make shared (virtual) bases work: a
//! base reached through an `Rc` lives outside the derived object entirely.
//!
//! # Casting
//!
//! [`ClassGraph::cast_raw`] resolves a cast in three steps:
//! 1. the target is the static type: the address is returned unchanged
//! 2. the target is a base: the first path in registration order is walked
//! 3. otherwise, for shared access only, the object's self-reported dynamic
//!    type is consulted. The static address must be reachable from the
//!    dynamic object (so sibling classes are never confused), then the path
//!    from the dynamic type to the target is walked
//!
//! # Example
//!
//! ```
//! use introspect_core::{Reflect, type_id};
//! use introspect_registry::{CastEdge, ClassGraph};
//!
//! struct Shape { sides: u32 }
//! struct Square { shape: Shape, len: f32 }
//!
//! impl Reflect for Shape { fn type_name() -> &'static str { "doc::Shape" } }
//! impl Reflect for Square { fn type_name() -> &'static str { "doc::Square" } }
//!
//! let mut graph = ClassGraph::new();
//! graph
//!     .add_base(
//!         type_id::<Square>(),
//!         type_id::<Shape>(),
//!         CastEdge::new(|s: &Square| &s.shape, |s: &mut Square| &mut s.shape),
//!     )
//!     .unwrap();
//!
//! let square = Square { shape: Shape { sides: 4 }, len: 2.0 };
//! let shape: &Shape = graph.cast_ptr(&square).unwrap();
//! assert_eq!(shape.sides, 4);
//! ```

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use introspect_core::{
    CastError, ClassInfo, Reflect, RegistrationError, SymbolKind, TypeId, Variant, type_id,
};

/// Type-erased address adjustment from a derived object to a base sub-object.
pub type UpcastFn = dyn Fn(NonNull<u8>) -> NonNull<u8> + Send + Sync;

/// A registered derived -> base relationship.
///
/// Every edge can produce a shared base reference. Edges built with
/// [`CastEdge::shared`] have no mutable path, which is how bases held behind
/// shared pointers are modelled.
#[derive(Clone)]
pub struct CastEdge {
    up: Arc<UpcastFn>,
    up_mut: Option<Arc<UpcastFn>>,
}

impl CastEdge {
    /// An edge with both a shared and a mutable accessor.
    pub fn new<D, B, F, G>(up: F, up_mut: G) -> Self
    where
        D: Reflect,
        B: Reflect,
        F: Fn(&D) -> &B + Send + Sync + 'static,
        G: Fn(&mut D) -> &mut B + Send + Sync + 'static,
    {
        let mut edge = Self::shared(up);
        edge.up_mut = Some(Arc::new(move |ptr: NonNull<u8>| {
            // SAFETY: edges are only applied to addresses of live, uniquely
            // borrowed `D` values (see `ClassGraph::cast_raw`).
            let derived = unsafe { ptr.cast::<D>().as_mut() };
            NonNull::from(up_mut(derived)).cast::<u8>()
        }));
        edge
    }

    /// An edge to a base that is only reachable through a shared reference.
    pub fn shared<D, B, F>(up: F) -> Self
    where
        D: Reflect,
        B: Reflect,
        F: Fn(&D) -> &B + Send + Sync + 'static,
    {
        Self {
            up: Arc::new(move |ptr: NonNull<u8>| {
                // SAFETY: edges are only applied to addresses of live `D`
                // values (see `ClassGraph::cast_raw`).
                let derived = unsafe { ptr.cast::<D>().as_ref() };
                NonNull::from(up(derived)).cast::<u8>()
            }),
            up_mut: None,
        }
    }

    /// Edge through `AsRef`/`AsMut`.
    pub fn via_as_ref<D, B>() -> Self
    where
        D: Reflect + AsRef<B> + AsMut<B>,
        B: Reflect,
    {
        Self::new(|d: &D| d.as_ref(), |d: &mut D| d.as_mut())
    }

    pub fn is_mutable(&self) -> bool {
        self.up_mut.is_some()
    }

    fn step(&self, mutable: bool) -> Option<&UpcastFn> {
        if mutable {
            self.up_mut.as_deref()
        } else {
            Some(&*self.up)
        }
    }
}

impl fmt::Debug for CastEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastEdge")
            .field("mutable", &self.is_mutable())
            .finish()
    }
}

/// The inheritance graph of all registered classes.
#[derive(Default)]
pub struct ClassGraph {
    graph: DiGraph<TypeId, CastEdge>,
    nodes: FxHashMap<TypeId, NodeIndex>,
}

impl ClassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: TypeId) -> NodeIndex {
        if let Some(node) = self.nodes.get(&id) {
            return *node;
        }
        let node = self.graph.add_node(id);
        self.nodes.insert(id, node);
        node
    }

    fn find(&self, id: TypeId) -> Option<NodeIndex> {
        self.nodes.get(&id).copied()
    }

    /// Number of classes mentioned by any edge.
    pub fn class_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Check that `derived -> base` could be added without modifying the graph.
    pub fn check_base(&self, derived: TypeId, base: TypeId) -> Result<(), RegistrationError> {
        if derived == base {
            return Err(RegistrationError::SelfInheritance(derived.to_string()));
        }
        let (Some(d), Some(b)) = (self.find(derived), self.find(base)) else {
            return Ok(());
        };
        if self.graph.find_edge(d, b).is_some() {
            return Err(RegistrationError::Duplicate {
                kind: SymbolKind::Class,
                name: format!("{} : {}", derived, base),
            });
        }
        if has_path_connecting(&self.graph, b, d, None) {
            return Err(RegistrationError::CircularInheritance {
                derived: derived.to_string(),
                base: base.to_string(),
            });
        }
        Ok(())
    }

    /// Record `base` as a direct base of `derived`.
    ///
    /// Bases keep their registration order, which is the order casts search.
    pub fn add_base(
        &mut self,
        derived: TypeId,
        base: TypeId,
        edge: CastEdge,
    ) -> Result<(), RegistrationError> {
        self.check_base(derived, base)?;
        let d = self.node(derived);
        let b = self.node(base);
        self.graph.add_edge(d, b, edge);
        debug!(derived = %derived, base = %base, "registered base class");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    fn edges(&self, node: NodeIndex, direction: Direction) -> Vec<(NodeIndex, &CastEdge)> {
        let mut edges: Vec<_> = self.graph.edges_directed(node, direction).collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| match direction {
                Direction::Outgoing => (edge.target(), edge.weight()),
                Direction::Incoming => (edge.source(), edge.weight()),
            })
            .collect()
    }

    /// Direct bases of `class`, in registration order.
    pub fn bases(&self, class: TypeId) -> Vec<TypeId> {
        self.find(class)
            .map(|node| {
                self.edges(node, Direction::Outgoing)
                    .into_iter()
                    .map(|(base, _)| self.graph[base])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct derived classes of `class`, in registration order.
    pub fn derived(&self, class: TypeId) -> Vec<TypeId> {
        self.find(class)
            .map(|node| {
                self.edges(node, Direction::Incoming)
                    .into_iter()
                    .map(|(derived, _)| self.graph[derived])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check whether `derived` is `base` or inherits from it.
    pub fn inherits_from(&self, derived: TypeId, base: TypeId) -> bool {
        if derived == base {
            return true;
        }
        match (self.find(derived), self.find(base)) {
            (Some(d), Some(b)) => has_path_connecting(&self.graph, d, b, None),
            _ => false,
        }
    }

    // ========================================================================
    // Path Walking
    // ========================================================================

    /// Apply the first path from `from` to `to`.
    ///
    /// # Safety
    ///
    /// `ptr` must address a live value of the type at `from`; for `mutable`
    /// walks it must also be valid for writes.
    unsafe fn walk(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        ptr: NonNull<u8>,
        mutable: bool,
    ) -> Option<NonNull<u8>> {
        if from == to {
            return Some(ptr);
        }
        for (base, edge) in self.edges(from, Direction::Outgoing) {
            let Some(step) = edge.step(mutable) else {
                continue;
            };
            if !has_path_connecting(&self.graph, base, to, None) {
                continue;
            }
            // SAFETY: the edge maps a live `from` object to its live base.
            if let Some(found) = unsafe { self.walk(base, to, step(ptr), mutable) } {
                return Some(found);
            }
        }
        None
    }

    /// Apply every path from `from` to `to`, collecting the addresses reached.
    ///
    /// # Safety
    ///
    /// Same as [`walk`](Self::walk) with `mutable = false`.
    unsafe fn walk_all(
        &self,
        from: NodeIndex,
        to: NodeIndex,
        ptr: NonNull<u8>,
        out: &mut Vec<NonNull<u8>>,
    ) {
        if from == to {
            out.push(ptr);
            return;
        }
        for (base, edge) in self.edges(from, Direction::Outgoing) {
            if has_path_connecting(&self.graph, base, to, None) {
                // SAFETY: the edge maps a live `from` object to its live base.
                unsafe { self.walk_all(base, to, (edge.up)(ptr), out) };
            }
        }
    }

    // ========================================================================
    // Casting
    // ========================================================================

    /// Cast the object at `ptr` from `static_type` to `target`.
    ///
    /// `dynamic` is the object's [`ClassInfo`] when the caller only holds
    /// shared access to it, which allows downcasts confirmed by the dynamic
    /// type. Returns `None` when no path exists or the dynamic type does not
    /// confirm a downcast. Mutable casts only follow edges with a mutable
    /// accessor and never go through the dynamic type, since the caller's
    /// unique borrow covers the object alone and not the enclosing
    /// most-derived object.
    ///
    /// # Safety
    ///
    /// `ptr` must address a live value of `static_type` that reported
    /// `dynamic`, valid for writes if `mutable` is set.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub unsafe fn cast_raw(
        &self,
        static_type: TypeId,
        ptr: NonNull<u8>,
        dynamic: Option<ClassInfo>,
        target: TypeId,
        mutable: bool,
    ) -> Option<NonNull<u8>> {
        if target == static_type {
            return Some(ptr);
        }
        let to = self.find(target)?;

        if let Some(from) = self.find(static_type) {
            // SAFETY: forwarded from the caller.
            if let Some(found) = unsafe { self.walk(from, to, ptr, mutable) } {
                trace!(from = %static_type, to = %target, "upcast");
                return Some(found);
            }
        }

        let Some(info) = dynamic.filter(|info| info.is_tagged() && !mutable) else {
            trace!(from = %static_type, to = %target, mutable, "no cast path");
            return None;
        };

        let dynamic = self.find(info.type_id())?;
        let from = self.find(static_type)?;
        let mut reachable = Vec::new();
        // SAFETY: a tagged `ClassInfo` addresses the live most-derived object
        // the value sits in, through a pointer that covers all of it.
        unsafe { self.walk_all(dynamic, from, info.address(), &mut reachable) };
        if !reachable.contains(&ptr) {
            trace!(
                from = %static_type,
                dynamic = %info.type_id(),
                to = %target,
                "dynamic type does not confirm the cast"
            );
            return None;
        }

        // SAFETY: as above.
        let found = unsafe { self.walk(dynamic, to, info.address(), false) };
        trace!(
            from = %static_type,
            dynamic = %info.type_id(),
            to = %target,
            found = found.is_some(),
            "cast through dynamic type"
        );
        found
    }

    /// Whether a read-only cast from `static_type` to `target` has a path,
    /// statically or through the dynamic type. Nothing is dereferenced.
    fn has_read_path(&self, static_type: TypeId, info: ClassInfo, target: TypeId) -> bool {
        if self.inherits_from(static_type, target) {
            return true;
        }
        info.is_tagged()
            && self.inherits_from(info.type_id(), static_type)
            && self.inherits_from(info.type_id(), target)
    }

    /// Cast `object` to `U`, or `None` when the cast is not possible.
    pub fn cast_ptr<'o, T: Reflect, U: Reflect>(&self, object: &'o T) -> Option<&'o U> {
        let ptr = NonNull::from(object).cast::<u8>();
        // SAFETY: `ptr` addresses `object`, shared for `'o`, which reported
        // its own class info.
        let found = unsafe {
            self.cast_raw(
                type_id::<T>(),
                ptr,
                Some(ClassInfo::of(object)),
                type_id::<U>(),
                false,
            )
        }?;
        // SAFETY: the path ends at a `U` owned by (or shared with) `object`.
        Some(unsafe { found.cast::<U>().as_ref() })
    }

    /// Cast `object` to `U`, failing with [`CastError::BadMetaCast`].
    pub fn cast_ref<'o, T: Reflect, U: Reflect>(&self, object: &'o T) -> Result<&'o U, CastError> {
        self.cast_ptr(object).ok_or_else(|| bad_cast::<T, U>())
    }

    /// Cast `object` mutably to `U`.
    ///
    /// Fails with [`CastError::ImmutablePath`] when `U` is reachable only
    /// through a shared base or only as a downcast through the dynamic type.
    pub fn cast_mut<'o, T: Reflect, U: Reflect>(
        &self,
        object: &'o mut T,
    ) -> Result<&'o mut U, CastError> {
        let info = ClassInfo::of(&*object);
        let ptr = NonNull::from(&mut *object).cast::<u8>();
        // SAFETY: `ptr` is the uniquely borrowed `object`.
        match unsafe { self.cast_raw(type_id::<T>(), ptr, None, type_id::<U>(), true) } {
            // SAFETY: the path ends at a `U` inside `object`, borrowed for `'o`.
            Some(found) => Ok(unsafe { found.cast::<U>().as_mut() }),
            None if self.has_read_path(type_id::<T>(), info, type_id::<U>()) => {
                Err(CastError::ImmutablePath {
                    from: T::type_name().to_string(),
                    to: U::type_name().to_string(),
                })
            }
            None => Err(bad_cast::<T, U>()),
        }
    }

    /// The dynamic type `value` may be cast through.
    ///
    /// Only read-only variants qualify. A writable alias holds the unique
    /// borrow of its object, which the enclosing object must not overlap.
    pub fn dynamic_info(value: &Variant<'_>) -> Option<ClassInfo> {
        value.class_info().filter(|_| value.is_read_only())
    }

    /// Address of the payload of `value` seen as `target`.
    pub fn variant_ptr(&self, value: &Variant<'_>, target: TypeId) -> Option<NonNull<u8>> {
        let ptr = value.payload_ptr()?;
        // SAFETY: a variant's payload is a live value of its stored type,
        // shared through `value` when it is read-only.
        unsafe { self.cast_raw(value.type_id(), ptr, Self::dynamic_info(value), target, false) }
    }

    /// Writable address of the payload of `value` seen as `target`.
    ///
    /// `None` for read-only variants, for targets behind shared bases and for
    /// downcasts through the dynamic type.
    pub fn variant_mut_ptr(&self, value: &mut Variant<'_>, target: TypeId) -> Option<NonNull<u8>> {
        let static_type = value.type_id();
        let ptr = value.payload_mut_ptr()?;
        // SAFETY: a writable variant payload is a live value of its stored
        // type, uniquely borrowed through `value`.
        unsafe { self.cast_raw(static_type, ptr, None, target, true) }
    }
}

impl fmt::Debug for ClassGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassGraph")
            .field("classes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

fn bad_cast<T: Reflect, U: Reflect>() -> CastError {
    CastError::BadMetaCast {
        from: T::type_name().to_string(),
        to: U::type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use introspect_core::DynamicType;
    use std::mem::offset_of;
    use std::rc::Rc;

    macro_rules! reflect {
        ($($ty:ident),* $(,)?) => {
            $(
                impl Reflect for $ty {
                    fn type_name() -> &'static str {
                        concat!("class_graph::", stringify!($ty))
                    }
                }
            )*
        };
    }

    // === Single inheritance: A <- B <- C ===

    struct A {
        a: i32,
    }

    struct B {
        base: A,
        b: i32,
    }

    struct C {
        base: B,
        c: i32,
    }

    struct Unrelated;

    reflect!(A, B, C, Unrelated);

    fn chain() -> ClassGraph {
        let mut graph = ClassGraph::new();
        graph
            .add_base(
                type_id::<B>(),
                type_id::<A>(),
                CastEdge::new(|b: &B| &b.base, |b: &mut B| &mut b.base),
            )
            .unwrap();
        graph
            .add_base(
                type_id::<C>(),
                type_id::<B>(),
                CastEdge::new(|c: &C| &c.base, |c: &mut C| &mut c.base),
            )
            .unwrap();
        graph
    }

    fn make_c() -> C {
        C {
            base: B {
                base: A { a: 1 },
                b: 2,
            },
            c: 3,
        }
    }

    #[test]
    fn upcast_through_chain() {
        let graph = chain();
        let c = make_c();

        assert_eq!(graph.cast_ptr::<C, C>(&c).unwrap().c, 3);
        assert_eq!(graph.cast_ptr::<C, B>(&c).unwrap().b, 2);
        assert_eq!(graph.cast_ptr::<C, A>(&c).unwrap().a, 1);
        assert!(graph.cast_ptr::<C, Unrelated>(&c).is_none());
        assert!(matches!(
            graph.cast_ref::<C, Unrelated>(&c),
            Err(CastError::BadMetaCast { .. })
        ));
    }

    #[test]
    fn mutable_upcast_writes_through() {
        let graph = chain();
        let mut c = make_c();
        graph.cast_mut::<C, A>(&mut c).unwrap().a = 10;
        assert_eq!(c.base.base.a, 10);
    }

    #[test]
    fn static_downcast_without_dynamic_type_fails() {
        let graph = chain();
        let b = B {
            base: A { a: 1 },
            b: 2,
        };
        assert!(graph.cast_ptr::<B, C>(&b).is_none());
    }

    #[test]
    fn inheritance_queries() {
        let graph = chain();
        assert!(graph.inherits_from(type_id::<C>(), type_id::<A>()));
        assert!(graph.inherits_from(type_id::<C>(), type_id::<C>()));
        assert!(!graph.inherits_from(type_id::<A>(), type_id::<C>()));
        assert_eq!(graph.bases(type_id::<C>()), vec![type_id::<B>()]);
        assert_eq!(graph.derived(type_id::<A>()), vec![type_id::<B>()]);
        assert!(graph.bases(type_id::<Unrelated>()).is_empty());
    }

    fn never(_: &A) -> &C {
        unreachable!("edge is rejected before use")
    }

    #[test]
    fn rejects_bad_edges() {
        let mut graph = chain();
        let err = graph
            .add_base(
                type_id::<A>(),
                type_id::<A>(),
                CastEdge::shared(|a: &A| a),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::SelfInheritance(_)));

        let err = graph
            .add_base(
                type_id::<C>(),
                type_id::<B>(),
                CastEdge::shared(|c: &C| &c.base),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate { .. }));

        let err = graph
            .add_base(
                type_id::<A>(),
                type_id::<C>(),
                CastEdge::shared(never),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::CircularInheritance { .. }));
        assert_eq!(graph.edge_count(), 2);
    }

    // === Multiple inheritance: E : D, C ===

    struct D {
        d: i32,
    }

    struct E {
        d: D,
        c: C,
        e: i32,
    }

    reflect!(D, E);

    #[test]
    fn multiple_inheritance() {
        let mut graph = chain();
        graph
            .add_base(
                type_id::<E>(),
                type_id::<D>(),
                CastEdge::new(|e: &E| &e.d, |e: &mut E| &mut e.d),
            )
            .unwrap();
        graph
            .add_base(
                type_id::<E>(),
                type_id::<C>(),
                CastEdge::new(|e: &E| &e.c, |e: &mut E| &mut e.c),
            )
            .unwrap();

        let e = E {
            d: D { d: 4 },
            c: make_c(),
            e: 5,
        };
        assert_eq!(graph.cast_ptr::<E, E>(&e).unwrap().e, 5);
        assert_eq!(graph.cast_ptr::<E, D>(&e).unwrap().d, 4);
        assert_eq!(graph.cast_ptr::<E, C>(&e).unwrap().c, 3);
        assert_eq!(graph.cast_ptr::<E, B>(&e).unwrap().b, 2);
        assert_eq!(graph.cast_ptr::<E, A>(&e).unwrap().a, 1);
        assert_eq!(
            graph.bases(type_id::<E>()),
            vec![type_id::<D>(), type_id::<C>()]
        );
    }

    // === Virtual inheritance: VB1, VB2 share one Base ===

    struct Base {
        value: i32,
    }

    struct VB1 {
        base: Rc<Base>,
        one: i32,
    }

    struct VB2 {
        base: Rc<Base>,
        two: i32,
    }

    struct VC {
        vb1: VB1,
        vb2: VB2,
    }

    reflect!(Base, VB1, VB2, VC);

    fn diamond() -> ClassGraph {
        let mut graph = ClassGraph::new();
        graph
            .add_base(
                type_id::<VB1>(),
                type_id::<Base>(),
                CastEdge::shared(|v: &VB1| &*v.base),
            )
            .unwrap();
        graph
            .add_base(
                type_id::<VB2>(),
                type_id::<Base>(),
                CastEdge::shared(|v: &VB2| &*v.base),
            )
            .unwrap();
        graph
            .add_base(
                type_id::<VC>(),
                type_id::<VB1>(),
                CastEdge::new(|v: &VC| &v.vb1, |v: &mut VC| &mut v.vb1),
            )
            .unwrap();
        graph
            .add_base(
                type_id::<VC>(),
                type_id::<VB2>(),
                CastEdge::new(|v: &VC| &v.vb2, |v: &mut VC| &mut v.vb2),
            )
            .unwrap();
        graph
    }

    #[test]
    fn virtual_diamond() {
        let graph = diamond();
        let shared = Rc::new(Base { value: 9 });
        let mut vc = VC {
            vb1: VB1 {
                base: Rc::clone(&shared),
                one: 1,
            },
            vb2: VB2 {
                base: Rc::clone(&shared),
                two: 2,
            },
        };

        let vb1 = graph.cast_ptr::<VC, VB1>(&vc).unwrap();
        let vb2 = graph.cast_ptr::<VC, VB2>(&vc).unwrap();
        assert_eq!(vb1.one, 1);
        assert_eq!(vb2.two, 2);
        assert_ne!(
            NonNull::from(vb1).cast::<u8>(),
            NonNull::from(vb2).cast::<u8>()
        );

        let base = graph.cast_ptr::<VC, Base>(&vc).unwrap();
        assert_eq!(base.value, 9);
        assert!(std::ptr::eq(base, &*shared));
        assert!(std::ptr::eq(graph.cast_ptr::<VB2, Base>(&vc.vb2).unwrap(), base));

        assert!(matches!(
            graph.cast_mut::<VC, Base>(&mut vc),
            Err(CastError::ImmutablePath { .. })
        ));
        graph.cast_mut::<VC, VB2>(&mut vc).unwrap().two = 20;
        assert_eq!(vc.vb2.two, 20);
    }

    // === Downcasts confirmed by the dynamic type ===

    struct Node {
        dynamic: DynamicType,
        id: u32,
    }

    impl Reflect for Node {
        fn type_name() -> &'static str {
            "class_graph::Node"
        }

        fn dynamic_type(&self) -> Option<&DynamicType> {
            Some(&self.dynamic)
        }
    }

    struct Leaf {
        tag: u64,
        node: Node,
    }

    struct Branch {
        node: Node,
    }

    reflect!(Leaf, Branch);

    fn node_graph() -> ClassGraph {
        let mut graph = ClassGraph::new();
        graph
            .add_base(
                type_id::<Leaf>(),
                type_id::<Node>(),
                CastEdge::new(|l: &Leaf| &l.node, |l: &mut Leaf| &mut l.node),
            )
            .unwrap();
        graph
            .add_base(
                type_id::<Branch>(),
                type_id::<Node>(),
                CastEdge::new(|b: &Branch| &b.node, |b: &mut Branch| &mut b.node),
            )
            .unwrap();
        graph
    }

    /// A heap `Leaf` reached only through the returned pointer, with its
    /// `Node` tagged. Release it with [`free`].
    fn make_leaf() -> NonNull<Leaf> {
        let leaf = NonNull::from(Box::leak(Box::new(Leaf {
            tag: 77,
            node: Node {
                dynamic: DynamicType::none(),
                id: 5,
            },
        })));
        unsafe {
            (*leaf.as_ptr()).node.dynamic = DynamicType::within(leaf, offset_of!(Leaf, node));
        }
        leaf
    }

    fn free<T>(object: NonNull<T>) {
        drop(unsafe { Box::from_raw(object.as_ptr()) });
    }

    #[test]
    fn downcast_to_dynamic_type() {
        let graph = node_graph();
        let leaf = make_leaf();
        let node: &Node = unsafe { &leaf.as_ref().node };

        let back = graph.cast_ptr::<Node, Leaf>(node).unwrap();
        assert_eq!(back.tag, 77);
        assert!(std::ptr::eq(back, leaf.as_ptr()));
        assert!(graph.cast_ptr::<Node, Branch>(node).is_none());
        assert_eq!(graph.cast_ptr::<Node, Node>(node).unwrap().id, 5);
        free(leaf);
    }

    #[test]
    fn downcasts_are_read_only() {
        let graph = node_graph();
        let leaf = make_leaf();
        let node: &mut Node = unsafe { &mut (*leaf.as_ptr()).node };

        assert!(matches!(
            graph.cast_mut::<Node, Leaf>(node),
            Err(CastError::ImmutablePath { .. })
        ));
        graph.cast_mut::<Node, Node>(node).unwrap().id = 6;
        assert_eq!(node.id, 6);
        free(leaf);
    }

    #[test]
    fn downcast_through_variant() {
        let graph = node_graph();
        let leaf = make_leaf();

        // A writable alias holds the unique borrow of the node alone.
        let mut value = Variant::alias_mut(unsafe { &mut (*leaf.as_ptr()).node });
        assert!(graph.variant_ptr(&value, type_id::<Leaf>()).is_none());
        assert!(graph.variant_mut_ptr(&mut value, type_id::<Leaf>()).is_none());
        assert!(graph.variant_mut_ptr(&mut value, type_id::<Node>()).is_some());
        assert!(ClassGraph::dynamic_info(&value).is_none());
        drop(value);

        let value = Variant::alias(unsafe { &leaf.as_ref().node });
        let info = ClassGraph::dynamic_info(&value).unwrap();
        assert_eq!(info.type_id(), type_id::<Leaf>());
        let ptr = graph.variant_ptr(&value, type_id::<Leaf>()).unwrap();
        assert_eq!(unsafe { ptr.cast::<Leaf>().as_ref() }.tag, 77);
        assert!(graph.variant_ptr(&value, type_id::<Branch>()).is_none());
        assert!(graph.variant_ptr(&value, type_id::<Node>()).is_some());
        drop(value);
        free(leaf);
    }

    /// Claims to live inside a `Host` it was never placed in.
    struct Stray {
        dynamic: DynamicType,
        id: u32,
    }

    impl Reflect for Stray {
        fn type_name() -> &'static str {
            "class_graph::Stray"
        }

        fn dynamic_type(&self) -> Option<&DynamicType> {
            Some(&self.dynamic)
        }
    }

    struct Host {
        secret: u64,
        stray: Stray,
    }

    reflect!(Host);

    #[test]
    fn tags_are_only_honoured_in_place() {
        let mut graph = ClassGraph::new();
        graph
            .add_base(
                type_id::<Host>(),
                type_id::<Stray>(),
                CastEdge::new(|h: &Host| &h.stray, |h: &mut Host| &mut h.stray),
            )
            .unwrap();

        // A tag moved out of its host no longer matches the stray's address.
        let host = NonNull::from(Box::leak(Box::new(Host {
            secret: 0x25,
            stray: Stray {
                dynamic: DynamicType::none(),
                id: 1,
            },
        })));
        unsafe {
            (*host.as_ptr()).stray.dynamic = DynamicType::within(host, offset_of!(Host, stray));
        }
        let moved = Box::new(Stray {
            dynamic: std::mem::take(unsafe { &mut (*host.as_ptr()).stray.dynamic }),
            id: 2,
        });
        assert!(graph.cast_ptr::<Stray, Host>(&moved).is_none());
        assert_eq!(ClassInfo::of(&*moved).type_id(), type_id::<Stray>());
        assert_eq!(unsafe { host.as_ref() }.secret, 0x25);
        free(host);

        // A stray that never had a tag is only itself.
        let alone = Stray {
            dynamic: DynamicType::none(),
            id: 3,
        };
        assert!(graph.cast_ptr::<Stray, Host>(&alone).is_none());
        assert_eq!(graph.cast_ptr::<Stray, Stray>(&alone).unwrap().id, 3);
        assert_eq!(moved.id, 2);
    }

    #[test]
    fn untagged_sub_object_is_only_its_static_type() {
        let graph = node_graph();
        let node = Node {
            dynamic: DynamicType::none(),
            id: 3,
        };
        assert_eq!(graph.cast_ptr::<Node, Node>(&node).unwrap().id, 3);
        assert!(graph.cast_ptr::<Node, Leaf>(&node).is_none());
    }

    #[test]
    fn unregistered_classes_cast_to_themselves() {
        let graph = ClassGraph::new();
        let u = Unrelated;
        assert!(graph.cast_ptr::<Unrelated, Unrelated>(&u).is_some());
        assert!(graph.cast_ptr::<Unrelated, A>(&u).is_none());
    }
}
