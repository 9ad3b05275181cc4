//! Registry - the reflection database.
//!
//! This module provides [`Registry`], the central storage for everything
//! registered through the builders: classes (with their cast graph),
//! free functions, global properties and enumerations.
//!
//! # Storage Model
//!
//! - **Classes**: `ClassEntry` by [`TypeId`], plus registration order. Names
//!   live in the namespace tree, inheritance in the [`ClassGraph`].
//! - **Functions, global properties, enums**: stored in the namespace tree,
//!   resolved by qualified name (`a::b::name`).
//!
//! # Thread Safety
//!
//! Registration needs `&mut Registry` and therefore happens on one thread.
//! Afterwards every query, call and cast takes `&self`, so a finished
//! registry can be shared (e.g. behind an `Arc`) and read concurrently.
//!
//! # Example
//!
//! ```
//! use introspect_core::{Argument, Reflect};
//! use introspect_registry::Registry;
//!
//! let mut registry = Registry::new();
//! registry
//!     .namespace("math")
//!     .function("add", |a: i32, b: i32| a + b)?;
//!
//! let sum = registry.invoke("math::add", vec![Argument::value(2i32), Argument::value(40i32)])?;
//! assert_eq!(sum.get::<i32>()?, &42);
//! # Ok::<(), introspect_core::ReflectError>(())
//! ```

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::debug;

use introspect_core::{
    Argument, CastError, InvokeError, LookupError, Reflect, RegistrationError, Result, SymbolKind,
    TypeId, Variant, type_id,
};

use crate::builder::{ClassBuilder, EnumBuilder, NamespaceBuilder};
use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::entries::{ClassEntry, EnumEntry, FunctionEntry, PropertyEntry};
use crate::namespace_tree::{NamespaceTree, SEPARATOR, split_qualified};
use crate::{CastEdge, ClassGraph};

/// The reflection database.
#[derive(Default)]
pub struct Registry {
    config: RegistryConfig,
    pub(crate) tree: NamespaceTree,
    classes: FxHashMap<TypeId, ClassEntry>,
    /// Class ids in registration order.
    class_order: Vec<TypeId>,
    graph: ClassGraph,
}

impl Registry {
    /// Create an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with `config`.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The inheritance graph of all registered classes.
    pub fn graph(&self) -> &ClassGraph {
        &self.graph
    }

    /// The namespace tree holding every name.
    pub fn tree(&self) -> &NamespaceTree {
        &self.tree
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Start registering `T`, named after [`Reflect::type_name`].
    ///
    /// A type name such as `geo::Circle` registers class `Circle` in
    /// namespace `geo`.
    pub fn class<T: Reflect>(&mut self) -> ClassBuilder<'_, T> {
        self.class_named::<T>(T::type_name())
    }

    /// Start registering `T` under an explicit qualified name.
    pub fn class_named<T: Reflect>(&mut self, qualified_name: &str) -> ClassBuilder<'_, T> {
        let (path, name) = split_qualified(qualified_name);
        let namespace = path.into_iter().map(str::to_string).collect();
        ClassBuilder::new(self, namespace, name.to_string())
    }

    /// Register functions and globals in the namespace `path` (`a::b`).
    pub fn namespace(&mut self, path: &str) -> NamespaceBuilder<'_> {
        let path = path
            .trim_start_matches(SEPARATOR)
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        NamespaceBuilder::new(self, path)
    }

    /// Register functions and globals in the global namespace.
    pub fn global(&mut self) -> NamespaceBuilder<'_> {
        NamespaceBuilder::new(self, Vec::new())
    }

    /// Start registering an enumeration under `qualified_name`.
    pub fn enumeration(&mut self, qualified_name: &str) -> EnumBuilder<'_> {
        let (path, name) = split_qualified(qualified_name);
        let namespace = path.into_iter().map(str::to_string).collect();
        EnumBuilder::new(self, namespace, name.to_string())
    }

    /// Check a callable's parameter count against the configured ceiling.
    pub(crate) fn check_arity(&self, name: &str, arity: usize) -> Result<(), RegistrationError> {
        if arity > self.config.max_arity {
            return Err(RegistrationError::TooManyParameters {
                name: name.to_string(),
                arity,
                max: self.config.max_arity,
            });
        }
        Ok(())
    }

    /// Whether a registration of an existing symbol is to be dropped.
    ///
    /// Under [`DuplicatePolicy::Error`] this is always `false` and the
    /// duplicate is reported by the insertion itself.
    pub(crate) fn keeps_first(&self, exists: bool, kind: SymbolKind, name: &str) -> bool {
        if exists && self.config.duplicate_policy == DuplicatePolicy::Reuse {
            debug!(%kind, name, "duplicate registration ignored");
            return true;
        }
        false
    }

    pub(crate) fn insert_class(
        &mut self,
        mut entry: ClassEntry,
        edges: Vec<(TypeId, CastEdge)>,
    ) -> Result<TypeId, RegistrationError> {
        let type_id = entry.type_id;
        let exists = self.classes.contains_key(&type_id);
        if self.keeps_first(exists, SymbolKind::Class, &entry.qualified_name) {
            return Ok(type_id);
        }

        for (index, (base, _)) in edges.iter().enumerate() {
            self.graph.check_base(type_id, *base)?;
            if edges[..index].iter().any(|(seen, _)| seen == base) {
                return Err(RegistrationError::Duplicate {
                    kind: SymbolKind::Class,
                    name: format!("{} : {}", entry.qualified_name, base),
                });
            }
        }
        self.tree
            .register_class(&entry.namespace, &entry.name, type_id)?;

        for (base, edge) in edges {
            self.graph.add_base(type_id, base, edge)?;
            entry.bases.push(base);
        }
        debug!(
            name = %entry.qualified_name,
            id = %type_id,
            bases = entry.bases.len(),
            methods = entry.methods.len(),
            properties = entry.properties.len(),
            "registered class"
        );
        self.classes.insert(type_id, entry);
        self.class_order.push(type_id);
        Ok(type_id)
    }

    // ==========================================================================
    // Class Lookup
    // ==========================================================================

    pub fn class_by_id(&self, type_id: TypeId) -> Option<&ClassEntry> {
        self.classes.get(&type_id)
    }

    /// Look up a class by qualified name.
    pub fn class_by_name(&self, qualified_name: &str) -> Option<&ClassEntry> {
        let type_id = self.tree.resolve_class(qualified_name)?;
        self.classes.get(&type_id)
    }

    /// The registered class of `T`.
    pub fn class_for<T: Reflect>(&self) -> Option<&ClassEntry> {
        self.class_by_id(type_id::<T>())
    }

    /// Look up a class by qualified name, failing if it is not registered.
    pub fn resolve_class(&self, qualified_name: &str) -> Result<&ClassEntry, LookupError> {
        self.class_by_name(qualified_name)
            .ok_or_else(|| LookupError::not_found(SymbolKind::Class, qualified_name))
    }

    /// The class of the object in `value`.
    ///
    /// Read-only objects that report a registered dynamic type resolve to
    /// that class, everything else to the class of the stored type.
    pub fn class_of(&self, value: &Variant<'_>) -> Option<&ClassEntry> {
        self.classes.get(&self.dispatch_type(value))
    }

    fn dispatch_type(&self, value: &Variant<'_>) -> TypeId {
        match ClassGraph::dynamic_info(value) {
            Some(info) if self.classes.contains_key(&info.type_id()) => info.type_id(),
            _ => value.type_id(),
        }
    }

    /// All classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.class_order
            .iter()
            .filter_map(|type_id| self.classes.get(type_id))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// `class` followed by all of its bases, depth first in registration
    /// order, each class once.
    pub fn lineage(&self, class: TypeId) -> Vec<TypeId> {
        let mut order = Vec::new();
        let mut stack = vec![class];
        while let Some(current) = stack.pop() {
            if order.contains(&current) {
                continue;
            }
            order.push(current);
            stack.extend(self.graph.bases(current).into_iter().rev());
        }
        order
    }

    /// First method called `name` on `class` or one of its bases.
    pub fn find_method(&self, class: TypeId, name: &str) -> Option<&FunctionEntry> {
        self.lineage(class)
            .into_iter()
            .filter_map(|id| self.classes.get(&id))
            .find_map(|entry| entry.method(name))
    }

    /// First property called `name` on `class` or one of its bases.
    pub fn find_property(&self, class: TypeId, name: &str) -> Option<&PropertyEntry> {
        self.lineage(class)
            .into_iter()
            .filter_map(|id| self.classes.get(&id))
            .find_map(|entry| entry.property(name))
    }

    fn methods_named<'s>(
        &'s self,
        class: TypeId,
        name: &'s str,
    ) -> impl Iterator<Item = &'s FunctionEntry> {
        self.lineage(class)
            .into_iter()
            .filter_map(move |id| self.classes.get(&id))
            .flat_map(move |entry| entry.methods_named(name))
    }

    // ==========================================================================
    // Namespace Lookup
    // ==========================================================================

    /// All overloads of a free function.
    pub fn functions(&self, qualified_name: &str) -> &[FunctionEntry] {
        self.tree.resolve_functions(qualified_name)
    }

    /// The first overload of a free function.
    pub fn function(&self, qualified_name: &str) -> Result<&FunctionEntry, LookupError> {
        self.functions(qualified_name)
            .first()
            .ok_or_else(|| LookupError::not_found(SymbolKind::Function, qualified_name))
    }

    pub fn global_property(&self, qualified_name: &str) -> Option<&PropertyEntry> {
        self.tree.resolve_property(qualified_name)
    }

    pub fn find_enum(&self, qualified_name: &str) -> Option<&EnumEntry> {
        self.tree.resolve_enum(qualified_name)
    }

    /// Look up an enumeration, failing if it is not registered.
    pub fn resolve_enum(&self, qualified_name: &str) -> Result<&EnumEntry, LookupError> {
        self.find_enum(qualified_name)
            .ok_or_else(|| LookupError::not_found(SymbolKind::Enum, qualified_name))
    }

    /// Check whether the namespace `path` exists.
    pub fn has_namespace(&self, path: &str) -> bool {
        self.namespace_node(path).is_some()
    }

    /// Members of the namespace `path` in insertion order.
    pub fn members(&self, path: &str) -> Result<Vec<(&str, SymbolKind)>, LookupError> {
        self.namespace_node(path)
            .and_then(|node| self.tree.get_namespace(node))
            .map(|data| data.members().collect())
            .ok_or_else(|| LookupError::not_found(SymbolKind::Namespace, path))
    }

    fn namespace_node(&self, path: &str) -> Option<petgraph::graph::NodeIndex> {
        let segments: Vec<&str> = path
            .trim_start_matches(SEPARATOR)
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect();
        self.tree.get_path(&segments)
    }

    // ==========================================================================
    // Invocation
    // ==========================================================================

    /// Pick the candidate needing the fewest conversions, earliest first.
    ///
    /// Without a match, the first candidate's binding error is returned.
    fn select<'e>(
        &self,
        candidates: impl IntoIterator<Item = &'e FunctionEntry>,
        this: Option<&Argument<'_>>,
        args: &[Argument<'_>],
    ) -> Option<Result<&'e FunctionEntry, InvokeError>> {
        let mut best: Option<(usize, &'e FunctionEntry)> = None;
        let mut first_error = None;
        for candidate in candidates {
            match candidate.invoker.conversions(&self.graph, this, args) {
                Ok(0) => return Some(Ok(candidate)),
                Ok(cost) if best.is_none_or(|(lowest, _)| cost < lowest) => {
                    best = Some((cost, candidate));
                }
                Ok(_) => {}
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        match best {
            Some((_, entry)) => Some(Ok(entry)),
            None => first_error.map(Err),
        }
    }

    /// Call a free function by qualified name.
    pub fn invoke<'a>(&self, qualified_name: &str, args: Vec<Argument<'a>>) -> Result<Variant<'static>> {
        let entry = self
            .select(self.functions(qualified_name), None, &args)
            .ok_or_else(|| LookupError::not_found(SymbolKind::Function, qualified_name))??;
        Ok(entry.invoke(&self.graph, None, args)?)
    }

    /// Call the method `name` on the object in `this`.
    ///
    /// The object's class is searched first, then its bases.
    pub fn call<'a>(
        &self,
        this: Argument<'a>,
        name: &str,
        args: Vec<Argument<'a>>,
    ) -> Result<Variant<'static>> {
        let class = self.dispatch_type(this.variant());
        let candidates = self.methods_named(class, name).filter(|m| !m.is_static());
        let entry = self
            .select(candidates, Some(&this), &args)
            .ok_or_else(|| {
                LookupError::not_found(SymbolKind::Method, format!("{}::{}", this.type_name(), name))
            })??;
        Ok(entry.invoke(&self.graph, Some(this), args)?)
    }

    /// Call the static method `name` of a class.
    pub fn call_static<'a>(
        &self,
        class_name: &str,
        name: &str,
        args: Vec<Argument<'a>>,
    ) -> Result<Variant<'static>> {
        let class = self.resolve_class(class_name)?;
        let candidates = class.methods_named(name).filter(|m| m.is_static());
        let entry = self
            .select(candidates, None, &args)
            .ok_or_else(|| {
                LookupError::not_found(SymbolKind::Method, format!("{}::{}", class_name, name))
            })??;
        Ok(entry.invoke(&self.graph, None, args)?)
    }

    /// Construct an object of a class with the first matching constructor.
    pub fn construct<'a>(&self, class_name: &str, args: Vec<Argument<'a>>) -> Result<Variant<'static>> {
        let class = self.resolve_class(class_name)?;
        self.construct_entry(class, args)
    }

    /// Construct a `T` with the first matching constructor.
    pub fn construct_type<'a, T: Reflect>(&self, args: Vec<Argument<'a>>) -> Result<T> {
        let class = self
            .class_for::<T>()
            .ok_or_else(|| LookupError::not_found(SymbolKind::Class, T::type_name()))?;
        Ok(self.construct_entry(class, args)?.into_value::<T>()?)
    }

    fn construct_entry<'a>(&self, class: &ClassEntry, args: Vec<Argument<'a>>) -> Result<Variant<'static>> {
        let entry = match self.select(&class.constructors, None, &args) {
            Some(Ok(entry)) => entry,
            _ => {
                return Err(InvokeError::NoMatchingConstructor(class.qualified_name.clone()).into());
            }
        };
        Ok(entry.invoke(&self.graph, None, args)?)
    }

    // ==========================================================================
    // Properties
    // ==========================================================================

    fn object_property(&self, object: &Variant<'_>, name: &str) -> Result<&PropertyEntry, LookupError> {
        self.find_property(self.dispatch_type(object), name)
            .ok_or_else(|| {
                LookupError::not_found(
                    SymbolKind::Property,
                    format!("{}::{}", object.type_name(), name),
                )
            })
    }

    /// Read property `name` of the object in `object`.
    pub fn get_property(&self, object: &Variant<'_>, name: &str) -> Result<Variant<'static>> {
        let property = self.object_property(object, name)?;
        Ok(property.get(&self.graph, Some(object))?)
    }

    /// Write property `name` of the object in `object`.
    pub fn set_property(&self, object: &mut Variant<'_>, name: &str, value: Variant<'_>) -> Result<()> {
        let property = self.object_property(object, name)?;
        Ok(property.set(&self.graph, Some(object), value)?)
    }

    fn global_entry(&self, qualified_name: &str) -> Result<&PropertyEntry, LookupError> {
        self.global_property(qualified_name)
            .ok_or_else(|| LookupError::not_found(SymbolKind::Property, qualified_name))
    }

    /// Read a global property.
    pub fn get_global(&self, qualified_name: &str) -> Result<Variant<'static>> {
        Ok(self.global_entry(qualified_name)?.get(&self.graph, None)?)
    }

    /// Write a global property.
    pub fn set_global(&self, qualified_name: &str, value: Variant<'_>) -> Result<()> {
        Ok(self.global_entry(qualified_name)?.set(&self.graph, None, value)?)
    }

    // ==========================================================================
    // Casting
    // ==========================================================================

    /// Check whether `derived` is `base` or inherits from it.
    pub fn inherits_from(&self, derived: TypeId, base: TypeId) -> bool {
        self.graph.inherits_from(derived, base)
    }

    /// Direct bases of `class`, in registration order.
    pub fn base_classes(&self, class: TypeId) -> Vec<TypeId> {
        self.graph.bases(class)
    }

    /// Classes that name `class` as a direct base.
    pub fn derived_classes(&self, class: TypeId) -> Vec<TypeId> {
        self.graph.derived(class)
    }

    /// Cast `object` to `U`, or `None` when the cast is not possible.
    pub fn cast_ptr<'o, T: Reflect, U: Reflect>(&self, object: &'o T) -> Option<&'o U> {
        self.graph.cast_ptr(object)
    }

    /// Cast `object` to `U`, failing with [`CastError::BadMetaCast`].
    pub fn cast_ref<'o, T: Reflect, U: Reflect>(&self, object: &'o T) -> Result<&'o U, CastError> {
        self.graph.cast_ref(object)
    }

    /// Cast `object` mutably to `U`.
    pub fn cast_mut<'o, T: Reflect, U: Reflect>(&self, object: &'o mut T) -> Result<&'o mut U, CastError> {
        self.graph.cast_mut(object)
    }

    /// View the payload of `value` as a `U`, casting through the graph.
    pub fn cast_variant<'v, U: Reflect>(&self, value: &'v Variant<'_>) -> Result<&'v U, CastError> {
        match self.graph.variant_ptr(value, type_id::<U>()) {
            // SAFETY: the path ends at a `U` inside (or shared with) the
            // payload, which lives as long as the borrow of `value`.
            Some(ptr) => Ok(unsafe { ptr.cast::<U>().as_ref() }),
            None => Err(CastError::BadMetaCast {
                from: value.type_name().to_string(),
                to: U::type_name().to_string(),
            }),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("classes", &self.classes.len())
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    use introspect_core::{ParamType, ReflectError, Signature, VariantError};

    use crate::ReflectFields;

    // ==========================================================================
    // Fixtures
    // ==========================================================================

    #[derive(Debug, Clone, PartialEq)]
    struct Shape {
        sides: i32,
    }

    impl Reflect for Shape {
        fn type_name() -> &'static str {
            "geo::Shape"
        }

        fn clone_value(&self) -> Option<Self> {
            Some(self.clone())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Square {
        shape: Shape,
        len: f64,
    }

    impl Reflect for Square {
        fn type_name() -> &'static str {
            "geo::Square"
        }

        fn clone_value(&self) -> Option<Self> {
            Some(self.clone())
        }
    }

    impl AsRef<Shape> for Square {
        fn as_ref(&self) -> &Shape {
            &self.shape
        }
    }

    impl AsMut<Shape> for Square {
        fn as_mut(&mut self) -> &mut Shape {
            &mut self.shape
        }
    }

    fn shapes() -> Registry {
        let mut registry = Registry::new();
        registry
            .class::<Shape>()
            .constructor(|sides: i32| Shape { sides })
            .unwrap()
            .method("sides", |s: &Shape| s.sides)
            .unwrap()
            .method("describe", |s: &Shape| format!("{} sides", s.sides))
            .unwrap()
            .property("count", |s: &Shape| s.sides, |s: &mut Shape, v: i32| s.sides = v)
            .unwrap()
            .build()
            .unwrap();
        registry
            .class::<Square>()
            .base::<Shape>()
            .constructor(|len: f64| Square {
                shape: Shape { sides: 4 },
                len,
            })
            .unwrap()
            .method("area", |s: &Square| s.len * s.len)
            .unwrap()
            .method("grow", |s: &mut Square, by: f64| s.len += by)
            .unwrap()
            .method("describe", |s: &Square| format!("square {}", s.len))
            .unwrap()
            .readonly_property("len", |s: &Square| s.len)
            .unwrap()
            .static_method("unit", || Square {
                shape: Shape { sides: 4 },
                len: 1.0,
            })
            .unwrap()
            .build()
            .unwrap();
        registry
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    #[test]
    fn classes_are_named_after_their_type() {
        let registry = shapes();
        let square = registry.class_by_name("geo::Square").unwrap();
        assert_eq!(square.name, "Square");
        assert_eq!(square.namespace, vec!["geo"]);
        assert_eq!(square.bases, vec![type_id::<Shape>()]);
        assert!(registry.class_for::<Shape>().is_some());
        assert!(registry.class_by_name("Square").is_none());
        assert!(registry.resolve_class("geo::Circle").is_err());

        let names: Vec<_> = registry.classes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Shape", "Square"]);
        assert_eq!(
            registry.members("geo").unwrap(),
            vec![("Shape", SymbolKind::Class), ("Square", SymbolKind::Class)]
        );
    }

    #[test]
    fn duplicate_class_is_rejected() {
        let mut registry = shapes();
        let err = registry.class::<Shape>().build().unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Duplicate {
                kind: SymbolKind::Class,
                ..
            }
        ));
    }

    #[test]
    fn reuse_policy_keeps_the_first_class() {
        let config = RegistryConfig::new().with_duplicate_policy(DuplicatePolicy::Reuse);
        let mut registry = Registry::with_config(config);
        registry
            .class::<Shape>()
            .method("sides", |s: &Shape| s.sides)
            .unwrap()
            .method("sides", |s: &Shape| s.sides * 2)
            .unwrap()
            .build()
            .unwrap();
        registry
            .class::<Shape>()
            .method("other", |s: &Shape| s.sides)
            .unwrap()
            .build()
            .unwrap();

        let class = registry.class_for::<Shape>().unwrap();
        assert_eq!(class.methods.len(), 1);
        let sides = registry
            .call(Argument::value(Shape { sides: 3 }), "sides", vec![])
            .unwrap();
        assert_eq!(sides.get::<i32>().unwrap(), &3);
    }

    #[test]
    fn bad_bases_leave_no_trace() {
        let mut registry = Registry::new();
        let err = registry
            .class::<Shape>()
            .base_with::<Shape, _, _>(|s: &Shape| s, |s: &mut Shape| s)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::SelfInheritance(_)));
        assert!(registry.class_for::<Shape>().is_none());
        assert_eq!(registry.graph().edge_count(), 0);

        let err = registry
            .class::<Square>()
            .base::<Shape>()
            .base::<Shape>()
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate { .. }));
        assert!(registry.class_by_name("geo::Square").is_none());
    }

    #[test]
    fn bases_may_be_registered_later() {
        let mut registry = Registry::new();
        registry.class::<Square>().base::<Shape>().build().unwrap();
        assert!(registry.class_for::<Shape>().is_none());
        registry
            .class::<Shape>()
            .method("sides", |s: &Shape| s.sides)
            .unwrap()
            .build()
            .unwrap();

        let square = Square {
            shape: Shape { sides: 4 },
            len: 1.0,
        };
        let sides = registry
            .call(Argument::constant(&square), "sides", vec![])
            .unwrap();
        assert_eq!(sides.to::<i32>().unwrap(), 4);

        // The entry borrows the registry, not the name it was looked up by.
        let found = {
            let name = String::from("sides");
            registry.find_method(type_id::<Square>(), &name)
        };
        assert_eq!(found.map(|m| m.name.as_str()), Some("sides"));
        assert!(registry.find_method(type_id::<Square>(), "corners").is_none());
    }

    #[test]
    fn arity_ceiling() {
        let mut registry = Registry::with_config(RegistryConfig::new().with_max_arity(1));
        let err = registry
            .global()
            .function("pair", |a: i32, b: i32| a + b)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RegistrationError::TooManyParameters { arity: 2, max: 1, .. }
        ));
    }

    #[test]
    fn invalid_names() {
        let mut registry = Registry::new();
        let err = registry.global().function("", || 1i32).err().unwrap();
        assert!(matches!(err, RegistrationError::InvalidName { .. }));
        let err = registry
            .class::<Shape>()
            .method("a::b", |s: &Shape| s.sides)
            .err()
            .unwrap();
        assert!(matches!(err, RegistrationError::InvalidName { .. }));
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    #[test]
    fn call_methods_and_inherited_methods() {
        let registry = shapes();
        let mut square = Square {
            shape: Shape { sides: 4 },
            len: 3.0,
        };

        let area = registry
            .call(Argument::constant(&square), "area", vec![])
            .unwrap();
        assert_eq!(area.get::<f64>().unwrap(), &9.0);

        let sides = registry
            .call(Argument::constant(&square), "sides", vec![])
            .unwrap();
        assert_eq!(sides.get::<i32>().unwrap(), &4);

        registry
            .call(Argument::lvalue(&mut square), "grow", vec![Argument::value(1.0f64)])
            .unwrap();
        assert_eq!(square.len, 4.0);

        let err = registry
            .call(Argument::constant(&square), "grow", vec![Argument::value(1.0f64)])
            .unwrap_err();
        assert!(matches!(err, ReflectError::Invoke(InvokeError::ConstThis(_))));

        let err = registry
            .call(Argument::constant(&square), "fly", vec![])
            .unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn derived_methods_shadow_base_methods() {
        let registry = shapes();
        let square = Square {
            shape: Shape { sides: 4 },
            len: 2.0,
        };
        let text = registry
            .call(Argument::constant(&square), "describe", vec![])
            .unwrap();
        assert_eq!(text.get::<String>().unwrap(), "square 2");

        let text = registry
            .call(Argument::constant(&square.shape), "describe", vec![])
            .unwrap();
        assert_eq!(text.get::<String>().unwrap(), "4 sides");
    }

    #[test]
    fn static_methods_and_constructors() {
        let registry = shapes();
        let unit = registry.call_static("geo::Square", "unit", vec![]).unwrap();
        assert_eq!(unit.get::<Square>().unwrap().len, 1.0);
        assert!(registry.call_static("geo::Square", "area", vec![]).is_err());

        let shape = registry
            .construct("geo::Shape", vec![Argument::value(5i32)])
            .unwrap();
        assert_eq!(shape.get::<Shape>().unwrap().sides, 5);

        let square: Square = registry.construct_type(vec![Argument::value(2.5f64)]).unwrap();
        assert_eq!(square.len, 2.5);

        let err = registry.construct("geo::Shape", vec![]).unwrap_err();
        assert!(matches!(
            err,
            ReflectError::Invoke(InvokeError::NoMatchingConstructor(_))
        ));
    }

    #[test]
    fn overloads_pick_the_closest_candidate() {
        let mut registry = Registry::new();
        registry
            .namespace("fmt")
            .function("show", |v: i32| format!("int {}", v))
            .unwrap()
            .function("show", |v: bool| format!("bool {}", v))
            .unwrap();

        let text = registry
            .invoke("fmt::show", vec![Argument::value(true)])
            .unwrap();
        assert_eq!(text.get::<String>().unwrap(), "bool true");

        let text = registry
            .invoke("fmt::show", vec![Argument::value(7i32)])
            .unwrap();
        assert_eq!(text.get::<String>().unwrap(), "int 7");

        let err = registry.invoke("fmt::show", vec![]).unwrap_err();
        assert!(matches!(
            err,
            ReflectError::Invoke(InvokeError::ArityMismatch { .. })
        ));
        assert!(registry.invoke("fmt::hide", vec![]).unwrap_err().is_lookup());
        assert_eq!(registry.functions("fmt::show").len(), 2);
    }

    #[test]
    fn explicit_signatures() {
        let mut registry = Registry::new();
        registry
            .global()
            .function_with(
                "set_flag",
                Signature::new()
                    .param(ParamType::value::<i32>())
                    .param(ParamType::mut_ref::<bool>()),
                |args| {
                    let number = args.take::<i32>(0)?;
                    *args.get_mut::<bool>(1)? = number > 100;
                    Ok(Variant::empty())
                },
            )
            .unwrap();

        let mut flag = false;
        registry
            .invoke(
                "set_flag",
                vec![Argument::value(123i32), Argument::lvalue(&mut flag)],
            )
            .unwrap();
        assert!(flag);

        let err = registry
            .invoke("set_flag", vec![Argument::value(1i32), Argument::value(true)])
            .unwrap_err();
        assert!(matches!(
            err,
            ReflectError::Invoke(InvokeError::Unbindable { index: 1, .. })
        ));
    }

    // ==========================================================================
    // Properties
    // ==========================================================================

    #[test]
    fn object_properties() {
        let registry = shapes();
        let mut square = Variant::new(Square {
            shape: Shape { sides: 4 },
            len: 2.0,
        });

        let len = registry.get_property(&square, "len").unwrap();
        assert_eq!(len.get::<f64>().unwrap(), &2.0);
        let mut len = len;
        assert!(matches!(len.get_mut::<f64>(), Err(VariantError::ReadOnly(_))));
        assert_eq!(len.to::<f64>().unwrap(), 2.0);

        let err = registry
            .set_property(&mut square, "len", Variant::new(3.0f64))
            .unwrap_err();
        assert!(matches!(
            err,
            ReflectError::Invoke(InvokeError::ReadOnlyProperty(_))
        ));

        registry
            .set_property(&mut square, "count", Variant::new(5i32))
            .unwrap();
        assert_eq!(square.get::<Square>().unwrap().shape.sides, 5);
        let count = registry.get_property(&square, "count").unwrap();
        assert_eq!(count.get::<i32>().unwrap(), &5);

        assert!(registry.get_property(&square, "depth").unwrap_err().is_lookup());
    }

    #[test]
    fn global_properties() {
        static VOLUME: AtomicI32 = AtomicI32::new(3);

        let mut registry = Registry::new();
        registry
            .namespace("audio")
            .property(
                "volume",
                || VOLUME.load(Ordering::SeqCst),
                |v: i32| VOLUME.store(v, Ordering::SeqCst),
            )
            .unwrap()
            .attribute("unit", "percent")
            .unwrap()
            .readonly_property("channels", || 2i32)
            .unwrap();

        assert_eq!(registry.get_global("audio::volume").unwrap().get::<i32>().unwrap(), &3);
        registry
            .set_global("audio::volume", Variant::new(9i32))
            .unwrap();
        assert_eq!(VOLUME.load(Ordering::SeqCst), 9);
        assert!(registry.set_global("audio::channels", Variant::new(1i32)).is_err());
        assert!(registry.get_global("audio::missing").unwrap_err().is_lookup());

        let volume = registry.global_property("audio::volume").unwrap();
        assert_eq!(volume.attributes.get("unit"), Some("percent"));
    }

    // ==========================================================================
    // Metadata
    // ==========================================================================

    #[test]
    fn attributes_follow_the_last_member() {
        let mut registry = Registry::new();
        registry
            .class::<Shape>()
            .attribute("kind", "value")
            .unwrap()
            .method("sides", |s: &Shape| s.sides)
            .unwrap()
            .attribute("pure", "true")
            .unwrap()
            .class_attribute("doc", "a polygon")
            .unwrap()
            .build()
            .unwrap();

        let class = registry.class_for::<Shape>().unwrap();
        assert_eq!(class.attributes.get("kind"), Some("value"));
        assert_eq!(class.attributes.get("doc"), Some("a polygon"));
        assert_eq!(class.method("sides").unwrap().attributes.get("pure"), Some("true"));

        let err = registry.global().attribute("k", "v").err().unwrap();
        assert!(matches!(err, RegistrationError::InvalidName { .. }));
    }

    #[test]
    fn enumerations() {
        let mut registry = Registry::new();
        registry
            .enumeration("gfx::Color")
            .value("Red", 0)
            .unwrap()
            .value("Green", 1)
            .unwrap()
            .attribute("flags", "false")
            .unwrap()
            .build()
            .unwrap();

        let color = registry.resolve_enum("gfx::Color").unwrap();
        assert_eq!(color.get_value("Green"), Some(1));
        assert_eq!(color.get_name(0), Some("Red"));
        assert!(registry.find_enum("gfx::Shade").is_none());
        assert!(registry.resolve_enum("gfx::Shade").is_err());

        let err = registry.enumeration("gfx::Color").build().unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate { .. }));
    }

    #[test]
    fn registered_fields() {
        struct Point {
            x: i32,
            y: i32,
        }

        impl Reflect for Point {
            fn type_name() -> &'static str {
                "registry::Point"
            }
        }

        impl ReflectFields for Point {
            fn register_fields<'r>(
                builder: ClassBuilder<'r, Self>,
            ) -> Result<ClassBuilder<'r, Self>, RegistrationError> {
                builder
                    .property("x", |p: &Point| p.x, |p: &mut Point, v: i32| p.x = v)?
                    .readonly_property("y", |p: &Point| p.y)
            }
        }

        let mut registry = Registry::new();
        registry.class::<Point>().fields().unwrap().build().unwrap();

        let mut point = Variant::new(Point { x: 1, y: 2 });
        registry
            .set_property(&mut point, "x", Variant::new(10i32))
            .unwrap();
        assert_eq!(point.get::<Point>().unwrap().x, 10);
        assert_eq!(registry.get_property(&point, "y").unwrap().to::<i32>().unwrap(), 2);
        assert!(registry.set_property(&mut point, "y", Variant::new(0i32)).is_err());
    }

    // ==========================================================================
    // Casting
    // ==========================================================================

    #[test]
    fn casting_through_the_registry() {
        let registry = shapes();
        let mut square = Square {
            shape: Shape { sides: 4 },
            len: 1.5,
        };

        assert!(registry.inherits_from(type_id::<Square>(), type_id::<Shape>()));
        assert!(!registry.inherits_from(type_id::<Shape>(), type_id::<Square>()));
        assert_eq!(registry.base_classes(type_id::<Square>()), vec![type_id::<Shape>()]);
        assert_eq!(registry.derived_classes(type_id::<Shape>()), vec![type_id::<Square>()]);

        assert_eq!(registry.cast_ptr::<Square, Shape>(&square).unwrap().sides, 4);
        assert!(registry.cast_ptr::<Shape, Square>(&square.shape).is_none());
        assert!(registry.cast_ref::<Shape, Square>(&square.shape).is_err());
        registry.cast_mut::<Square, Shape>(&mut square).unwrap().sides = 6;
        assert_eq!(square.shape.sides, 6);

        let value = Variant::new(square);
        assert_eq!(registry.cast_variant::<Shape>(&value).unwrap().sides, 6);
        assert!(registry.cast_variant::<String>(&value).is_err());
    }
}
