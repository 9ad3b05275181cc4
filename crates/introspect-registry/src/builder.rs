//! Registration builders.
//!
//! Builders provide the fluent registration API on top of [`Registry`]:
//!
//! - [`ClassBuilder`] collects bases, constructors, methods and properties and
//!   commits them in [`ClassBuilder::build`]
//! - [`NamespaceBuilder`] registers free functions and global properties
//!   directly into a namespace
//! - [`EnumBuilder`] collects enumerators and commits them in
//!   [`EnumBuilder::build`]
//!
//! Steps that can fail return `Result<Self, RegistrationError>` so chains read
//! with `?`.
//!
//! # Example
//!
//! ```
//! use introspect_core::Reflect;
//! use introspect_registry::Registry;
//!
//! struct Counter { hits: i32 }
//!
//! impl Reflect for Counter {
//!     fn type_name() -> &'static str { "demo::Counter" }
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .class::<Counter>()
//!     .constructor(|hits: i32| Counter { hits })?
//!     .method("hits", |c: &Counter| c.hits)?
//!     .method("bump", |c: &mut Counter, by: i32| c.hits += by)?
//!     .attribute("category", "demo")?
//!     .build()?;
//!
//! assert!(registry.class_by_name("demo::Counter").is_some());
//! # Ok::<(), introspect_core::RegistrationError>(())
//! ```

use std::marker::PhantomData;

use tracing::debug;

use introspect_core::{
    InvokeError, ParamType, Reflect, RegistrationError, Signature, SignatureHash, SymbolKind,
    TypeId, Variant, type_id,
};

use crate::entries::{Attributes, ClassEntry, EnumEntry, FunctionEntry, PropertyEntry};
use crate::invoker::{CallArgs, IntoConstructor, IntoFunction, IntoMethod};
use crate::namespace_tree::{SEPARATOR, validate_name};
use crate::{CastEdge, Invoker, Registry};

/// Types whose fields are exposed as properties, usually through
/// `#[derive(Reflect)]` with `#[reflect(get)]` / `#[reflect(get, set)]` fields.
pub trait ReflectFields: Reflect {
    /// Add one property per exposed field.
    fn register_fields<'r>(
        builder: ClassBuilder<'r, Self>,
    ) -> Result<ClassBuilder<'r, Self>, RegistrationError>;
}

/// What the next `attribute` call applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Owner,
    Constructor(usize),
    Method(usize),
    Property(usize),
    /// The last member was a duplicate that the registry ignored.
    Skipped,
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", scope, SEPARATOR, name)
    }
}

// ============================================================================
// Class Builder
// ============================================================================

/// Builder for a class of type `T`.
///
/// Created by [`Registry::class`] or [`Registry::class_named`]. Nothing is
/// visible in the registry until [`build`](Self::build) succeeds.
pub struct ClassBuilder<'r, T: Reflect> {
    registry: &'r mut Registry,
    entry: ClassEntry,
    edges: Vec<(TypeId, CastEdge)>,
    target: Target,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Reflect> ClassBuilder<'r, T> {
    pub(crate) fn new(registry: &'r mut Registry, namespace: Vec<String>, name: String) -> Self {
        let qualified_name = qualify(&namespace.join(SEPARATOR), &name);
        Self {
            registry,
            entry: ClassEntry::new::<T>(name, namespace, qualified_name),
            edges: Vec::new(),
            target: Target::Owner,
            _marker: PhantomData,
        }
    }

    /// Qualified name of the class being built.
    pub fn qualified_name(&self) -> &str {
        &self.entry.qualified_name
    }

    // ========================================================================
    // Bases
    // ========================================================================

    /// Add a direct base reached through `AsRef<B>` / `AsMut<B>`.
    pub fn base<B>(self) -> Self
    where
        T: AsRef<B> + AsMut<B>,
        B: Reflect,
    {
        self.base_edge(type_id::<B>(), CastEdge::via_as_ref::<T, B>())
    }

    /// Add a direct base with explicit accessors.
    pub fn base_with<B, F, G>(self, up: F, up_mut: G) -> Self
    where
        B: Reflect,
        F: Fn(&T) -> &B + Send + Sync + 'static,
        G: Fn(&mut T) -> &mut B + Send + Sync + 'static,
    {
        self.base_edge(type_id::<B>(), CastEdge::new(up, up_mut))
    }

    /// Add a shared (virtual) base, held behind a pointer such as `Rc<B>`.
    ///
    /// Several classes may share one base object this way. The base can
    /// only be reached through shared references.
    pub fn virtual_base<B, F>(self, up: F) -> Self
    where
        B: Reflect,
        F: Fn(&T) -> &B + Send + Sync + 'static,
    {
        self.base_edge(type_id::<B>(), CastEdge::shared(up))
    }

    /// Add a direct base with a prebuilt edge.
    pub fn base_edge(mut self, base: TypeId, edge: CastEdge) -> Self {
        self.edges.push((base, edge));
        self
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// Add a constructor built from a plain function or closure.
    pub fn constructor<M, F>(self, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoConstructor<T, M>,
    {
        let invoker = f.into_invoker(&self.entry.name);
        self.add_constructor(invoker)
    }

    /// Add a constructor with an explicit signature.
    ///
    /// The body must return a variant holding a `T`.
    pub fn constructor_with<F>(self, signature: Signature, body: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        let invoker = Invoker::function(
            &self.entry.name,
            signature.returns::<T>(),
            body,
        );
        self.add_constructor(invoker)
    }

    fn add_constructor(mut self, invoker: Invoker) -> Result<Self, RegistrationError> {
        let qualified = qualify(&self.entry.qualified_name, &self.entry.name);
        self.registry.check_arity(&qualified, invoker.arity())?;
        let hash = SignatureHash::from_constructor(
            self.entry.type_id,
            &invoker.signature().param_ids(),
        );
        if self.registry.keeps_first(
            self.entry.member_by_hash(hash).is_some(),
            SymbolKind::Constructor,
            &qualified,
        ) {
            self.target = Target::Skipped;
            return Ok(self);
        }
        let entry = FunctionEntry::new(self.entry.name.clone(), qualified, hash, invoker);
        self.entry.add_constructor(entry)?;
        self.target = Target::Constructor(self.entry.constructors.len() - 1);
        Ok(self)
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Add a method whose first parameter is `&T` or `&mut T`.
    pub fn method<M, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoMethod<T, M>,
    {
        let invoker = f.into_invoker(name);
        self.add_method(invoker)
    }

    /// Add a const method with an explicit signature.
    pub fn method_with<F>(
        self,
        name: &str,
        signature: Signature,
        body: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        self.add_method(Invoker::method::<T, _>(name, signature, body))
    }

    /// Add a mutating method with an explicit signature.
    pub fn method_mut_with<F>(
        self,
        name: &str,
        signature: Signature,
        body: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        self.add_method(Invoker::method_mut::<T, _>(name, signature, body))
    }

    /// Add a static method.
    pub fn static_method<M, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoFunction<M>,
    {
        let invoker = f.into_invoker(name);
        self.add_method(invoker)
    }

    /// Add a static method with an explicit signature.
    pub fn static_method_with<F>(
        self,
        name: &str,
        signature: Signature,
        body: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        self.add_method(Invoker::function(name, signature, body))
    }

    fn add_method(mut self, invoker: Invoker) -> Result<Self, RegistrationError> {
        let name = invoker.name().to_string();
        validate_name(SymbolKind::Method, &name)?;
        let qualified = qualify(&self.entry.qualified_name, &name);
        self.registry.check_arity(&qualified, invoker.arity())?;
        let hash = SignatureHash::from_method(
            self.entry.type_id,
            &name,
            &invoker.signature().param_ids(),
        );
        if self.registry.keeps_first(
            self.entry.member_by_hash(hash).is_some(),
            SymbolKind::Method,
            &qualified,
        ) {
            self.target = Target::Skipped;
            return Ok(self);
        }
        self.entry
            .add_method(FunctionEntry::new(name, qualified, hash, invoker))?;
        self.target = Target::Method(self.entry.methods.len() - 1);
        Ok(self)
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Add a read/write property backed by a getter and a setter.
    pub fn property<V, G, S>(self, name: &str, get: G, set: S) -> Result<Self, RegistrationError>
    where
        V: Reflect,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let setter = Invoker::method_mut::<T, _>(
            name,
            Signature::new().param(ParamType::value::<V>()),
            move |args| {
                let value = args.take::<V>(0)?;
                let mut this = args.this_mut::<T>()?;
                set(&mut *this, value);
                Ok(Variant::empty())
            },
        );
        self.add_property::<V, G>(name, get, Some(setter))
    }

    /// Add a read-only property backed by a getter.
    pub fn readonly_property<V, G>(self, name: &str, get: G) -> Result<Self, RegistrationError>
    where
        V: Reflect,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.add_property::<V, G>(name, get, None)
    }

    fn add_property<V, G>(
        mut self,
        name: &str,
        get: G,
        setter: Option<Invoker>,
    ) -> Result<Self, RegistrationError>
    where
        V: Reflect,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        validate_name(SymbolKind::Property, name)?;
        let qualified = qualify(&self.entry.qualified_name, name);
        if self.registry.keeps_first(
            self.entry.property(name).is_some(),
            SymbolKind::Property,
            &qualified,
        ) {
            self.target = Target::Skipped;
            return Ok(self);
        }
        let getter = Invoker::method::<T, _>(name, Signature::new().returns::<V>(), move |args| {
            let this = args.this::<T>()?;
            Ok(Variant::new(get(&*this)))
        });
        self.entry.add_property(PropertyEntry::new(
            name,
            qualified,
            type_id::<V>(),
            getter,
            setter,
        ))?;
        self.target = Target::Property(self.entry.properties.len() - 1);
        Ok(self)
    }

    /// Add the fields `T` exposes through [`ReflectFields`].
    pub fn fields(self) -> Result<Self, RegistrationError>
    where
        T: ReflectFields,
    {
        T::register_fields(self)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Attach an attribute to the last added member, or to the class itself
    /// when no member was added yet.
    pub fn attribute(mut self, key: &str, value: &str) -> Result<Self, RegistrationError> {
        let attributes: &mut Attributes = match self.target {
            Target::Owner => &mut self.entry.attributes,
            Target::Constructor(index) => &mut self.entry.constructors[index].attributes,
            Target::Method(index) => &mut self.entry.methods[index].attributes,
            Target::Property(index) => &mut self.entry.properties[index].attributes,
            Target::Skipped => return Ok(self),
        };
        attributes.insert(key, value)?;
        Ok(self)
    }

    /// Attach an attribute to the class, regardless of the last member.
    pub fn class_attribute(mut self, key: &str, value: &str) -> Result<Self, RegistrationError> {
        self.entry.attributes.insert(key, value)?;
        Ok(self)
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Register the class, its bases and members.
    ///
    /// Bases are validated before anything is committed: a failed build
    /// leaves the registry unchanged.
    pub fn build(self) -> Result<TypeId, RegistrationError> {
        let ClassBuilder {
            registry,
            entry,
            edges,
            ..
        } = self;
        registry.insert_class(entry, edges)
    }
}

// ============================================================================
// Namespace Builder
// ============================================================================

/// Builder registering free functions and global properties in a namespace.
///
/// Created by [`Registry::namespace`] or [`Registry::global`]. Unlike
/// [`ClassBuilder`], every step commits immediately.
pub struct NamespaceBuilder<'r> {
    registry: &'r mut Registry,
    path: Vec<String>,
    last: Option<Last>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Last {
    Function(SignatureHash),
    /// Qualified name of the property.
    Property(String),
    Skipped,
}

impl<'r> NamespaceBuilder<'r> {
    pub(crate) fn new(registry: &'r mut Registry, path: Vec<String>) -> Self {
        Self {
            registry,
            path,
            last: None,
        }
    }

    fn qualified(&self, name: &str) -> String {
        qualify(&self.path.join(SEPARATOR), name)
    }

    /// Add a free function built from a plain function or closure.
    pub fn function<M, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoFunction<M>,
    {
        let invoker = f.into_invoker(name);
        self.add_function(invoker)
    }

    /// Add a free function with an explicit signature.
    pub fn function_with<F>(
        self,
        name: &str,
        signature: Signature,
        body: F,
    ) -> Result<Self, RegistrationError>
    where
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        self.add_function(Invoker::function(name, signature, body))
    }

    fn add_function(mut self, invoker: Invoker) -> Result<Self, RegistrationError> {
        let name = invoker.name().to_string();
        validate_name(SymbolKind::Function, &name)?;
        let qualified = self.qualified(&name);
        self.registry.check_arity(&qualified, invoker.arity())?;
        let hash = SignatureHash::from_function(&qualified, &invoker.signature().param_ids());

        let exists = self.registry.tree.get_function_by_hash(hash).is_some();
        if self.registry.keeps_first(exists, SymbolKind::Function, &qualified) {
            self.last = Some(Last::Skipped);
            return Ok(self);
        }
        let entry = FunctionEntry::new(name, qualified.clone(), hash, invoker);
        self.registry.tree.register_function(&self.path, entry)?;
        debug!(name = %qualified, "registered function");
        self.last = Some(Last::Function(hash));
        Ok(self)
    }

    /// Add a read/write global property.
    pub fn property<V, G, S>(self, name: &str, get: G, set: S) -> Result<Self, RegistrationError>
    where
        V: Reflect,
        G: Fn() -> V + Send + Sync + 'static,
        S: Fn(V) + Send + Sync + 'static,
    {
        let setter = Invoker::function(
            name,
            Signature::new().param(ParamType::value::<V>()),
            move |args| {
                set(args.take::<V>(0)?);
                Ok(Variant::empty())
            },
        );
        self.add_property::<V, G>(name, get, Some(setter))
    }

    /// Add a read-only global property.
    pub fn readonly_property<V, G>(self, name: &str, get: G) -> Result<Self, RegistrationError>
    where
        V: Reflect,
        G: Fn() -> V + Send + Sync + 'static,
    {
        self.add_property::<V, G>(name, get, None)
    }

    fn add_property<V, G>(
        mut self,
        name: &str,
        get: G,
        setter: Option<Invoker>,
    ) -> Result<Self, RegistrationError>
    where
        V: Reflect,
        G: Fn() -> V + Send + Sync + 'static,
    {
        validate_name(SymbolKind::Property, name)?;
        let qualified = self.qualified(name);
        let exists = self.registry.tree.resolve_property(&qualified).is_some();
        if self.registry.keeps_first(exists, SymbolKind::Property, &qualified) {
            self.last = Some(Last::Skipped);
            return Ok(self);
        }
        let getter = Invoker::function(name, Signature::new().returns::<V>(), move |_| {
            Ok(Variant::new(get()))
        });
        let entry = PropertyEntry::new(name, qualified.clone(), type_id::<V>(), getter, setter);
        self.registry.tree.register_property(&self.path, entry)?;
        debug!(name = %qualified, "registered global property");
        self.last = Some(Last::Property(qualified));
        Ok(self)
    }

    /// Attach an attribute to the last registered function or property.
    pub fn attribute(self, key: &str, value: &str) -> Result<Self, RegistrationError> {
        if self.last == Some(Last::Skipped) {
            return Ok(self);
        }
        let attributes = match &self.last {
            Some(Last::Function(hash)) => self
                .registry
                .tree
                .function_mut(*hash)
                .map(|entry| &mut entry.attributes),
            Some(Last::Property(name)) => self
                .registry
                .tree
                .property_mut(name)
                .map(|entry| &mut entry.attributes),
            Some(Last::Skipped) | None => None,
        };
        match attributes {
            Some(attributes) => attributes.insert(key, value)?,
            None => {
                return Err(RegistrationError::InvalidName {
                    kind: SymbolKind::Attribute,
                    name: key.to_string(),
                });
            }
        }
        Ok(self)
    }
}

// ============================================================================
// Enum Builder
// ============================================================================

/// Builder for an enumeration.
///
/// Created by [`Registry::enumeration`].
pub struct EnumBuilder<'r> {
    registry: &'r mut Registry,
    entry: EnumEntry,
}

impl<'r> EnumBuilder<'r> {
    pub(crate) fn new(registry: &'r mut Registry, namespace: Vec<String>, name: String) -> Self {
        let qualified_name = qualify(&namespace.join(SEPARATOR), &name);
        Self {
            registry,
            entry: EnumEntry::new(name, namespace, qualified_name),
        }
    }

    /// Add an enumerator.
    pub fn value(mut self, name: &str, value: i64) -> Result<Self, RegistrationError> {
        validate_name(SymbolKind::EnumValue, name)?;
        self.entry.add_value(name, value)?;
        Ok(self)
    }

    /// Attach an attribute to the enumeration.
    pub fn attribute(mut self, key: &str, value: &str) -> Result<Self, RegistrationError> {
        self.entry.attributes.insert(key, value)?;
        Ok(self)
    }

    /// Register the enumeration.
    pub fn build(self) -> Result<(), RegistrationError> {
        let EnumBuilder { registry, entry } = self;
        let exists = registry.tree.resolve_enum(&entry.qualified_name).is_some();
        if registry.keeps_first(exists, SymbolKind::Enum, &entry.qualified_name) {
            return Ok(());
        }
        let name = entry.qualified_name.clone();
        let values = entry.len();
        registry.tree.register_enum(entry)?;
        debug!(name = %name, values, "registered enum");
        Ok(())
    }
}
