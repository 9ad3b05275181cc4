//! Class entry.
//!
//! This module provides `ClassEntry` for registered classes: their bases,
//! constructors, methods and properties.

use rustc_hash::FxHashMap;

use introspect_core::{
    Reflect, RegistrationError, SignatureHash, SymbolKind, TypeId, ValueOps, type_id,
};

use super::{Attributes, FunctionEntry, PropertyEntry};

/// Registry entry for a class.
#[derive(Debug, Clone)]
pub struct ClassEntry {
    /// Unqualified name.
    pub name: String,
    /// Namespace path (e.g., `["geo", "shapes"]`).
    pub namespace: Vec<String>,
    /// Fully qualified name (with namespace).
    pub qualified_name: String,
    pub type_id: TypeId,
    /// Value operations of the class, used to alias and copy its objects.
    pub ops: &'static ValueOps,

    // === Inheritance ===
    /// Direct bases in registration order.
    pub bases: Vec<TypeId>,

    // === Members ===
    /// Constructors in registration order.
    pub constructors: Vec<FunctionEntry>,
    /// Methods (instance and static) in registration order.
    pub methods: Vec<FunctionEntry>,
    /// Properties in registration order.
    pub properties: Vec<PropertyEntry>,
    pub attributes: Attributes,

    member_hashes: FxHashMap<SignatureHash, usize>,
}

impl ClassEntry {
    /// Create an entry for `T`.
    pub fn new<T: Reflect>(
        name: impl Into<String>,
        namespace: Vec<String>,
        qualified_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
            qualified_name: qualified_name.into(),
            type_id: type_id::<T>(),
            ops: ValueOps::of::<T>(),
            bases: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            attributes: Attributes::new(),
            member_hashes: FxHashMap::default(),
        }
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn claim_hash(&mut self, hash: SignatureHash, kind: SymbolKind, name: &str) -> Result<(), RegistrationError> {
        if self.member_hashes.contains_key(&hash) {
            return Err(RegistrationError::Duplicate {
                kind,
                name: format!("{}::{}", self.qualified_name, name),
            });
        }
        let slot = match kind {
            SymbolKind::Constructor => self.constructors.len(),
            _ => self.methods.len(),
        };
        self.member_hashes.insert(hash, slot);
        Ok(())
    }

    /// Add a constructor. Constructors with the same parameter types collide.
    pub fn add_constructor(&mut self, entry: FunctionEntry) -> Result<(), RegistrationError> {
        self.claim_hash(entry.hash, SymbolKind::Constructor, &entry.name)?;
        self.constructors.push(entry);
        Ok(())
    }

    /// Add a method. Overloads must differ in their parameter types, and a
    /// method may not share its name with a property.
    pub fn add_method(&mut self, entry: FunctionEntry) -> Result<(), RegistrationError> {
        if self.property(&entry.name).is_some() {
            return Err(self.duplicate(SymbolKind::Method, &entry.name));
        }
        self.claim_hash(entry.hash, SymbolKind::Method, &entry.name)?;
        self.methods.push(entry);
        Ok(())
    }

    /// Add a property. Property names are unique within the class.
    pub fn add_property(&mut self, entry: PropertyEntry) -> Result<(), RegistrationError> {
        if self.property(&entry.name).is_some() || self.method(&entry.name).is_some() {
            return Err(self.duplicate(SymbolKind::Property, &entry.name));
        }
        self.properties.push(entry);
        Ok(())
    }

    fn duplicate(&self, kind: SymbolKind, name: &str) -> RegistrationError {
        RegistrationError::Duplicate {
            kind,
            name: format!("{}::{}", self.qualified_name, name),
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// First method registered under `name`.
    pub fn method(&self, name: &str) -> Option<&FunctionEntry> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// All overloads registered under `name`, in registration order.
    pub fn methods_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s FunctionEntry> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// Method or constructor with the given key.
    pub fn member_by_hash(&self, hash: SignatureHash) -> Option<&FunctionEntry> {
        let index = *self.member_hashes.get(&hash)?;
        self.methods
            .get(index)
            .filter(|m| m.hash == hash)
            .or_else(|| self.constructors.get(index).filter(|c| c.hash == hash))
    }

    pub fn property(&self, name: &str) -> Option<&PropertyEntry> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut PropertyEntry> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    /// Check whether `T` is this class.
    pub fn is<T: Reflect>(&self) -> bool {
        self.ops.is::<T>()
    }
}
