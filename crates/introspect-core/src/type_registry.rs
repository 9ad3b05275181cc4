//! Process-wide type registry.
//!
//! The registry assigns a [`TypeId`] to every type the first time it is
//! requested and keeps its [`TypeInfo`] for the rest of the process.
//!
//! # Thread Safety
//!
//! Id assignment is the only mutation path. It takes the write lock and
//! re-checks the index before publishing, so two threads racing on the first
//! use of a type observe the same id. Every other operation takes the read
//! lock only.
//!
//! # Example
//!
//! ```
//! use introspect_core::{find_type, type_id};
//!
//! let id = type_id::<u16>();
//! assert_eq!(id, type_id::<u16>());
//! assert_eq!(find_type("uint16").id(), id);
//! assert!(find_type("const uint16&").is_lvalue_ref());
//! ```

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::{Qualifiers, Reflect, TypeId, TypeInfo};

/// Get the global type registry.
pub fn types() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TypeRegistry::new)
}

/// Get (assigning on first use) the id of `T`.
#[inline]
pub fn type_id<T: Reflect>() -> TypeId {
    types().id_of::<T>()
}

/// Look up a type by its textual signature, e.g. `"const string&"`.
///
/// Reports an invalid descriptor for types that have not been registered.
pub fn find_type(signature: &str) -> TypeInfo {
    types().find(signature)
}

/// Key for interned qualified types: (decayed, qualifiers, extent).
type QualifiedKey = (TypeId, Qualifiers, usize);

#[derive(Default)]
struct Tables {
    /// Descriptors indexed by `TypeId::index() - 1`.
    infos: Vec<TypeInfo>,
    by_rust: FxHashMap<std::any::TypeId, TypeId>,
    by_qualified: FxHashMap<QualifiedKey, TypeId>,
    by_name: FxHashMap<Arc<str>, TypeId>,
}

impl Tables {
    fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        if !id.is_valid() {
            return None;
        }
        self.infos.get(id.index() as usize - 1)
    }

    /// Push a descriptor and index it by name. Returns the new id and whether
    /// the name collided with an earlier registration.
    fn push(
        &mut self,
        name: Arc<str>,
        size: usize,
        qualifiers: Qualifiers,
        extent: usize,
        decayed: Option<TypeId>,
    ) -> (TypeId, bool) {
        let id = TypeId::from_index(self.infos.len() as u32 + 1);
        let decayed = decayed.unwrap_or(id);
        self.infos.push(TypeInfo::new(
            id,
            name.clone(),
            size,
            qualifiers,
            extent,
            decayed,
        ));
        let mut collided = false;
        self.by_name
            .entry(name)
            .and_modify(|_| collided = true)
            .or_insert(id);
        (id, collided)
    }
}

/// Registry of every type seen by the process.
pub struct TypeRegistry {
    tables: RwLock<Tables>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Get (assigning on first use) the id of `T`.
    pub fn id_of<T: Reflect>(&self) -> TypeId {
        let key = std::any::TypeId::of::<T>();
        if let Some(id) = self.tables.read().by_rust.get(&key) {
            return *id;
        }

        let (id, collided) = {
            let mut tables = self.tables.write();
            if let Some(id) = tables.by_rust.get(&key) {
                return *id;
            }
            let name: Arc<str> = Arc::from(T::type_name());
            let (id, collided) =
                tables.push(name, size_of::<T>(), Qualifiers::empty(), 0, None);
            tables.by_rust.insert(key, id);
            (id, collided)
        };

        debug!(type_id = id.index(), name = T::type_name(), "registered type");
        if collided {
            warn!(
                name = T::type_name(),
                "type name already registered, name lookups keep the first type"
            );
        }
        id
    }

    /// Get (interning on first use) the id of a qualified form of `base`.
    ///
    /// Qualifiers are merged with any qualifiers `base` already carries; the
    /// result always links to the decayed type of `base`. `extent` is only
    /// meaningful together with [`Qualifiers::ARRAY`].
    ///
    /// Returns [`TypeId::INVALID`] if `base` is not registered.
    pub fn qualified(&self, base: TypeId, qualifiers: Qualifiers, extent: usize) -> TypeId {
        let (decayed, merged, extent, base_name, base_size) = {
            let tables = self.tables.read();
            let Some(base_info) = tables.get(base) else {
                return TypeId::INVALID;
            };
            let decayed = base_info.decayed();
            let merged = base_info.qualifiers() | qualifiers;
            let extent = if qualifiers.contains(Qualifiers::ARRAY) {
                extent
            } else {
                base_info.extent()
            };
            if merged.is_empty() {
                return decayed;
            }
            let key = (decayed, merged, extent);
            if let Some(id) = tables.by_qualified.get(&key) {
                return *id;
            }
            let Some(decayed_info) = tables.get(decayed) else {
                return TypeId::INVALID;
            };
            (
                decayed,
                merged,
                extent,
                decayed_info.name().to_string(),
                decayed_info.size(),
            )
        };

        let size = if merged.intersects(
            Qualifiers::POINTER | Qualifiers::LVALUE_REF | Qualifiers::RVALUE_REF,
        ) {
            size_of::<usize>()
        } else if merged.contains(Qualifiers::ARRAY) {
            base_size * extent
        } else {
            base_size
        };

        let name = merged.decorate(&base_name, extent);
        let id = {
            let mut tables = self.tables.write();
            let key = (decayed, merged, extent);
            if let Some(id) = tables.by_qualified.get(&key) {
                return *id;
            }
            let (id, _) = tables.push(Arc::from(name.as_str()), size, merged, extent, Some(decayed));
            tables.by_qualified.insert(key, id);
            id
        };

        debug!(type_id = id.index(), name = %name, "registered qualified type");
        id
    }

    /// Get the descriptor for an id, or an invalid descriptor if unknown.
    pub fn info(&self, id: TypeId) -> TypeInfo {
        self.tables
            .read()
            .get(id)
            .cloned()
            .unwrap_or_else(TypeInfo::invalid)
    }

    /// Look up a decayed type by its registered name.
    pub fn by_name(&self, name: &str) -> Option<TypeId> {
        self.tables.read().by_name.get(name).copied()
    }

    /// Look up a type by textual signature.
    ///
    /// Accepts a registered type name decorated with `const`, `[N]`, `*`,
    /// `&` and `&&`. The base name must already be registered; qualified forms
    /// of a registered base are interned on demand.
    pub fn find(&self, signature: &str) -> TypeInfo {
        let Some((base, qualifiers, extent)) = parse_signature(signature) else {
            return TypeInfo::invalid();
        };
        let Some(base_id) = self.by_name(base) else {
            return TypeInfo::invalid();
        };
        if qualifiers.is_empty() {
            return self.info(base_id);
        }
        self.info(self.qualified(base_id, qualifiers, extent))
    }

    /// Number of registered types (including qualified forms).
    pub fn len(&self) -> usize {
        self.tables.read().infos.len()
    }

    /// Check whether no types have been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split a textual signature into its base name, qualifiers and extent.
fn parse_signature(signature: &str) -> Option<(&str, Qualifiers, usize)> {
    let mut rest = signature.trim();
    let mut qualifiers = Qualifiers::empty();
    let mut extent = 0;

    if let Some(stripped) = rest.strip_prefix("const ") {
        qualifiers |= Qualifiers::CONST;
        rest = stripped.trim_start();
    }

    if let Some(stripped) = rest.strip_suffix("&&") {
        qualifiers |= Qualifiers::RVALUE_REF;
        rest = stripped.trim_end();
    } else if let Some(stripped) = rest.strip_suffix('&') {
        qualifiers |= Qualifiers::LVALUE_REF;
        rest = stripped.trim_end();
    }

    if let Some(stripped) = rest.strip_suffix('*') {
        qualifiers |= Qualifiers::POINTER;
        rest = stripped.trim_end();
    }

    if let Some(stripped) = rest.strip_suffix(']') {
        let open = stripped.rfind('[')?;
        extent = stripped[open + 1..].trim().parse().ok()?;
        qualifiers |= Qualifiers::ARRAY;
        rest = stripped[..open].trim_end();
    }

    if rest.is_empty() {
        return None;
    }
    Some((rest, qualifiers, extent))
}
