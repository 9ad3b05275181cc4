//! Namespace Tree - hierarchical storage for named symbols.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: `NamespaceData` (classes, functions, properties, enums at that level)
//! - Edges: `Contains(name)` from a namespace to each child namespace
//!
//! Every scope keeps its members in insertion order and holds each name once:
//! a class, a property, an enum and a namespace can never share a name, while
//! functions may be overloaded under one name as long as their signature keys
//! differ.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use introspect_core::{RegistrationError, SignatureHash, SymbolKind, TypeId};

use crate::entries::{EnumEntry, FunctionEntry, PropertyEntry};

/// Scope separator in qualified names.
pub const SEPARATOR: &str = "::";

/// Edge types in the namespace graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEdge {
    /// Parent namespace contains child namespace.
    /// The String is the child's simple name.
    Contains(String),
}

/// Data stored in each namespace node.
#[derive(Debug, Default)]
pub struct NamespaceData {
    /// Member names with their kind, in insertion order.
    members: Vec<(String, SymbolKind)>,
    names: FxHashMap<String, SymbolKind>,

    /// Classes in this namespace by simple name.
    pub classes: FxHashMap<String, TypeId>,

    /// Functions in this namespace by simple name.
    /// Vec holds overloads with same name, different signatures.
    pub functions: FxHashMap<String, Vec<FunctionEntry>>,

    /// Global properties in this namespace by simple name.
    pub properties: FxHashMap<String, PropertyEntry>,

    /// Enumerations in this namespace by simple name.
    pub enums: FxHashMap<String, EnumEntry>,
}

impl NamespaceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members in insertion order. Overloaded functions appear once.
    pub fn members(&self) -> impl Iterator<Item = (&str, SymbolKind)> {
        self.members.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Kind of the member called `name`, if any.
    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        self.names.get(name).copied()
    }
}

/// Split `a::b::c` into `(["a", "b"], "c")`. A leading `::` is ignored.
pub fn split_qualified(qualified_name: &str) -> (Vec<&str>, &str) {
    let normalized = qualified_name.trim_start_matches(SEPARATOR);
    match normalized.rsplit_once(SEPARATOR) {
        Some((path, name)) => (path.split(SEPARATOR).collect(), name),
        None => (Vec::new(), normalized),
    }
}

/// Check that `name` can be used as a simple name.
pub fn validate_name(kind: SymbolKind, name: &str) -> Result<(), RegistrationError> {
    if name.is_empty() || name.contains(SEPARATOR) {
        return Err(RegistrationError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// The namespace graph - hierarchical storage for all named symbols.
pub struct NamespaceTree {
    /// The directed graph storing all namespaces.
    graph: DiGraph<NamespaceData, NamespaceEdge>,

    /// The root (global) namespace node.
    root: NodeIndex,

    /// Reverse index: TypeId -> (NodeIndex, simple_name).
    class_index: FxHashMap<TypeId, (NodeIndex, String)>,

    /// Reverse index: signature key -> (NodeIndex, simple_name, overload_index).
    func_hash_index: FxHashMap<SignatureHash, (NodeIndex, String, usize)>,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    /// Create a new namespace tree with an empty root.
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(NamespaceData::new());
        Self {
            graph,
            root,
            class_index: FxHashMap::default(),
            func_hash_index: FxHashMap::default(),
        }
    }

    /// Get the root namespace node index.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Get a namespace node's data.
    pub fn get_namespace(&self, node: NodeIndex) -> Option<&NamespaceData> {
        self.graph.node_weight(node)
    }

    fn data_mut(&mut self, node: NodeIndex) -> &mut NamespaceData {
        &mut self.graph[node]
    }

    /// Find a child namespace by name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph.edges(parent).find_map(|edge| match edge.weight() {
            NamespaceEdge::Contains(child_name) if child_name == name => Some(edge.target()),
            _ => None,
        })
    }

    /// Get or create a child namespace.
    ///
    /// Fails if the name is taken by a symbol that is not a namespace.
    pub fn get_or_create_child(
        &mut self,
        parent: NodeIndex,
        name: &str,
    ) -> Result<NodeIndex, RegistrationError> {
        if let Some(child) = self.find_child(parent, name) {
            return Ok(child);
        }
        validate_name(SymbolKind::Namespace, name)?;
        self.claim(parent, name, SymbolKind::Namespace)?;

        let child = self.graph.add_node(NamespaceData::new());
        self.graph
            .add_edge(parent, child, NamespaceEdge::Contains(name.to_string()));
        Ok(child)
    }

    /// Get or create a namespace path from root.
    pub fn get_or_create_path<S: AsRef<str>>(
        &mut self,
        path: &[S],
    ) -> Result<NodeIndex, RegistrationError> {
        let mut current = self.root;
        for segment in path {
            current = self.get_or_create_child(current, segment.as_ref())?;
        }
        Ok(current)
    }

    /// Get an existing namespace by path, or None if it doesn't exist.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        let mut current = self.root;
        for segment in path {
            current = self.find_child(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Find the parent namespace of a node.
    pub fn find_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .next()
            .map(|edge| edge.source())
    }

    /// Get the simple name of a namespace node.
    pub fn get_namespace_name(&self, node: NodeIndex) -> Option<&str> {
        if node == self.root {
            return None;
        }
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find_map(|edge| match edge.weight() {
                NamespaceEdge::Contains(name) => Some(name.as_str()),
            })
    }

    /// Get the full namespace path for a node.
    pub fn get_namespace_path(&self, node: NodeIndex) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = node;

        while current != self.root {
            if let Some(name) = self.get_namespace_name(current) {
                path.push(name.to_string());
            }
            match self.find_parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        path.reverse();
        path
    }

    /// Get the qualified name string for a symbol in a namespace.
    pub fn qualified_name(&self, ns_node: NodeIndex, simple_name: &str) -> String {
        let path = self.get_namespace_path(ns_node);
        if path.is_empty() {
            simple_name.to_string()
        } else {
            format!("{}{}{}", path.join(SEPARATOR), SEPARATOR, simple_name)
        }
    }

    /// Reserve `name` in `node` for a symbol of `kind`.
    ///
    /// Returns `false` when the name already holds a compatible symbol
    /// (another overload of a function, or the namespace itself).
    fn claim(
        &mut self,
        node: NodeIndex,
        name: &str,
        kind: SymbolKind,
    ) -> Result<bool, RegistrationError> {
        match self.graph[node].kind_of(name) {
            Some(existing)
                if existing == kind
                    && matches!(kind, SymbolKind::Function | SymbolKind::Namespace) =>
            {
                Ok(false)
            }
            Some(_) => Err(RegistrationError::Duplicate {
                kind,
                name: self.qualified_name(node, name),
            }),
            None => {
                let data = self.data_mut(node);
                data.names.insert(name.to_string(), kind);
                data.members.push((name.to_string(), kind));
                Ok(true)
            }
        }
    }

    // ========================================================================
    // Class Registration
    // ========================================================================

    /// Register a class name in the tree.
    pub fn register_class<S: AsRef<str>>(
        &mut self,
        namespace_path: &[S],
        simple_name: &str,
        type_id: TypeId,
    ) -> Result<(), RegistrationError> {
        validate_name(SymbolKind::Class, simple_name)?;
        if let Some((node, name)) = self.class_index.get(&type_id) {
            return Err(RegistrationError::Duplicate {
                kind: SymbolKind::Class,
                name: self.qualified_name(*node, name),
            });
        }
        let ns_node = self.get_or_create_path(namespace_path)?;
        self.claim(ns_node, simple_name, SymbolKind::Class)?;
        self.data_mut(ns_node)
            .classes
            .insert(simple_name.to_string(), type_id);
        self.class_index
            .insert(type_id, (ns_node, simple_name.to_string()));
        Ok(())
    }

    /// Resolve a fully qualified class name like "geo::shapes::Circle".
    pub fn resolve_class(&self, qualified_name: &str) -> Option<TypeId> {
        let (path, name) = split_qualified(qualified_name);
        let ns_node = self.get_path(&path)?;
        self.graph.node_weight(ns_node)?.classes.get(name).copied()
    }

    /// Get the location (namespace + name) for a class by its id.
    pub fn get_class_location(&self, type_id: TypeId) -> Option<(NodeIndex, &str)> {
        let (ns_node, name) = self.class_index.get(&type_id)?;
        Some((*ns_node, name.as_str()))
    }

    /// Get the qualified name for a class by its id.
    pub fn get_class_qualified_name(&self, type_id: TypeId) -> Option<String> {
        let (ns_node, name) = self.get_class_location(type_id)?;
        Some(self.qualified_name(ns_node, name))
    }

    // ========================================================================
    // Function Registration
    // ========================================================================

    /// Register a function (allows overloads with same name).
    pub fn register_function<S: AsRef<str>>(
        &mut self,
        namespace_path: &[S],
        entry: FunctionEntry,
    ) -> Result<(), RegistrationError> {
        validate_name(SymbolKind::Function, &entry.name)?;
        let ns_node = self.get_or_create_path(namespace_path)?;
        let func_hash = entry.hash;

        if self.func_hash_index.contains_key(&func_hash) {
            return Err(RegistrationError::Duplicate {
                kind: SymbolKind::Function,
                name: self.qualified_name(ns_node, &entry.name),
            });
        }
        self.claim(ns_node, &entry.name, SymbolKind::Function)?;

        let name = entry.name.clone();
        let overloads = self.data_mut(ns_node).functions.entry(name.clone()).or_default();
        let overload_index = overloads.len();
        overloads.push(entry);

        self.func_hash_index
            .insert(func_hash, (ns_node, name, overload_index));
        Ok(())
    }

    /// Get a function by its signature key.
    pub fn get_function_by_hash(&self, hash: SignatureHash) -> Option<&FunctionEntry> {
        let (ns_node, name, idx) = self.func_hash_index.get(&hash)?;
        self.graph
            .node_weight(*ns_node)?
            .functions
            .get(name)?
            .get(*idx)
    }

    /// Resolve a qualified function name (returns all overloads).
    pub fn resolve_functions(&self, qualified_name: &str) -> &[FunctionEntry] {
        let (path, name) = split_qualified(qualified_name);
        self.get_path(&path)
            .and_then(|node| self.graph.node_weight(node))
            .and_then(|data| data.functions.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Get mutable access to an overload, for attaching metadata.
    pub(crate) fn function_mut(&mut self, hash: SignatureHash) -> Option<&mut FunctionEntry> {
        let (ns_node, name, idx) = self.func_hash_index.get(&hash)?.clone();
        self.graph
            .node_weight_mut(ns_node)?
            .functions
            .get_mut(&name)?
            .get_mut(idx)
    }

    // ========================================================================
    // Global Property Registration
    // ========================================================================

    /// Register a global property.
    pub fn register_property<S: AsRef<str>>(
        &mut self,
        namespace_path: &[S],
        entry: PropertyEntry,
    ) -> Result<(), RegistrationError> {
        validate_name(SymbolKind::Property, &entry.name)?;
        let ns_node = self.get_or_create_path(namespace_path)?;
        self.claim(ns_node, &entry.name, SymbolKind::Property)?;
        self.data_mut(ns_node)
            .properties
            .insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Resolve a qualified global property name.
    pub fn resolve_property(&self, qualified_name: &str) -> Option<&PropertyEntry> {
        let (path, name) = split_qualified(qualified_name);
        let ns_node = self.get_path(&path)?;
        self.graph.node_weight(ns_node)?.properties.get(name)
    }

    pub(crate) fn property_mut(&mut self, qualified_name: &str) -> Option<&mut PropertyEntry> {
        let (path, name) = split_qualified(qualified_name);
        let ns_node = self.get_path(&path)?;
        self.graph.node_weight_mut(ns_node)?.properties.get_mut(name)
    }

    // ========================================================================
    // Enum Registration
    // ========================================================================

    /// Register an enumeration.
    pub fn register_enum(&mut self, entry: EnumEntry) -> Result<(), RegistrationError> {
        validate_name(SymbolKind::Enum, &entry.name)?;
        let ns_node = self.get_or_create_path(&entry.namespace)?;
        self.claim(ns_node, &entry.name, SymbolKind::Enum)?;
        self.data_mut(ns_node).enums.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Resolve a qualified enum name.
    pub fn resolve_enum(&self, qualified_name: &str) -> Option<&EnumEntry> {
        let (path, name) = split_qualified(qualified_name);
        let ns_node = self.get_path(&path)?;
        self.graph.node_weight(ns_node)?.enums.get(name)
    }
}
