//! Registry configuration.

/// What to do when a symbol is registered twice under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Reject the second registration with [`RegistrationError::Duplicate`].
    ///
    /// [`RegistrationError::Duplicate`]: introspect_core::RegistrationError::Duplicate
    #[default]
    Error,
    /// Keep the first registration and ignore later ones.
    Reuse,
}

/// Settings for a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub duplicate_policy: DuplicatePolicy,
    /// Highest parameter count a registered callable may declare.
    pub max_arity: usize,
}

impl RegistryConfig {
    /// Default parameter ceiling, matching the typed call helpers.
    pub const DEFAULT_MAX_ARITY: usize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_max_arity(mut self, max_arity: usize) -> Self {
        self.max_arity = max_arity;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Error,
            max_arity: Self::DEFAULT_MAX_ARITY,
        }
    }
}
