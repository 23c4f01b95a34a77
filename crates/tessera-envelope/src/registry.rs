//! Component registry for resolving envelope component names.
//!
//! Each consuming context builds its own registry at start-up from the
//! implementations it already has. Envelopes only ever name a component; the
//! code that runs is always looked up here.

use std::collections::HashMap;
use std::sync::Arc;

use tessera_markup::Component;

/// A registry of locally known component implementations.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered components by exact name
    components: HashMap<String, RegisteredComponent>,
}

/// A registered component with the name it was registered under.
#[derive(Clone)]
pub struct RegisteredComponent {
    /// Name the component was registered under
    pub name: String,

    /// Local implementation
    pub component: Arc<dyn Component>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under its resolved name.
    pub fn register(&mut self, component: Arc<dyn Component>) -> Result<(), RegistryError> {
        let name = component
            .display_name()
            .or_else(|| component.name())
            .ok_or(RegistryError::Unnamed)?
            .to_string();
        self.register_as(name, component)
    }

    /// Register a component under an explicit name.
    pub fn register_as(
        &mut self,
        name: impl Into<String>,
        component: Arc<dyn Component>,
    ) -> Result<(), RegistryError> {
        let name = name.into();

        if self.components.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        tracing::debug!("Registered component {}", name);
        self.components.insert(
            name.clone(),
            RegisteredComponent { name, component },
        );
        Ok(())
    }

    /// Builder form of [`ComponentRegistry::register`].
    pub fn with(mut self, component: Arc<dyn Component>) -> Result<Self, RegistryError> {
        self.register(component)?;
        Ok(self)
    }

    /// Look up a component by its exact name.
    pub fn get(&self, name: &str) -> Option<&RegisteredComponent> {
        self.components.get(name)
    }

    /// Check if a component exists.
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Get all registered component names.
    pub fn names(&self) -> Vec<&str> {
        self.components.values().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names())
            .finish()
    }
}

/// Errors that can occur with the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Component has no display name or name to register under")]
    Unnamed,

    #[error("Component already registered: {0}")]
    Duplicate(String),
}
