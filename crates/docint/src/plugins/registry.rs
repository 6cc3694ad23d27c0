//! Component registration and lookup.
//!
//! The registry maps a component name to a factory. It is process-wide: written
//! while the program sets itself up and read when pipelines are built.

use crate::plugins::Component;
use crate::{DocintError, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Builds a fresh component instance.
pub type ComponentFactory = Arc<dyn Fn() -> Arc<dyn Component> + Send + Sync>;

/// Validate a component name before registration.
///
/// # Errors
///
/// Returns `Validation` if the name is empty or contains whitespace.
fn validate_component_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DocintError::validation("Component name cannot be empty"));
    }

    if name.contains(char::is_whitespace) {
        return Err(DocintError::validation(format!(
            "Component name '{}' cannot contain whitespace",
            name
        )));
    }

    Ok(())
}

pub struct ComponentRegistry {
    factories: BTreeMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Create a registry holding the built-in components.
    pub fn new() -> Self {
        let mut registry = Self::new_empty();
        for (name, factory) in crate::components::builtin_factories() {
            registry.factories.insert(name.to_string(), factory);
        }
        registry
    }

    pub fn new_empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory under `name`, replacing any previous registration.
    pub fn register(&mut self, name: &str, factory: ComponentFactory) -> Result<()> {
        validate_component_name(name)?;
        if self.factories.insert(name.to_string(), factory).is_some() {
            tracing::debug!(component = name, "Replaced component registration");
        }
        Ok(())
    }

    /// Build the component registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `MissingComponent` if nothing is registered under `name`.
    pub fn create(&self, name: &str) -> Result<Arc<dyn Component>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| DocintError::MissingComponent(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.factories.clear();
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global component registry.
pub static COMPONENT_REGISTRY: Lazy<Arc<RwLock<ComponentRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(ComponentRegistry::new())));

pub fn get_component_registry() -> Arc<RwLock<ComponentRegistry>> {
    COMPONENT_REGISTRY.clone()
}

/// Register a component factory in the global registry.
///
/// # Example
///
/// ```rust,no_run
/// use docint::plugins::register_component;
/// use std::sync::Arc;
/// # use docint::plugins::Component;
/// # fn make() -> Arc<dyn Component> { unimplemented!() }
///
/// register_component("my_component", Arc::new(make))?;
/// # Ok::<(), docint::DocintError>(())
/// ```
pub fn register_component(name: &str, factory: ComponentFactory) -> Result<()> {
    let registry = get_component_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocintError::LockPoisoned(format!("Component registry lock poisoned: {}", e)))?;
    registry.register(name, factory)
}

pub fn unregister_component(name: &str) -> Result<bool> {
    let registry = get_component_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocintError::LockPoisoned(format!("Component registry lock poisoned: {}", e)))?;
    Ok(registry.remove(name))
}

/// Build a component from the global registry.
pub fn get_component(name: &str) -> Result<Arc<dyn Component>> {
    let registry = get_component_registry();
    let registry = registry
        .read()
        .map_err(|e| DocintError::LockPoisoned(format!("Component registry lock poisoned: {}", e)))?;
    registry.create(name)
}

pub fn list_components() -> Result<Vec<String>> {
    let registry = get_component_registry();
    let registry = registry
        .read()
        .map_err(|e| DocintError::LockPoisoned(format!("Component registry lock poisoned: {}", e)))?;
    Ok(registry.list())
}

/// Restore the global registry to the built-in components only.
pub fn reset_components() -> Result<()> {
    let registry = get_component_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocintError::LockPoisoned(format!("Component registry lock poisoned: {}", e)))?;
    *registry = ComponentRegistry::new();
    Ok(())
}
