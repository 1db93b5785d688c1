//! Capability-scoped resource lookup for tool executors.
//!
//! Executors never reach for global state; whatever data they need is placed
//! in an [`ExecutionContext`] by whoever composes the application (or a test).

use crate::error::ToolError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Resource = Arc<dyn Any + Send + Sync>;

/// Named, typed resources handed to every tool invocation.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    resources: HashMap<String, Resource>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert_resource`](Self::insert_resource).
    pub fn with_resource<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.insert_resource(key, value);
        self
    }

    pub fn insert_resource<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.resources.insert(key.into(), Arc::new(value));
    }

    pub fn has_resource(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    /// Look up a resource by key.
    ///
    /// Fails when the key is unknown or holds a value of another type.
    pub fn get_resource<T>(&self, key: &str) -> Result<Arc<T>, ToolError>
    where
        T: Any + Send + Sync,
    {
        let resource = self
            .resources
            .get(key)
            .ok_or_else(|| ToolError::MissingResource(key.to_string()))?;
        Arc::clone(resource).downcast::<T>().map_err(|_| {
            ToolError::ExecutionFailed(format!(
                "resource {key} is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("ExecutionContext")
            .field("resources", &keys)
            .finish()
    }
}
