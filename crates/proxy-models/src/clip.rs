//! Shared handle to a live clip (producer) in the media graph.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::keys;
use crate::properties::Properties;

/// A live producer whose properties may be mutated after a proxy job
/// completes.
///
/// Cloning the handle shares the underlying properties, so several cuts of the
/// same producer observe a retarget at once.
#[derive(Clone, Default)]
pub struct Clip {
    inner: Arc<RwLock<Properties>>,
}

impl Clip {
    /// Create a clip from its properties.
    pub fn new(properties: Properties) -> Self {
        Self {
            inner: Arc::new(RwLock::new(properties)),
        }
    }

    /// Create a clip from a service name and resource.
    pub fn with_resource(service: &str, resource: &str) -> Self {
        let mut props = Properties::new();
        props.set(keys::MLT_SERVICE, service);
        props.set(keys::RESOURCE, resource);
        Self::new(props)
    }

    fn read(&self) -> RwLockReadGuard<'_, Properties> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Properties> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).map(str::to_string)
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.read().get_int(key)
    }

    pub fn get_double(&self, key: &str) -> f64 {
        self.read().get_double(key)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.read().flag(key)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write().set(key, value);
    }

    pub fn set_int(&self, key: impl Into<String>, value: i64) {
        self.write().set_int(key, value);
    }

    /// Copy of the current properties.
    pub fn snapshot(&self) -> Properties {
        self.read().clone()
    }

    /// Apply several changes under one write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut Properties) -> R) -> R {
        f(&mut self.write())
    }

    /// The `mlt_service` of this clip, empty when unset.
    pub fn service(&self) -> String {
        self.get(keys::MLT_SERVICE).unwrap_or_default()
    }

    /// True when the clip already points at a proxy.
    pub fn is_proxy(&self) -> bool {
        self.flag(keys::IS_PROXY)
    }

    /// True when both handles refer to the same producer.
    pub fn ptr_eq(&self, other: &Clip) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clip").field(&*self.read()).finish()
    }
}

impl From<Properties> for Clip {
    fn from(properties: Properties) -> Self {
        Self::new(properties)
    }
}
