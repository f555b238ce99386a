//! Resource and user lookups the aggregation core depends on
//!
//! Both are simple request/response capabilities. `InMemoryDirectory`
//! implements them from maps that the runtime fills as events arrive.

use crate::aggregation::types::ResourceDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Resolves resource ids (or version series ids) to descriptors
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// `Ok(None)` when the resource no longer exists
    async fn lookup_resource(&self, id: &str) -> Result<Option<ResourceDescriptor>>;
}

/// Resolves user ids to human-readable names
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_user_display_name(&self, user_id: &str) -> Result<String>;
}

/// Map-backed directory for both lookups
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    resources: RwLock<HashMap<String, ResourceDescriptor>>,
    users: RwLock<HashMap<String, String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a resource under both its id and its version series id
    pub fn insert_resource(&self, resource: ResourceDescriptor) {
        let mut resources = self.resources.write().unwrap_or_else(|e| e.into_inner());
        if let Some(series_id) = resource.version_series_id.clone() {
            resources.insert(series_id, resource.clone());
        }
        resources.insert(resource.id.clone(), resource);
    }

    pub fn remove_resource(&self, id: &str) -> Option<ResourceDescriptor> {
        let mut resources = self.resources.write().unwrap_or_else(|e| e.into_inner());
        let removed = resources.remove(id)?;
        resources.retain(|_, r| r.id != removed.id);
        Some(removed)
    }

    pub fn insert_user(&self, user_id: impl Into<String>, display_name: impl Into<String>) {
        self.users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.into(), display_name.into());
    }
}

#[async_trait]
impl ResourceLookup for InMemoryDirectory {
    async fn lookup_resource(&self, id: &str) -> Result<Option<ResourceDescriptor>> {
        let resources = self.resources.read().unwrap_or_else(|e| e.into_inner());
        Ok(resources.get(id).cloned())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    /// Unknown users resolve to their raw id
    async fn lookup_user_display_name(&self, user_id: &str) -> Result<String> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(user_id).cloned().unwrap_or_else(|| user_id.to_string()))
    }
}
