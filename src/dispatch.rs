//! Delivery of activities plus the lookups needed to build them
//!
//! Every failure here is logged and swallowed: a failed lookup drops the
//! affected activity, a failed send counts as delivered.

use crate::activity::{Activity, ActivityObject};
use crate::activity_log::ActivityLog;
use crate::aggregation::types::ResourceDescriptor;
use crate::directory::{ResourceLookup, UserDirectory};
use crate::transport::NotificationTransport;
use std::sync::Arc;

pub struct Dispatcher {
    transport: Arc<dyn NotificationTransport>,
    resources: Arc<dyn ResourceLookup>,
    users: Arc<dyn UserDirectory>,
    generator: Option<ActivityObject>,
    base_url: String,
    activity_log: Option<ActivityLog>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn NotificationTransport>,
        resources: Arc<dyn ResourceLookup>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            transport,
            resources,
            users,
            generator: None,
            base_url: String::new(),
            activity_log: None,
        }
    }

    /// Fixed generator object attached to synthesized activities
    pub fn with_generator(mut self, generator: ActivityObject) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Repository root used to build document URLs
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_activity_log(mut self, activity_log: ActivityLog) -> Self {
        self.activity_log = Some(activity_log);
        self
    }

    pub fn generator(&self) -> Option<&ActivityObject> {
        self.generator.as_ref()
    }

    /// Send one activity; returns false when the transport reported a failure
    pub async fn deliver(&self, activity: &Activity, user: &str) -> bool {
        if let Some(activity_log) = &self.activity_log {
            if let Err(e) = activity_log.record(activity, user) {
                log::warn!("⚠️  Failed to log activity for {}: {}", user, e);
            }
        }

        match self.transport.send(activity, user).await {
            Ok(()) => {
                log::debug!("✅ Sent '{}' activity to {} via {}", activity.verb, user, self.transport.transport_type());
                true
            }
            Err(e) => {
                log::error!("❌ Failed to send '{}' activity to {}: {}", activity.verb, user, e);
                false
            }
        }
    }

    /// Person object for a user, falling back to the raw id as name
    pub async fn actor_for(&self, user: &str) -> ActivityObject {
        let display_name = match self.users.lookup_user_display_name(user).await {
            Ok(name) => name,
            Err(e) => {
                log::warn!("⚠️  User lookup failed for {}: {}", user, e);
                user.to_string()
            }
        };

        ActivityObject::person(user, &display_name)
    }

    /// Resolve a resource, logging not-found and lookup failures
    pub async fn lookup_resource(&self, id: &str) -> Option<ResourceDescriptor> {
        match self.resources.lookup_resource(id).await {
            Ok(Some(resource)) => Some(resource),
            Ok(None) => {
                log::warn!("⚠️  Resource {} not found", id);
                None
            }
            Err(e) => {
                log::warn!("⚠️  Resource lookup failed for {}: {}", id, e);
                None
            }
        }
    }

    /// Document object for a resource id, `None` when it is gone
    pub async fn document_object(&self, resource_id: &str) -> Option<ActivityObject> {
        self.lookup_resource(resource_id)
            .await
            .map(|resource| ActivityObject::document(&resource, &self.base_url))
    }
}
