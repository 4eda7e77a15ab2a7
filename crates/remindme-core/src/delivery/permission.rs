use async_trait::async_trait;

use crate::activation::{Permission, PermissionBroker};
use crate::storage::Config;

/// Always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub Permission);

#[async_trait]
impl PermissionBroker for StaticPermission {
    async fn request_notification_permission(&self) -> Permission {
        self.0
    }
}

/// Grants notifications when `notifications.enabled` is set in the config.
#[derive(Debug, Clone, Copy)]
pub struct ConfigPermission {
    enabled: bool,
}

impl ConfigPermission {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.notifications.enabled,
        }
    }
}

#[async_trait]
impl PermissionBroker for ConfigPermission {
    async fn request_notification_permission(&self) -> Permission {
        if self.enabled {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }
}
