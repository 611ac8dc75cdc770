//! Platform permissions the foreground listener needs before it subscribes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadPhoneState,
    ReadCallLog,
    PostNotifications,
}

impl Permission {
    pub const REQUIRED: [Permission; 3] = [
        Permission::ReadPhoneState,
        Permission::ReadCallLog,
        Permission::PostNotifications,
    ];
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Requests `permissions` and returns the subset that was denied.
    async fn request(&self, permissions: &[Permission]) -> Vec<Permission>;
}

/// Answers from a fixed grant list (host-provided, e.g. from config).
#[derive(Debug, Clone)]
pub struct StaticPermissions {
    granted: Vec<Permission>,
}

impl StaticPermissions {
    pub fn new(granted: Vec<Permission>) -> Self {
        Self { granted }
    }

    pub fn all() -> Self {
        Self::new(Permission::REQUIRED.to_vec())
    }
}

#[async_trait]
impl PermissionGate for StaticPermissions {
    async fn request(&self, permissions: &[Permission]) -> Vec<Permission> {
        permissions
            .iter()
            .copied()
            .filter(|permission| !self.granted.contains(permission))
            .collect()
    }
}
