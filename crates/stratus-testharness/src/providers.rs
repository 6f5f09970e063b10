//! ---
//! srt_section: "11-simulation"
//! srt_subsection: "01-bootstrap"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Configurable cloud provider double."
//! srt_version: "v0.1.0"
//! srt_owner: "tbd"
//! ---
use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use stratus_technique::{AuthenticationError, CloudProviders, Platform};
use uuid::Uuid;

/// Providers that authenticate every platform except the denied ones.
#[derive(Debug)]
pub struct FakeProviders {
    correlation_id: Uuid,
    denied: Mutex<HashSet<Platform>>,
    checked: Mutex<Vec<Platform>>,
}

impl Default for FakeProviders {
    fn default() -> Self {
        Self::new(Uuid::nil())
    }
}

impl FakeProviders {
    pub fn new(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            denied: Mutex::new(HashSet::new()),
            checked: Mutex::new(Vec::new()),
        }
    }

    pub fn deny(&self, platform: Platform) {
        self.denied.lock().insert(platform);
    }

    /// Platforms passed to `ensure_authenticated`, in call order.
    pub fn checked(&self) -> Vec<Platform> {
        self.checked.lock().clone()
    }
}

#[async_trait]
impl CloudProviders for FakeProviders {
    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    async fn ensure_authenticated(&self, platform: Platform) -> Result<(), AuthenticationError> {
        self.checked.lock().push(platform);
        if self.denied.lock().contains(&platform) {
            return Err(AuthenticationError::NotAuthenticated {
                platform,
                hint: format!("not authenticated against {platform}"),
            });
        }
        Ok(())
    }
}
