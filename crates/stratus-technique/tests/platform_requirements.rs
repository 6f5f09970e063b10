//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "tests"
//! srt_type: "test"
//! srt_scope: "code"
//! srt_description: "Authentication precondition checks across a batch of techniques."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stratus_technique::{
    verify_platform_requirements, AttackTechnique, AuthenticationError, CloudProviders, Detonator,
    Outputs, Platform,
};
use uuid::Uuid;

struct Noop;

#[async_trait]
impl Detonator for Noop {
    async fn detonate(&self, _: &Outputs, _: &dyn CloudProviders) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingProviders {
    checked: Mutex<Vec<Platform>>,
    reject: Option<Platform>,
}

#[async_trait]
impl CloudProviders for RecordingProviders {
    fn correlation_id(&self) -> Uuid {
        Uuid::nil()
    }

    async fn ensure_authenticated(&self, platform: Platform) -> Result<(), AuthenticationError> {
        self.checked.lock().unwrap().push(platform);
        if self.reject == Some(platform) {
            return Err(AuthenticationError::NotAuthenticated {
                platform,
                hint: "denied".into(),
            });
        }
        Ok(())
    }
}

fn techniques() -> Vec<Arc<AttackTechnique>> {
    [
        ("aws.one", Platform::Aws),
        ("aws.two", Platform::Aws),
        ("k8s.one", Platform::Kubernetes),
        ("gcp.one", Platform::Gcp),
    ]
    .into_iter()
    .map(|(id, platform)| Arc::new(AttackTechnique::builder(id, platform, Arc::new(Noop)).build()))
    .collect()
}

#[tokio::test]
async fn each_platform_is_checked_once() {
    let providers = RecordingProviders::default();
    verify_platform_requirements(&techniques(), &providers)
        .await
        .unwrap();
    assert_eq!(
        *providers.checked.lock().unwrap(),
        vec![Platform::Aws, Platform::Kubernetes, Platform::Gcp]
    );
}

#[tokio::test]
async fn first_failure_stops_verification() {
    let providers = RecordingProviders {
        reject: Some(Platform::Kubernetes),
        ..RecordingProviders::default()
    };
    let err = verify_platform_requirements(&techniques(), &providers)
        .await
        .unwrap_err();
    assert_eq!(err.platform(), Platform::Kubernetes);
    assert_eq!(
        *providers.checked.lock().unwrap(),
        vec![Platform::Aws, Platform::Kubernetes]
    );
}
