//! Capability checks
//!
//! Authorization decisions belong to the host platform; this module defines
//! the provider seam, the capability names the plugin checks, and a thin
//! gate so every protected operation goes through one call site. Decisions
//! are never cached here: permissions may change between calls.

use crate::config::schema::AccessConfig;
use crate::error::BackupResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Capability required to download a subject's export
pub const CAP_DOWNLOAD: &str = "autobackup:download";

/// Capability required to see the linked-record link
pub const CAP_LINK: &str = "autobackup:link";

/// Capability required to see ambiguity warnings
pub const CAP_VIEW_WARNINGS: &str = "autobackup:viewwarnings";

/// The acting user, as identified by the host platform's login layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Authorization seam owned by the host platform
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Whether the actor holds a capability in the given subject's scope
    async fn has_capability(
        &self,
        capability: &str,
        actor: &Actor,
        subject_id: u64,
    ) -> BackupResult<bool>;
}

/// Single entry point for capability checks
///
/// Pure delegation to the provider; exists so protected operations have
/// exactly one check call each.
#[derive(Clone)]
pub struct AccessGate {
    provider: Arc<dyn AuthorizationProvider>,
}

impl AccessGate {
    /// Create a gate over a provider
    pub fn new(provider: Arc<dyn AuthorizationProvider>) -> Self {
        Self { provider }
    }

    /// Whether the actor may perform the capability in the subject's scope
    pub async fn allowed(
        &self,
        capability: &str,
        actor: &Actor,
        subject_id: u64,
    ) -> BackupResult<bool> {
        self.provider
            .has_capability(capability, actor, subject_id)
            .await
    }
}

/// Config-driven authorizer for standalone deployments
///
/// Grants are a map of capability name to actor ids; the id `"*"` grants
/// every actor. Scope is ignored: grants are site-wide.
pub struct StaticAuthorizer {
    grants: HashMap<String, Vec<String>>,
}

impl StaticAuthorizer {
    /// Build from the `[access]` config section
    pub fn from_config(access: &AccessConfig) -> Self {
        Self {
            grants: access.grants.clone(),
        }
    }
}

#[async_trait]
impl AuthorizationProvider for StaticAuthorizer {
    async fn has_capability(
        &self,
        capability: &str,
        actor: &Actor,
        _subject_id: u64,
    ) -> BackupResult<bool> {
        let allowed = self
            .grants
            .get(capability)
            .is_some_and(|ids| ids.iter().any(|id| id == "*" || *id == actor.id));
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer(grants: &[(&str, &[&str])]) -> StaticAuthorizer {
        let mut access = AccessConfig::default();
        for (capability, ids) in grants {
            access.grants.insert(
                capability.to_string(),
                ids.iter().map(|id| id.to_string()).collect(),
            );
        }
        StaticAuthorizer::from_config(&access)
    }

    #[tokio::test]
    async fn ungranted_capability_is_denied() {
        let gate = AccessGate::new(Arc::new(authorizer(&[])));
        let actor = Actor::new("alice");

        assert!(!gate.allowed(CAP_DOWNLOAD, &actor, 12).await.unwrap());
    }

    #[tokio::test]
    async fn named_actor_is_allowed() {
        let gate = AccessGate::new(Arc::new(authorizer(&[(CAP_DOWNLOAD, &["alice"])])));

        assert!(gate
            .allowed(CAP_DOWNLOAD, &Actor::new("alice"), 12)
            .await
            .unwrap());
        assert!(!gate
            .allowed(CAP_DOWNLOAD, &Actor::new("bob"), 12)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn wildcard_grants_everyone() {
        let gate = AccessGate::new(Arc::new(authorizer(&[(CAP_LINK, &["*"])])));

        assert!(gate
            .allowed(CAP_LINK, &Actor::new("anyone"), 12)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn capabilities_are_independent() {
        let gate = AccessGate::new(Arc::new(authorizer(&[(CAP_DOWNLOAD, &["alice"])])));
        let actor = Actor::new("alice");

        assert!(gate.allowed(CAP_DOWNLOAD, &actor, 12).await.unwrap());
        assert!(!gate.allowed(CAP_VIEW_WARNINGS, &actor, 12).await.unwrap());
    }
}
