//! Panel composition
//!
//! Builds the content shown alongside a subject: an optional link to the
//! external record describing it and an optional download link for the
//! sanitized export. Each link is independently capability-gated; an empty
//! panel is a normal outcome. Rendering is the host platform's job — this
//! produces structured content only.

use crate::access::{AccessGate, Actor, CAP_DOWNLOAD, CAP_LINK, CAP_VIEW_WARNINGS};
use crate::config::schema::LinkConfig;
use crate::error::BackupResult;
use crate::export::backup_filename;
use crate::link::{LinkResolver, LinkScope};
use crate::subject::Subject;
use serde::Serialize;

/// Link to the external record describing the subject
#[derive(Debug, Clone, Serialize)]
pub struct RecordLink {
    pub record_id: u64,
    pub record_module_id: u64,
    pub url: String,
}

/// Link to the export download endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    pub filename: String,
    pub href: String,
}

/// Structured panel content for one subject and actor
#[derive(Debug, Clone, Default, Serialize)]
pub struct PanelContent {
    pub record: Option<RecordLink>,
    pub download: Option<DownloadLink>,

    /// More than one record matched; shown only to privileged viewers
    pub ambiguity_warning: bool,
}

impl PanelContent {
    /// Whether there is anything to show
    pub fn is_empty(&self) -> bool {
        self.record.is_none() && self.download.is_none()
    }
}

/// Composes panel content from the gate, the resolver and the instance
/// configuration
pub struct Panel {
    gate: AccessGate,
    resolver: LinkResolver,
    link: LinkConfig,
}

impl Panel {
    pub fn new(gate: AccessGate, resolver: LinkResolver, link: LinkConfig) -> Self {
        Self {
            gate,
            resolver,
            link,
        }
    }

    /// Build the panel for a subject as seen by an actor
    pub async fn content(&self, subject: &Subject, actor: &Actor) -> BackupResult<PanelContent> {
        let mut content = PanelContent::default();

        if self.link.is_enabled() && self.gate.allowed(CAP_LINK, actor, subject.id).await? {
            let scope = LinkScope::new(self.link.record_module_id, self.link.field_id);
            let suffix = self.link.suffix_for(subject.id);
            let resolved = self.resolver.resolve(&scope, &suffix).await?;

            if let Some(target) = resolved.target {
                content.record = Some(RecordLink {
                    record_id: target.id,
                    record_module_id: target.record_module_id,
                    url: format!("/records/{}?rid={}", target.record_module_id, target.id),
                });
            }

            if resolved.ambiguous
                && self.gate.allowed(CAP_VIEW_WARNINGS, actor, subject.id).await?
            {
                content.ambiguity_warning = true;
            }
        }

        if self.gate.allowed(CAP_DOWNLOAD, actor, subject.id).await? {
            content.download = Some(DownloadLink {
                filename: backup_filename(&subject.name),
                href: format!("/subjects/{}/backup", subject.id),
            });
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AuthorizationProvider;
    use crate::link::{FieldStore, LinkTarget};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CapSet(Vec<&'static str>);

    #[async_trait]
    impl AuthorizationProvider for CapSet {
        async fn has_capability(
            &self,
            capability: &str,
            _actor: &Actor,
            _subject_id: u64,
        ) -> BackupResult<bool> {
            Ok(self.0.contains(&capability))
        }
    }

    struct CountingFieldStore {
        targets: Vec<LinkTarget>,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl FieldStore for CountingFieldStore {
        async fn query(
            &self,
            _record_module_id: u64,
            _field_id: u64,
            _suffix: &str,
        ) -> BackupResult<Vec<LinkTarget>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.targets.clone())
        }
    }

    fn target(id: u64) -> LinkTarget {
        LinkTarget {
            id,
            record_module_id: 5,
            field_id: 2,
            content: format!("https://host/view?id={}", id),
        }
    }

    fn enabled_link() -> LinkConfig {
        LinkConfig {
            record_module_id: 5,
            field_id: 2,
            ..LinkConfig::default()
        }
    }

    fn panel(
        caps: Vec<&'static str>,
        link: LinkConfig,
        targets: Vec<LinkTarget>,
    ) -> (Panel, Arc<CountingFieldStore>) {
        let fields = Arc::new(CountingFieldStore {
            targets,
            queries: AtomicUsize::new(0),
        });
        let panel = Panel::new(
            AccessGate::new(Arc::new(CapSet(caps))),
            LinkResolver::new(fields.clone()),
            link,
        );
        (panel, fields)
    }

    fn subject() -> Subject {
        Subject {
            id: 12,
            name: "Intro Quiz".to_string(),
        }
    }

    #[tokio::test]
    async fn no_capabilities_empty_panel() {
        let (panel, _) = panel(vec![], enabled_link(), vec![target(3)]);

        let content = panel.content(&subject(), &Actor::new("alice")).await.unwrap();
        assert!(content.is_empty());
        assert!(!content.ambiguity_warning);
    }

    #[tokio::test]
    async fn download_link_carries_derived_filename() {
        let (panel, _) = panel(vec![CAP_DOWNLOAD], enabled_link(), vec![]);

        let content = panel.content(&subject(), &Actor::new("alice")).await.unwrap();
        let download = content.download.unwrap();
        assert_eq!(download.filename, "intro_quiz.mbz");
        assert_eq!(download.href, "/subjects/12/backup");
        assert!(content.record.is_none());
    }

    #[tokio::test]
    async fn record_link_requires_capability_and_match() {
        let (panel, _) = panel(vec![CAP_LINK], enabled_link(), vec![target(3)]);

        let content = panel.content(&subject(), &Actor::new("alice")).await.unwrap();
        let record = content.record.unwrap();
        assert_eq!(record.record_id, 3);
        assert_eq!(record.url, "/records/5?rid=3");
        assert!(content.download.is_none());
    }

    #[tokio::test]
    async fn unset_config_never_queries() {
        let (panel, fields) = panel(
            vec![CAP_LINK, CAP_DOWNLOAD],
            LinkConfig::default(),
            vec![target(3)],
        );

        let content = panel.content(&subject(), &Actor::new("alice")).await.unwrap();
        assert!(content.record.is_none());
        assert!(content.download.is_some());
        assert_eq!(fields.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ambiguity_hidden_from_unprivileged() {
        let (panel, _) = panel(vec![CAP_LINK], enabled_link(), vec![target(3), target(9)]);

        let content = panel.content(&subject(), &Actor::new("alice")).await.unwrap();
        assert_eq!(content.record.unwrap().record_id, 3);
        assert!(!content.ambiguity_warning);
    }

    #[tokio::test]
    async fn ambiguity_shown_to_privileged() {
        let (panel, _) = panel(
            vec![CAP_LINK, CAP_VIEW_WARNINGS],
            enabled_link(),
            vec![target(3), target(9)],
        );

        let content = panel.content(&subject(), &Actor::new("alice")).await.unwrap();
        assert!(content.ambiguity_warning);
    }
}
