//! Linked-record discovery
//!
//! A subject may have one external record describing it, discovered by
//! matching a reference suffix against field content in an externally owned
//! record store. Zero matches is normal; more than one is an ambiguity the
//! caller may surface to privileged viewers.

pub mod json;

pub use json::JsonFieldStore;

use crate::error::BackupResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// An external record matched by a field-content query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTarget {
    /// Record id
    pub id: u64,

    /// Id of the record module owning the record
    pub record_module_id: u64,

    /// Id of the field the content lives in
    pub field_id: u64,

    /// The matched field content
    pub content: String,
}

/// Query scope: which record module and field to search
///
/// Either id left at 0 disables resolution entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkScope {
    pub record_module_id: u64,
    pub field_id: u64,
}

impl LinkScope {
    pub fn new(record_module_id: u64, field_id: u64) -> Self {
        Self {
            record_module_id,
            field_id,
        }
    }

    /// Whether the scope is configured at all
    pub fn is_enabled(&self) -> bool {
        self.record_module_id != 0 && self.field_id != 0
    }
}

/// Outcome of a link resolution
#[derive(Debug, Clone, Default)]
pub struct LinkMatch {
    /// The matched record, lowest id on ambiguity
    pub target: Option<LinkTarget>,

    /// More than one record matched
    pub ambiguous: bool,
}

impl LinkMatch {
    /// No match at all
    pub fn none() -> Self {
        Self::default()
    }
}

/// Read-only query seam over the external record/field store
///
/// Matching is a case-insensitive ends-with of `suffix` against field
/// content; results come back ordered by ascending record id.
#[async_trait]
pub trait FieldStore: Send + Sync {
    async fn query(
        &self,
        record_module_id: u64,
        field_id: u64,
        suffix: &str,
    ) -> BackupResult<Vec<LinkTarget>>;
}

/// Resolves the zero-or-one linked record for a subject
pub struct LinkResolver {
    fields: Arc<dyn FieldStore>,
}

impl LinkResolver {
    /// Create a resolver over a field store
    pub fn new(fields: Arc<dyn FieldStore>) -> Self {
        Self { fields }
    }

    /// Find the linked record for a scope and reference suffix
    ///
    /// Disabled scope short-circuits to no match without querying. With
    /// multiple matches the lowest-id record wins and the result is flagged
    /// ambiguous.
    pub async fn resolve(&self, scope: &LinkScope, suffix: &str) -> BackupResult<LinkMatch> {
        if !scope.is_enabled() {
            return Ok(LinkMatch::none());
        }

        let mut matches = self
            .fields
            .query(scope.record_module_id, scope.field_id, suffix)
            .await?;

        if matches.is_empty() {
            debug!("No linked record for suffix {:?}", suffix);
            return Ok(LinkMatch::none());
        }

        // The store promises id order; don't rely on it.
        matches.sort_by_key(|target| target.id);

        let ambiguous = matches.len() > 1;
        if ambiguous {
            warn!(
                "{} records match suffix {:?}, using lowest id {}",
                matches.len(),
                suffix,
                matches[0].id
            );
        }

        Ok(LinkMatch {
            target: matches.into_iter().next(),
            ambiguous,
        })
    }
}
