//! Global label registry and per-lane token interning.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::collections::{read, write};
use crate::labels::{NodeLabel, NodeLabelToken};

// ── Global registry ────────────────────────────────────────────────

/// Process-wide (per import job) label → token table. Shared by all
/// lanes; insert-if-absent under a write lock.
#[derive(Default)]
pub struct LabelRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    tokens: HashMap<NodeLabel, u32>,
    labels: Vec<NodeLabel>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global token for `label`, registering it on first sight.
    pub fn get_or_register(&self, label: &NodeLabel) -> u32 {
        if let Some(&token) = read(&self.inner).tokens.get(label) {
            return token;
        }
        let mut inner = write(&self.inner);
        if let Some(&token) = inner.tokens.get(label) {
            return token;
        }
        let token = inner.labels.len() as u32;
        inner.labels.push(label.clone());
        inner.tokens.insert(label.clone(), token);
        token
    }

    pub fn label(&self, token: u32) -> Option<NodeLabel> {
        read(&self.inner).labels.get(token as usize).cloned()
    }

    /// All registered labels, indexed by global token.
    pub fn labels(&self) -> Vec<NodeLabel> {
        read(&self.inner).labels.clone()
    }

    pub fn len(&self) -> usize {
        read(&self.inner).labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Per-lane interning ─────────────────────────────────────────────

/// Labels of one local token, resolved against the global registry.
#[derive(Debug, Clone)]
pub struct ResolvedLabels {
    pub labels: Vec<NodeLabel>,
    pub global_tokens: Vec<u32>,
}

/// Lane-owned interning of label tokens into dense local ids. Never
/// shared between lanes; only the registry it resolves against is.
pub struct LocalLabelTokens {
    registry: Arc<LabelRegistry>,
    local: HashMap<NodeLabelToken, u32>,
    resolved: Vec<ResolvedLabels>,
}

impl LocalLabelTokens {
    pub fn new(registry: Arc<LabelRegistry>) -> Self {
        Self {
            registry,
            local: HashMap::new(),
            resolved: Vec::new(),
        }
    }

    /// Local id for `token`. The first time a lane sees a label set its
    /// labels are registered globally.
    pub fn token_for(&mut self, token: &NodeLabelToken) -> u32 {
        if let Some(&local) = self.local.get(token) {
            return local;
        }
        let labels = token.resolved();
        let global_tokens = labels
            .iter()
            .map(|label| self.registry.get_or_register(label))
            .collect();
        let local = self.resolved.len() as u32;
        self.resolved.push(ResolvedLabels { labels, global_tokens });
        self.local.insert(token.clone(), local);
        local
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Read-only view handed to the importer for one flush.
    pub fn mapping(&self) -> LabelMapping<'_> {
        LabelMapping { resolved: &self.resolved }
    }
}

/// Local token → resolved labels, valid for the duration of a flush.
#[derive(Clone, Copy)]
pub struct LabelMapping<'a> {
    resolved: &'a [ResolvedLabels],
}

impl<'a> LabelMapping<'a> {
    pub fn get(&self, local_token: u32) -> Option<&'a ResolvedLabels> {
        self.resolved.get(local_token as usize)
    }

    pub fn labels(&self, local_token: u32) -> &'a [NodeLabel] {
        self.get(local_token).map(|r| r.labels.as_slice()).unwrap_or(&[])
    }

    pub fn global_tokens(&self, local_token: u32) -> &'a [u32] {
        self.get(local_token).map(|r| r.global_tokens.as_slice()).unwrap_or(&[])
    }
}
