//! Store — the remote persistence API the engine writes through.
//!
//! DESIGN
//! ======
//! The remote store is the single source of truth for a campaign. The
//! engine only needs three calls, expressed as the `CampaignStore` trait so
//! the scheduler can be driven by the HTTP adapter in production and by the
//! in-memory store (or hand-written doubles) in tests and demos.

pub mod http;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use crate::document::CanonicalDocument;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("store request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status.
    #[error("store response error: status {status}")]
    Response { status: u16, body: String },

    /// The response body was not a campaign document.
    #[error("store response parse failed: {0}")]
    Parse(String),

    /// `update` targeted an id the store does not know.
    #[error("campaign not found: {0}")]
    NotFound(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl StoreError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_STORE_REQUEST",
            Self::Response { .. } => "E_STORE_RESPONSE",
            Self::Parse(_) => "E_STORE_PARSE",
            Self::NotFound(_) => "E_CAMPAIGN_NOT_FOUND",
            Self::ClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether a later attempt could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 408 | 429 | 500..=599, .. })
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Remote persistence for campaign documents.
#[async_trait::async_trait]
pub trait CampaignStore: Send + Sync {
    /// Insert a new document; the returned copy carries the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails.
    async fn create(&self, document: &CanonicalDocument) -> Result<CanonicalDocument, StoreError>;

    /// Replace the stored document `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails or `id` is unknown.
    async fn update(&self, id: &str, document: &CanonicalDocument) -> Result<CanonicalDocument, StoreError>;

    /// Fetch a document, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the read fails.
    async fn read(&self, id: &str) -> Result<Option<CanonicalDocument>, StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store keyed by UUID. Counts writes for diagnostics.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, CanonicalDocument>>,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create` plus `update` calls served.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.creates.load(Ordering::Relaxed) + self.updates.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl CampaignStore for MemoryStore {
    async fn create(&self, document: &CanonicalDocument) -> Result<CanonicalDocument, StoreError> {
        self.creates.fetch_add(1, Ordering::Relaxed);
        let id = Uuid::new_v4().to_string();
        let mut saved = document.clone();
        saved.id = Some(id.clone());
        self.documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id, saved.clone());
        Ok(saved)
    }

    async fn update(&self, id: &str, document: &CanonicalDocument) -> Result<CanonicalDocument, StoreError> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        let mut documents = self
            .documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(slot) = documents.get_mut(id) else {
            return Err(StoreError::NotFound(id.to_owned()));
        };
        let mut saved = document.clone();
        saved.id = Some(id.to_owned());
        *slot = saved.clone();
        Ok(saved)
    }

    async fn read(&self, id: &str) -> Result<Option<CanonicalDocument>, StoreError> {
        Ok(self
            .documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned())
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
