//! Autosave engine for the campaign editor.
//!
//! The editor hands its state slices to an [`AutosaveScheduler`] on every
//! change. The scheduler debounces, merges the slices additively over the
//! last saved [`CanonicalDocument`], skips writes whose [`Fingerprint`] is
//! unchanged, retries transient store failures with exponential backoff, and
//! records [`SaveMetrics`]. An [`UnmountFlushGuard`] performs one final write
//! when the editor session ends.

pub mod config;
pub mod document;
pub mod fingerprint;
pub mod game;
pub mod guard;
pub mod merge;
pub mod metrics;
pub mod retry;
pub mod scheduler;
pub mod state;
pub mod store;

pub use config::{AutosaveConfig, AutosaveMode};
pub use document::{CanonicalDocument, IdKind, is_persistable_id};
pub use fingerprint::{Fingerprint, fingerprint};
pub use game::{CampaignType, GameConfig};
pub use guard::UnmountFlushGuard;
pub use merge::merge;
pub use metrics::{SaveMetrics, SaveMetricsRecorder};
pub use retry::{RetryPolicy, with_retry};
pub use scheduler::{AutosaveError, AutosaveScheduler, SaveEvent, SaveOutcome, SaveState, SkipReason};
pub use state::EditorSlices;
pub use store::http::{HttpStore, StoreConfig};
pub use store::{CampaignStore, MemoryStore, StoreError};
