use crate::domain::errors::EngineResult;
use crate::domain::models::{EventKind, TrackedEvent};
use async_trait::async_trait;
use uuid::Uuid;

/// Counter snapshot for one variant, as derived from the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCounts {
    pub impressions: u64,
    pub conversions: u64,
}

/// Repository port for the append-only event log and the cached counters
/// derived from it.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Append an event and atomically bump the matching cached counter on
    /// its variant, in one transaction. The increment must be a storage-side
    /// `counter = counter + 1`, never an application-level read-modify-write.
    /// Fails with `InvalidTransition` unless the owning test is running; the
    /// status check shares the write transaction so a concurrent lifecycle
    /// change cannot slip an event past it.
    async fn record(&self, event: &TrackedEvent) -> EngineResult<()>;

    /// Count events for a whole test (used to guard deletion).
    async fn count_for_test(&self, test_id: Uuid) -> EngineResult<u64>;

    /// Count events of one kind for a variant (ground truth for the cache).
    async fn count_for_variant(&self, variant_id: Uuid, kind: EventKind) -> EngineResult<u64>;

    /// List events for a test, oldest first.
    async fn list_for_test(&self, test_id: Uuid) -> EngineResult<Vec<TrackedEvent>>;

    /// Recompute every variant counter of a test from event counts.
    /// Recovery path for a crash between event insert and counter bump.
    async fn reconcile(&self, test_id: Uuid) -> EngineResult<()>;

    /// Read the ground-truth counts for a variant from the event log.
    async fn counts_from_log(&self, variant_id: Uuid) -> EngineResult<EventCounts>;
}
