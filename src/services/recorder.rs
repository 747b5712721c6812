//! Event recorder: durable impression/conversion tracking.
//!
//! Each call appends one immutable event and bumps the variant's cached
//! counter atomically; calls are intentionally not idempotent, so callers
//! must invoke them exactly once per real impression or conversion.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{EventKind, TestStatus, TrackedEvent, VisitorKey};
use crate::domain::ports::{EventRepository, TestRepository};

pub struct EventRecorder<T: TestRepository, E: EventRepository> {
    test_repo: Arc<T>,
    event_repo: Arc<E>,
}

impl<T: TestRepository, E: EventRepository> EventRecorder<T, E> {
    pub fn new(test_repo: Arc<T>, event_repo: Arc<E>) -> Self {
        Self { test_repo, event_repo }
    }

    pub async fn record_impression(
        &self,
        test_id: Uuid,
        variant_id: Uuid,
        visitor: &VisitorKey,
    ) -> EngineResult<TrackedEvent> {
        self.record(test_id, variant_id, EventKind::Impression, visitor).await
    }

    pub async fn record_conversion(
        &self,
        test_id: Uuid,
        variant_id: Uuid,
        visitor: &VisitorKey,
    ) -> EngineResult<TrackedEvent> {
        self.record(test_id, variant_id, EventKind::Conversion, visitor).await
    }

    /// Rebuild a test's cached counters from the event log. Recovery path
    /// after a crash between an event insert and its counter bump.
    pub async fn reconcile(&self, test_id: Uuid) -> EngineResult<()> {
        let _ = self
            .test_repo
            .get(test_id)
            .await?
            .ok_or_else(|| EngineError::test_not_found(test_id))?;
        self.event_repo.reconcile(test_id).await
    }

    async fn record(
        &self,
        test_id: Uuid,
        variant_id: Uuid,
        kind: EventKind,
        visitor: &VisitorKey,
    ) -> EngineResult<TrackedEvent> {
        let test = self
            .test_repo
            .get(test_id)
            .await?
            .ok_or_else(|| EngineError::test_not_found(test_id))?;

        let variant = self
            .test_repo
            .get_variant(variant_id)
            .await?
            .filter(|v| v.test_id == test_id)
            .ok_or_else(|| EngineError::variant_not_found(variant_id))?;

        if test.status != TestStatus::Running {
            return Err(EngineError::InvalidTransition {
                from: test.status.as_str().to_string(),
                to: TestStatus::Running.as_str().to_string(),
                reason: format!("{} events are only recorded while the test is running", kind.as_str()),
            });
        }

        let event = TrackedEvent::new(test_id, variant.id, kind, visitor);
        self.event_repo.record(&event).await?;

        debug!(test_id = %test_id, variant_id = %variant.id, kind = kind.as_str(), "recorded event");
        Ok(event)
    }
}
