//! Test registry: owns test and variant definitions and their lifecycle
//! state, and enforces the creation/update/delete invariants.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{AbTest, TestDefinition, TestPatch, TestStatus};
use crate::domain::ports::{EventRepository, TestFilter, TestRepository, TestWithVariants};

pub struct TestRegistry<T: TestRepository, E: EventRepository> {
    test_repo: Arc<T>,
    event_repo: Arc<E>,
}

impl<T: TestRepository, E: EventRepository> TestRegistry<T, E> {
    pub fn new(test_repo: Arc<T>, event_repo: Arc<E>) -> Self {
        Self { test_repo, event_repo }
    }

    /// Create a new draft test from a validated definition.
    pub async fn create_test(&self, definition: &TestDefinition) -> EngineResult<TestWithVariants> {
        definition.validate()?;

        let mut test = definition.test.clone();
        test.status = TestStatus::Draft;
        let variants = definition.build_variants();

        self.test_repo.create(&test, &variants).await?;
        info!(test_id = %test.id, name = %test.name, "created draft test");

        Ok(TestWithVariants { test, variants })
    }

    pub async fn get_test(&self, id: Uuid) -> EngineResult<TestWithVariants> {
        self.test_repo
            .get_with_variants(id)
            .await?
            .ok_or_else(|| EngineError::test_not_found(id))
    }

    /// Running tests with their full variant lists. The one operation with
    /// no caller authorization requirement: client-side assignment depends
    /// on it.
    pub async fn list_active_tests(&self) -> EngineResult<Vec<TestWithVariants>> {
        self.test_repo.list_active().await
    }

    pub async fn list_tests(&self, filter: TestFilter) -> EngineResult<Vec<AbTest>> {
        self.test_repo.list(filter).await
    }

    /// Apply a partial update.
    ///
    /// While draft everything may change, including a full variant-set
    /// replacement. Post-draft, structural edits are rejected, and the
    /// evaluation parameters may only change while no events exist yet.
    pub async fn update_test(&self, id: Uuid, patch: TestPatch) -> EngineResult<TestWithVariants> {
        let mut current = self.get_test(id).await?;
        let is_draft = current.test.status == TestStatus::Draft;

        if !is_draft && patch.is_structural() {
            return Err(EngineError::InvalidTransition {
                from: current.test.status.as_str().to_string(),
                to: current.test.status.as_str().to_string(),
                reason: "structural edits are only permitted while the test is in draft".to_string(),
            });
        }

        if !is_draft && patch.touches_evaluation() {
            let events = self.event_repo.count_for_test(id).await?;
            if events > 0 {
                return Err(EngineError::InvalidTransition {
                    from: current.test.status.as_str().to_string(),
                    to: current.test.status.as_str().to_string(),
                    reason: "evaluation parameters are frozen once events have been recorded"
                        .to_string(),
                });
            }
        }

        if let Some(name) = patch.name {
            current.test.name = name;
        }
        if let Some(description) = patch.description {
            current.test.description = description;
        }
        if let Some(selector) = patch.element_selector {
            current.test.element_selector = selector;
        }
        if let Some(goal_type) = patch.goal_type {
            current.test.goal_type = goal_type;
        }
        if let Some(goal_selector) = patch.goal_selector {
            current.test.goal_selector = goal_selector;
        }
        if let Some(size) = patch.min_sample_size {
            current.test.min_sample_size = size;
        }
        if let Some(level) = patch.confidence_level {
            current.test.confidence_level = level;
        }

        // Status changes go through the state machine like any other
        // transition request.
        if let Some(status) = patch.status {
            if status != current.test.status {
                current.test.transition_to(status)?;
            }
        }

        let replacement = match patch.variants {
            Some(definitions) => {
                let definition = TestDefinition {
                    test: current.test.clone(),
                    variants: definitions,
                };
                definition.validate()?;
                Some(definition.build_variants())
            }
            None => {
                current.test.validate()?;
                None
            }
        };

        current.test.updated_at = chrono::Utc::now();
        self.test_repo.update(&current.test).await?;

        if let Some(variants) = replacement {
            self.test_repo.replace_variants(id, &variants).await?;
            current.variants = variants;
        }

        info!(test_id = %id, "updated test");
        Ok(current)
    }

    /// Delete a test and (by cascade) its variants. Refused while any
    /// impression or conversion references it, so historical analytics are
    /// never orphaned.
    pub async fn delete_test(&self, id: Uuid) -> EngineResult<()> {
        // Existence check first so unknown ids surface as NotFound.
        let _ = self.get_test(id).await?;

        let events = self.event_repo.count_for_test(id).await?;
        if events > 0 {
            return Err(EngineError::Conflict(format!(
                "test {id} has {events} recorded event(s); tests with events cannot be deleted"
            )));
        }

        self.test_repo.delete(id).await?;
        info!(test_id = %id, "deleted test");
        Ok(())
    }
}
