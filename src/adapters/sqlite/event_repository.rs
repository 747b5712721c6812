//! SQLite implementation of the EventRepository.
//!
//! The owning test's status check, the event insert, and the cached counter
//! bump all share one transaction, and the bump is a storage-side
//! `counter = counter + 1` so concurrent recorders cannot lose updates.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{EventKind, TestStatus, TrackedEvent};
use crate::domain::ports::{EventCounts, EventRepository};

#[derive(Clone)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn record(&self, event: &TrackedEvent) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        // Status is checked inside the write transaction: a complete() or
        // stop() racing this call cannot land an event after the test has
        // left running.
        let status: Option<(String,)> = sqlx::query_as("SELECT status FROM tests WHERE id = ?")
            .bind(event.test_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let (status,) = status.ok_or_else(|| EngineError::test_not_found(event.test_id))?;
        if status != TestStatus::Running.as_str() {
            return Err(EngineError::InvalidTransition {
                from: status,
                to: TestStatus::Running.as_str().to_string(),
                reason: "events are only recorded while the test is running".to_string(),
            });
        }

        sqlx::query(
            r#"INSERT INTO events (id, test_id, variant_id, kind, user_id, session_id, occurred_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(event.id.to_string())
        .bind(event.test_id.to_string())
        .bind(event.variant_id.to_string())
        .bind(event.kind.as_str())
        .bind(&event.user_id)
        .bind(&event.session_id)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let counter_sql = match event.kind {
            EventKind::Impression => {
                "UPDATE variants SET impressions = impressions + 1 WHERE id = ?"
            }
            EventKind::Conversion => {
                "UPDATE variants SET conversions = conversions + 1 WHERE id = ?"
            }
        };
        let bumped = sqlx::query(counter_sql)
            .bind(event.variant_id.to_string())
            .execute(&mut *tx)
            .await?;

        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(EngineError::variant_not_found(event.variant_id));
        }

        // The rate cache follows the counters inside the same transaction.
        sqlx::query(
            r#"UPDATE variants
               SET conversion_rate = CASE WHEN impressions > 0
                   THEN CAST(conversions AS REAL) / impressions ELSE 0.0 END
               WHERE id = ?"#
        )
        .bind(event.variant_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn count_for_test(&self, test_id: Uuid) -> EngineResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events WHERE test_id = ?")
            .bind(test_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_for_variant(&self, variant_id: Uuid, kind: EventKind) -> EngineResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM events WHERE variant_id = ? AND kind = ?")
                .bind(variant_id.to_string())
                .bind(kind.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn list_for_test(&self, test_id: Uuid) -> EngineResult<Vec<TrackedEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT * FROM events WHERE test_id = ? ORDER BY occurred_at, id"
        )
        .bind(test_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn reconcile(&self, test_id: Uuid) -> EngineResult<()> {
        sqlx::query(
            r#"UPDATE variants SET
                 impressions = (SELECT COUNT(*) FROM events
                                WHERE events.variant_id = variants.id AND kind = 'impression'),
                 conversions = (SELECT COUNT(*) FROM events
                                WHERE events.variant_id = variants.id AND kind = 'conversion')
               WHERE test_id = ?"#
        )
        .bind(test_id.to_string())
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"UPDATE variants
               SET conversion_rate = CASE WHEN impressions > 0
                   THEN CAST(conversions AS REAL) / impressions ELSE 0.0 END
               WHERE test_id = ?"#
        )
        .bind(test_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn counts_from_log(&self, variant_id: Uuid) -> EngineResult<EventCounts> {
        let impressions = self.count_for_variant(variant_id, EventKind::Impression).await?;
        let conversions = self.count_for_variant(variant_id, EventKind::Conversion).await?;
        Ok(EventCounts { impressions, conversions })
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    test_id: String,
    variant_id: String,
    kind: String,
    user_id: Option<String>,
    session_id: Option<String>,
    occurred_at: String,
}

impl TryFrom<EventRow> for TrackedEvent {
    type Error = EngineError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let kind = EventKind::from_str(&row.kind)
            .ok_or_else(|| EngineError::Serialization(format!("Invalid event kind: {}", row.kind)))?;

        Ok(TrackedEvent {
            id: parse_uuid(&row.id)?,
            test_id: parse_uuid(&row.test_id)?,
            variant_id: parse_uuid(&row.variant_id)?,
            kind,
            user_id: row.user_id,
            session_id: row.session_id,
            occurred_at: parse_datetime(&row.occurred_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::test_repository::SqliteTestRepository;
    use crate::domain::models::{AbTest, GoalType, TestDefinition, VariantDefinition, VisitorKey};
    use crate::domain::ports::TestRepository;

    async fn setup() -> (SqliteTestRepository, SqliteEventRepository, TestDefinition, Vec<crate::domain::models::Variant>) {
        let pool = create_migrated_test_pool().await.unwrap();
        let tests = SqliteTestRepository::new(pool.clone());
        let events = SqliteEventRepository::new(pool);

        let mut def = TestDefinition {
            test: AbTest::new("Landing hero", "#hero", GoalType::Click),
            variants: vec![
                VariantDefinition::control("A"),
                VariantDefinition::treatment("B"),
            ],
        };
        def.test.status = TestStatus::Running;
        let variants = def.build_variants();
        tests.create(&def.test, &variants).await.unwrap();
        (tests, events, def, variants)
    }

    #[tokio::test]
    async fn test_record_increments_counter_and_rate() {
        let (tests, events, def, variants) = setup().await;
        let visitor = VisitorKey::Anonymous("s1".to_string());

        let imp = TrackedEvent::new(def.test.id, variants[0].id, EventKind::Impression, &visitor);
        events.record(&imp).await.unwrap();
        let conv = TrackedEvent::new(def.test.id, variants[0].id, EventKind::Conversion, &visitor);
        events.record(&conv).await.unwrap();

        let variant = tests.get_variant(variants[0].id).await.unwrap().unwrap();
        assert_eq!(variant.impressions, 1);
        assert_eq!(variant.conversions, 1);
        assert!((variant.conversion_rate - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_record_unknown_variant_fails() {
        let (_tests, events, def, _variants) = setup().await;
        let visitor = VisitorKey::User("u1".to_string());

        let event = TrackedEvent::new(def.test.id, Uuid::new_v4(), EventKind::Impression, &visitor);
        let err = events.record(&event).await.unwrap_err();
        // Either the FK rejects the insert or the bump touches no rows.
        assert!(matches!(err, EngineError::Database(_) | EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_record_rejects_test_no_longer_running() {
        let (tests, events, def, variants) = setup().await;
        let mut test = tests.get(def.test.id).await.unwrap().unwrap();
        test.transition_to(TestStatus::Completed).unwrap();
        tests.update(&test).await.unwrap();

        let visitor = VisitorKey::Anonymous("s9".to_string());
        let event =
            TrackedEvent::new(def.test.id, variants[0].id, EventKind::Impression, &visitor);
        let err = events.record(&event).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_reconcile_rebuilds_counters_from_log() {
        let (tests, events, def, variants) = setup().await;
        let visitor = VisitorKey::Anonymous("s1".to_string());

        for _ in 0..5 {
            let e = TrackedEvent::new(def.test.id, variants[1].id, EventKind::Impression, &visitor);
            events.record(&e).await.unwrap();
        }
        let c = TrackedEvent::new(def.test.id, variants[1].id, EventKind::Conversion, &visitor);
        events.record(&c).await.unwrap();

        // Corrupt the cache, then reconcile from the log.
        sqlx::query("UPDATE variants SET impressions = 999, conversions = 999 WHERE id = ?")
            .bind(variants[1].id.to_string())
            .execute(&events.pool)
            .await
            .unwrap();

        events.reconcile(def.test.id).await.unwrap();

        let variant = tests.get_variant(variants[1].id).await.unwrap().unwrap();
        assert_eq!(variant.impressions, 5);
        assert_eq!(variant.conversions, 1);
        assert!((variant.conversion_rate - 0.2).abs() < 1e-9);

        let counts = events.counts_from_log(variants[1].id).await.unwrap();
        assert_eq!(counts, EventCounts { impressions: 5, conversions: 1 });
    }
}
