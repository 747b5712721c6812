//! SQLite implementation of the TestRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{AbTest, GoalType, TestStatus, Variant, VariantChanges};
use crate::domain::ports::{TestFilter, TestRepository, TestWithVariants};

#[derive(Clone)]
pub struct SqliteTestRepository {
    pool: SqlitePool,
}

impl SqliteTestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_variants(&self, test_id: Uuid) -> EngineResult<Vec<Variant>> {
        let rows: Vec<VariantRow> = sqlx::query_as(
            "SELECT * FROM variants WHERE test_id = ? ORDER BY id"
        )
        .bind(test_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

}

async fn insert_variant(
    conn: &mut sqlx::SqliteConnection,
    variant: &Variant,
) -> EngineResult<()> {
    let changes_json = serde_json::to_string(&variant.changes)?;
    sqlx::query(
        r#"INSERT INTO variants (id, test_id, name, description, changes, is_control,
           weight, impressions, conversions, conversion_rate)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
    )
    .bind(variant.id.to_string())
    .bind(variant.test_id.to_string())
    .bind(&variant.name)
    .bind(&variant.description)
    .bind(&changes_json)
    .bind(variant.is_control)
    .bind(variant.weight as i64)
    .bind(variant.impressions as i64)
    .bind(variant.conversions as i64)
    .bind(variant.conversion_rate)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl TestRepository for SqliteTestRepository {
    async fn create(&self, test: &AbTest, variants: &[Variant]) -> EngineResult<()> {
        // The test row and its variant rows land together or not at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO tests (id, name, description, status, element_selector, goal_type,
               goal_selector, min_sample_size, confidence_level, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(test.id.to_string())
        .bind(&test.name)
        .bind(&test.description)
        .bind(test.status.as_str())
        .bind(&test.element_selector)
        .bind(test.goal_type.as_str())
        .bind(&test.goal_selector)
        .bind(i64::from(test.min_sample_size))
        .bind(test.confidence_level)
        .bind(test.created_at.to_rfc3339())
        .bind(test.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for variant in variants {
            insert_variant(&mut tx, variant).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<AbTest>> {
        let row: Option<TestRow> = sqlx::query_as("SELECT * FROM tests WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_with_variants(&self, id: Uuid) -> EngineResult<Option<TestWithVariants>> {
        let Some(test) = self.get(id).await? else {
            return Ok(None);
        };
        let variants = self.load_variants(id).await?;
        Ok(Some(TestWithVariants { test, variants }))
    }

    async fn get_variant(&self, id: Uuid) -> EngineResult<Option<Variant>> {
        let row: Option<VariantRow> = sqlx::query_as("SELECT * FROM variants WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, test: &AbTest) -> EngineResult<()> {
        let result = sqlx::query(
            r#"UPDATE tests SET name = ?, description = ?, status = ?, element_selector = ?,
               goal_type = ?, goal_selector = ?, min_sample_size = ?, confidence_level = ?,
               updated_at = ?
               WHERE id = ?"#
        )
        .bind(&test.name)
        .bind(&test.description)
        .bind(test.status.as_str())
        .bind(&test.element_selector)
        .bind(test.goal_type.as_str())
        .bind(&test.goal_selector)
        .bind(i64::from(test.min_sample_size))
        .bind(test.confidence_level)
        .bind(test.updated_at.to_rfc3339())
        .bind(test.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::test_not_found(test.id));
        }

        Ok(())
    }

    async fn replace_variants(&self, test_id: Uuid, variants: &[Variant]) -> EngineResult<()> {
        // Delete and reinsert in one transaction; a failed insert leaves the
        // old variant set in place.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM variants WHERE test_id = ?")
            .bind(test_id.to_string())
            .execute(&mut *tx)
            .await?;

        for variant in variants {
            insert_variant(&mut tx, variant).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM tests WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::test_not_found(id));
        }

        Ok(())
    }

    async fn list(&self, filter: TestFilter) -> EngineResult<Vec<AbTest>> {
        let mut query = String::from("SELECT * FROM tests WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = &filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(fragment) = &filter.name_contains {
            query.push_str(" AND name LIKE ?");
            bindings.push(format!("%{fragment}%"));
        }

        query.push_str(" ORDER BY created_at DESC");

        let mut q = sqlx::query_as::<_, TestRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TestRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_active(&self) -> EngineResult<Vec<TestWithVariants>> {
        let tests = self
            .list(TestFilter { status: Some(TestStatus::Running), ..Default::default() })
            .await?;

        let mut active = Vec::with_capacity(tests.len());
        for test in tests {
            let variants = self.load_variants(test.id).await?;
            active.push(TestWithVariants { test, variants });
        }
        Ok(active)
    }
}

#[derive(sqlx::FromRow)]
struct TestRow {
    id: String,
    name: String,
    description: String,
    status: String,
    element_selector: String,
    goal_type: String,
    goal_selector: Option<String>,
    min_sample_size: i64,
    confidence_level: f64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TestRow> for AbTest {
    type Error = EngineError;

    fn try_from(row: TestRow) -> Result<Self, Self::Error> {
        let status = TestStatus::from_str(&row.status)
            .ok_or_else(|| EngineError::Serialization(format!("Invalid status: {}", row.status)))?;
        let goal_type = GoalType::from_str(&row.goal_type)
            .ok_or_else(|| EngineError::Serialization(format!("Invalid goal type: {}", row.goal_type)))?;

        Ok(AbTest {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            status,
            element_selector: row.element_selector,
            goal_type,
            goal_selector: row.goal_selector,
            min_sample_size: row.min_sample_size as u32,
            confidence_level: row.confidence_level,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: String,
    test_id: String,
    name: String,
    description: String,
    changes: String,
    is_control: bool,
    weight: i64,
    impressions: i64,
    conversions: i64,
    conversion_rate: f64,
}

impl TryFrom<VariantRow> for Variant {
    type Error = EngineError;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        let changes: VariantChanges = serde_json::from_str(&row.changes)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;

        Ok(Variant {
            id: parse_uuid(&row.id)?,
            test_id: parse_uuid(&row.test_id)?,
            name: row.name,
            description: row.description,
            changes,
            is_control: row.is_control,
            weight: row.weight as u32,
            impressions: row.impressions as u64,
            conversions: row.conversions as u64,
            conversion_rate: row.conversion_rate,
        })
    }
}
