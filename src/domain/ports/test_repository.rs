use crate::domain::errors::EngineResult;
use crate::domain::models::{AbTest, TestStatus, Variant};
use async_trait::async_trait;
use uuid::Uuid;

/// Filters for querying tests.
#[derive(Default, Debug, Clone)]
pub struct TestFilter {
    pub status: Option<TestStatus>,
    pub name_contains: Option<String>,
}

/// A test together with its variant list, ordered by variant id for
/// deterministic assignment walks.
#[derive(Debug, Clone)]
pub struct TestWithVariants {
    pub test: AbTest,
    pub variants: Vec<Variant>,
}

/// Repository port for test and variant persistence.
#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Insert a new test together with its variant set.
    async fn create(&self, test: &AbTest, variants: &[Variant]) -> EngineResult<()>;

    /// Get a test by id.
    async fn get(&self, id: Uuid) -> EngineResult<Option<AbTest>>;

    /// Get a test with its variants, ordered by variant id.
    async fn get_with_variants(&self, id: Uuid) -> EngineResult<Option<TestWithVariants>>;

    /// Get a single variant by id.
    async fn get_variant(&self, id: Uuid) -> EngineResult<Option<Variant>>;

    /// Update test fields (not variants).
    async fn update(&self, test: &AbTest) -> EngineResult<()>;

    /// Replace the variant set of a draft test.
    async fn replace_variants(&self, test_id: Uuid, variants: &[Variant]) -> EngineResult<()>;

    /// Delete a test; variants and events cascade.
    async fn delete(&self, id: Uuid) -> EngineResult<()>;

    /// List tests matching the filter, newest first.
    async fn list(&self, filter: TestFilter) -> EngineResult<Vec<AbTest>>;

    /// List running tests with their full variant lists.
    async fn list_active(&self) -> EngineResult<Vec<TestWithVariants>>;
}
