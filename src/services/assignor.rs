//! Variant assignor: deterministic, sticky visitor-to-variant mapping.
//!
//! Assignment is a pure function of `(test_id, visitor_key)`: a stable hash
//! reduced modulo the total weight, then a cumulative walk over the variant
//! list in a fixed order. Concurrent calls for the same visitor always
//! compute the same answer without coordination, and no per-visitor
//! assignment table is needed.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{TestStatus, Variant, VisitorKey};
use crate::domain::ports::TestRepository;

pub struct VariantAssignor<T: TestRepository> {
    test_repo: Arc<T>,
}

impl<T: TestRepository> VariantAssignor<T> {
    pub fn new(test_repo: Arc<T>) -> Self {
        Self { test_repo }
    }

    /// Resolve the sticky variant for a visitor on a running test.
    ///
    /// Read/compute-only: recording the impression is the caller's explicit
    /// next step, so UI re-renders do not double-count.
    pub async fn assign(&self, test_id: Uuid, visitor: &VisitorKey) -> EngineResult<Variant> {
        let loaded = self
            .test_repo
            .get_with_variants(test_id)
            .await?
            .ok_or_else(|| EngineError::test_not_found(test_id))?;

        if loaded.test.status != TestStatus::Running {
            return Err(EngineError::InvalidTransition {
                from: loaded.test.status.as_str().to_string(),
                to: TestStatus::Running.as_str().to_string(),
                reason: "only running tests assign visitors".to_string(),
            });
        }

        let variant = pick_variant(test_id, visitor.key(), &loaded.variants)
            .ok_or_else(|| EngineError::Precondition(format!("test {test_id} has no variants")))?;

        debug!(test_id = %test_id, variant_id = %variant.id, visitor = visitor.key(), "assigned variant");
        Ok(variant.clone())
    }
}

/// Pure assignment: hash `(test_id, key)` into `[0, total_weight)` and walk
/// the variants accumulating weights. Variants must arrive in a fixed order
/// (the repository orders by variant id).
pub fn pick_variant<'a>(test_id: Uuid, key: &str, variants: &'a [Variant]) -> Option<&'a Variant> {
    let total_weight: u64 = variants.iter().map(|v| u64::from(v.weight)).sum();
    if total_weight == 0 {
        return None;
    }

    let hash = xxh3_64(format!("{test_id}:{key}").as_bytes());
    let point = hash % total_weight;

    let mut cumulative = 0u64;
    for variant in variants {
        cumulative += u64::from(variant.weight);
        if point < cumulative {
            return Some(variant);
        }
    }
    None
}
