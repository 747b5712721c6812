//! Variant domain model.
//!
//! A variant's `changes` payload is opaque to the engine: it is produced
//! externally and handed through to rendering callers unexamined.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque configuration payload describing what a variant changes.
pub type VariantChanges = HashMap<String, serde_json::Value>;

/// One treatment (including the control) compared within a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Unique identifier
    pub id: Uuid,
    /// Owning test
    pub test_id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Opaque rendering payload, never interpreted by the engine
    pub changes: VariantChanges,
    /// Whether this variant is the baseline
    pub is_control: bool,
    /// Relative traffic share (positive)
    pub weight: u32,
    /// Cached impression count, derived from the event log
    pub impressions: u64,
    /// Cached conversion count, derived from the event log
    pub conversions: u64,
    /// Cached `conversions / impressions`, 0 when impressions = 0
    pub conversion_rate: f64,
}

impl Variant {
    /// Recompute the cached conversion rate from the cached counters.
    pub fn recompute_rate(&mut self) {
        self.conversion_rate = compute_rate(self.conversions, self.impressions);
    }
}

/// `conversions / impressions`, 0 when there are no impressions.
pub fn compute_rate(conversions: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        0.0
    } else {
        conversions as f64 / impressions as f64
    }
}

/// A variant as submitted at test creation, before it is bound to a test id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub changes: VariantChanges,
    #[serde(default)]
    pub is_control: bool,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

const fn default_weight() -> u32 {
    1
}

impl VariantDefinition {
    /// A control variant with weight 1.
    pub fn control(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            changes: VariantChanges::new(),
            is_control: true,
            weight: 1,
        }
    }

    /// A non-control variant with weight 1.
    pub fn treatment(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            changes: VariantChanges::new(),
            is_control: false,
            weight: 1,
        }
    }

    /// Set traffic weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the opaque changes payload.
    pub fn with_changes(mut self, changes: VariantChanges) -> Self {
        self.changes = changes;
        self
    }

    /// Bind this definition to a test, producing a fresh variant with
    /// zeroed counters.
    pub fn build(&self, test_id: Uuid) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            test_id,
            name: self.name.clone(),
            description: self.description.clone(),
            changes: self.changes.clone(),
            is_control: self.is_control,
            weight: self.weight,
            impressions: 0,
            conversions: 0,
            conversion_rate: 0.0,
        }
    }
}
