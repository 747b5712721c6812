//! Application services implementing the experiment engine's operations on
//! top of the domain ports.

pub mod assignor;
pub mod evaluator;
pub mod lifecycle;
pub mod recorder;
pub mod registry;
pub mod suggestions;

pub use assignor::{pick_variant, VariantAssignor};
pub use evaluator::{
    decide, two_proportion_p_value, Evaluation, SignificanceEvaluator, VariantStats, Verdict,
};
pub use lifecycle::LifecycleController;
pub use recorder::EventRecorder;
pub use registry::TestRegistry;
pub use suggestions::SuggestionService;
