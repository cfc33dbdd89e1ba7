pub mod providers;
pub mod reconciler;
pub mod recommendations;

pub use recommendations::{RandomFallback, RecommendationEngine, RecommendationOrigin};
