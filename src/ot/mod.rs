pub mod feature;
mod map;
mod shape_plan;

pub use map::{FeatureFlags, FeatureMap, Map, MapBuilder, WouldSubstituteFeature};
pub use shape_plan::ShapePlan;
