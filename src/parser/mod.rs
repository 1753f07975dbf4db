pub mod types;
pub mod yaml;

pub use types::{FeatureFile, Scenario, Step};
pub use yaml::parse_feature_file;
