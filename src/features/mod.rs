//! Features Module - Feature Extraction Engine
//!
//! Turns log records into fixed-layout numeric vectors for the statistical
//! outlier engine. Layout is versioned so a batch always uses one ordering.

pub mod layout;
pub mod vector;

pub use layout::{feature_index, feature_name, layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use vector::{batch_matrix, extract, FeatureVector};
