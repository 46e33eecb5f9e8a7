//! Query analysis: classification, numeric coercion, aggregation and
//! the general summary.

pub mod aggregator;
pub mod classifier;
pub mod numeric;
pub mod summary;

pub use aggregator::perform_analysis;
pub use classifier::classify;
pub use summary::summarize;
