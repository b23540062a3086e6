pub mod aggregator;
pub mod analysis;
pub mod classifier;
pub mod decoder;
pub mod preprocess;
pub mod sampler;
pub mod staging;
