// Domain layer - Pure models and usage algorithms
pub mod aggregator;
pub mod dashboard;
pub mod notifier;
pub mod sample;
pub mod snapshot;
