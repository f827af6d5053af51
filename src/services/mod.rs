//! Service layer: the components that sit above the store.
pub mod classifier;
pub mod extractor;
pub mod ingestor;
pub mod logger;
pub mod queue_manager;
pub mod worker_pool;
