pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod models;
pub mod node;
pub mod prefetch;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{CacheWriter, MemoryCacheStore};
pub use config::PrefetchConfig;
pub use document::LessonDocument;
pub use error::AppError;
pub use job::{JobOutcome, JobState, PrefetchJob, TracingPrefetchReporter};
pub use models::{CacheEntry, Course, FetchedResource, ResourceLocator, compute_hash};
pub use node::CurrentNodeResolver;
pub use prefetch::{PrefetchPlan, PrefetchReport, PrefetchService};
pub use traits::{CacheHandle, CacheStore, Fetcher, NodeResolver, ResourceExtractor};
