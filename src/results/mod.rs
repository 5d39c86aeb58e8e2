// Results module - discovery and indexing of result images
mod cache;
pub mod codec;
mod error;
pub mod generator;
mod handlers;
mod index;
pub mod prober;
mod remote;
mod resolver;
pub mod selection;
mod types;


pub use cache::{CacheEntry, CacheStats, ResultCache};
pub use error::ResultsError;
pub use handlers::{clear_cache_handler, find_handler, list_handler, result_file_handler};
pub use index::{ResultIndex, SharedResultIndex};
pub use prober::{CacheBust, DirectoryProber, ExistenceProber, HttpProber, ProbeOutcome};
pub use remote::{HttpRemoteIndex, RemoteIndex};
pub use resolver::{LoadOutcome, Resolver, ScanOutcome, SharedResolver, Today};
pub use types::*;
