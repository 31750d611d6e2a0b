mod catalog;
mod engine;
mod error;
mod source;
mod types;

pub use catalog::{ALL_RECORDS_KEY, CatalogConfig, DEFAULT_CACHE_TTL, RecordCatalog};
pub use engine::{Engine, EngineConfig};
pub use error::{CoreError, CoreErrorCode};
pub use source::{ChangeCallback, ChangeFeed, ChangeSignal, MemorySource, RecordSource};
pub use types::HouseCat;
