pub mod core_api;
pub mod decompress;
pub mod house;
pub mod layout;
pub mod reader;
pub mod record;
pub mod scan;
pub mod sex;

pub use core_api::{
    CatalogConfig, CoreError, CoreErrorCode, Engine, EngineConfig, HouseCat, MemorySource,
    RecordCatalog, RecordSource,
};
pub use decompress::{DecodedBuffer, DecompressionVariant};
pub use house::HouseCatEntry;
pub use record::{DecodedRecord, RawRecord};
pub use sex::Sex;
