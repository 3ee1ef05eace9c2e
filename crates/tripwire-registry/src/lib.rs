//! Repositories consumed by the tripwire engine.
//!
//! - `AlertStore` / `AlertRegistry`: persisted alert records with partial updates
//! - `PositionStore`, `PriceStore`: read-only input sources
//!
//! Each trait has an in-memory implementation for tests and a JSON file
//! implementation for running without an external database.

pub mod error;
pub mod file;
pub mod memory;
pub mod registry;
pub mod sources;
pub mod store;

pub use error::{RegistryError, RegistryResult, SourceError, SourceResult};
pub use file::{JsonFileAlertStore, JsonFilePositionStore, JsonFilePriceStore};
pub use memory::{MemoryAlertStore, MemoryPositionStore, MemoryPriceStore};
pub use registry::AlertRegistry;
pub use sources::{PositionStore, PriceStore};
pub use store::{AlertStore, AlertUpdate};
