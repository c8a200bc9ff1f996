//! Registry-gated event processing.
//!
//! Registry gate → mapping load/cache → mapping evaluation → graph execution
//! → status reporting. Events are handled strictly one at a time; run several
//! processors for parallelism.

pub mod mapping_store;
pub mod processor;
pub mod status;

pub use mapping_store::MappingStore;
pub use processor::{BatchResult, EventProcessor, PreloadReport, ProcessingResult, ProcessorOptions};
pub use status::{MemoryStatusWriter, ProcessingStatus, StatusRecord, StatusWriter};
