//! Vireo Readings - sensor data model and log store for the vireo rig
//!
//! This library holds everything both halves of the rig share: the shape of
//! one sensor transmission, the ordered log of every transmission received,
//! and the file-backed store that persists that log. It is used by:
//!
//! - `vireo-ingest`, which records readings pushed by the field sensor node
//! - `vireo-embed`, which selects a recorded reading and writes it into
//!   image metadata
//!
//! # Example
//!
//! ```rust,no_run
//! use vireo_readings::{now_timestamp, ReadingStore, SensorReading};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vireo_readings::StoreError> {
//!     let store = ReadingStore::new("sensor_data.json");
//!
//!     let reading = SensorReading::from_payload(
//!         r#"{"temperature": 21.5, "humidity": 48}"#,
//!         now_timestamp(),
//!     );
//!     let total = store.record(reading).await?;
//!     println!("{total} readings on record");
//!
//!     Ok(())
//! }
//! ```

pub mod log;
pub mod reading;
pub mod store;

// Re-export main types
pub use log::{ReadingLog, SelectError};
pub use reading::{
    now_timestamp, EnvironmentReading, RawReading, SensorField, SensorReading, TIMESTAMP_FORMAT,
};
pub use store::{ReadingStore, StoreError, DEFAULT_DATA_FILE};
