//! Place catalog storage for the placemap exploration engine.
//!
//! The catalog keeps every place in a single in-memory polars [`DataFrame`]
//! (one row per place) and the per-locale translations in a lookup table.
//! The search engine only ever reads from it; nothing in the exploration path
//! writes back.
//!
//! [`DataFrame`]: polars::prelude::DataFrame

pub mod catalog;
pub mod records;
pub mod test_data;

pub use catalog::{CatalogStats, PlaceCatalog, columns};
pub use records::{PlaceRecord, PlaceTranslation};
pub use test_data::{TestDataConfig, create_test_catalog};

mod error {
    use polars::prelude::PolarsError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Polars error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Required column '{0}' is missing from the place data")]
        MissingColumn(String),
        #[error("Column '{column}' contains a null value at row {row}")]
        NullValue { column: &'static str, row: usize },
        #[error("Place id {0} appears more than once")]
        DuplicatePlaceId(u32),
        #[error("Place {id} has invalid coordinates ({latitude}, {longitude})")]
        InvalidCoordinates {
            id: u32,
            latitude: f64,
            longitude: f64,
        },
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use error::{DataError, Result};
