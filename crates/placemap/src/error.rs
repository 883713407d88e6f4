use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlacemapError {
    #[error("Validation error: {0}")]
    Validation(#[from] crate::filters::ValidationError),
    #[error("Search error: {0}")]
    Search(#[from] crate::search::SearchError),
    #[error("Preview error: {0}")]
    Preview(#[from] crate::preview::PreviewError),
    #[error("Catalog error: {0}")]
    Data(#[from] placemap_data::DataError),
    #[error("Bounding box error: {0}")]
    Bounds(#[from] crate::geo::BoundsError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Init Logging error: {0}")]
    InitLogging(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PlacemapError>;
