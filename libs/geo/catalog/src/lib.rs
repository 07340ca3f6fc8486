pub mod entities;
pub mod error;
pub mod repository;
pub mod theme_classifier;

pub use entities::{change_check, dataset, server, theme};
pub use error::{CatalogError, CatalogResult};
pub use repository::{BoundingBox, DatasetRepository, ServerRepository, SpatialPredicate, ThemeRepository};
