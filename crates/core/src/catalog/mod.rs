//! Resort catalog loading and validation.

/// Decoding and validation of catalog documents.
pub mod loader;

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{
    models::Resort,
    projection::{self, SortOrder},
};

pub use loader::BUNDLED_CATALOG;

/// Reasons a catalog could not be produced.
///
/// All of these indicate a packaging or configuration defect; callers are
/// expected to abort startup rather than continue without a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog {}: {source}", .path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The document is not a well-formed array of resorts.
    #[error("failed to decode catalog: {0}")]
    Decode(#[from] serde_json::Error),
    /// Two resorts share an identifier.
    #[error("duplicate resort id '{0}'")]
    DuplicateId(String),
    /// A resort lists the same facility twice.
    #[error("resort '{resort}' lists facility '{facility}' more than once")]
    DuplicateFacility {
        /// Identifier of the offending resort.
        resort: String,
        /// Repeated facility name.
        facility: String,
    },
}

/// Immutable, validated, ordered collection of resorts.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resorts: Vec<Resort>,
}

impl Catalog {
    /// Load the catalog compiled into the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_slice(BUNDLED_CATALOG.as_bytes())
    }

    /// Load a catalog document from disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let resorts = loader::read_path(path.into())?;
        Self::from_resorts(resorts)
    }

    /// Decode a catalog document held in memory.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        let resorts = loader::decode(bytes)?;
        Self::from_resorts(resorts)
    }

    /// Validate an already-decoded list of resorts.
    pub fn from_resorts(resorts: Vec<Resort>) -> Result<Self, CatalogError> {
        loader::validate(&resorts)?;
        Ok(Self { resorts })
    }

    /// Resorts in catalog order.
    pub fn resorts(&self) -> &[Resort] {
        &self.resorts
    }

    /// Number of resorts.
    pub fn len(&self) -> usize {
        self.resorts.len()
    }

    /// Whether the catalog holds no resorts.
    pub fn is_empty(&self) -> bool {
        self.resorts.is_empty()
    }

    /// Look up a resort by identifier.
    pub fn get(&self, id: &str) -> Option<&Resort> {
        self.resorts.iter().find(|resort| resort.id == id)
    }

    /// Sorted and filtered view of the catalog.
    pub fn project(&self, order: SortOrder, search: &str) -> Vec<&Resort> {
        projection::project(&self.resorts, order, search)
    }
}
