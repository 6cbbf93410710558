use std::{collections::HashSet, fs, path::PathBuf};

use tracing::{debug, info};

use super::CatalogError;
use crate::models::Resort;

/// Catalog document shipped inside the binary.
pub const BUNDLED_CATALOG: &str = include_str!("../../resources/resorts.json");

pub(crate) fn read_path(path: PathBuf) -> Result<Vec<Resort>, CatalogError> {
    let content = match fs::read(&path) {
        Ok(content) => content,
        Err(source) => return Err(CatalogError::Read { path, source }),
    };
    let resorts = decode(&content)?;
    info!(path = %path.display(), total = resorts.len(), "Catalog read from disk");
    Ok(resorts)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<Resort>, CatalogError> {
    let resorts: Vec<Resort> = serde_json::from_slice(bytes)?;
    debug!(total = resorts.len(), "Catalog decoded");
    Ok(resorts)
}

pub(crate) fn validate(resorts: &[Resort]) -> Result<(), CatalogError> {
    let mut ids = HashSet::with_capacity(resorts.len());
    for resort in resorts {
        if !ids.insert(resort.id.as_str()) {
            return Err(CatalogError::DuplicateId(resort.id.clone()));
        }

        let mut facilities = HashSet::with_capacity(resort.facilities.len());
        for facility in &resort.facilities {
            if !facilities.insert(facility.as_str()) {
                return Err(CatalogError::DuplicateFacility {
                    resort: resort.id.clone(),
                    facility: facility.clone(),
                });
            }
        }
    }
    Ok(())
}
