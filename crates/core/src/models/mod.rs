//! Shared domain models.

use serde::{Deserialize, Serialize};

/// A ski resort as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resort {
    /// Identifier, unique across the catalog.
    pub id: String,
    /// Display name of the resort.
    pub name: String,
    /// Country the resort is located in.
    pub country: String,
    /// Free-form description.
    pub description: String,
    /// Photographer credit for the resort image.
    pub image_credit: String,
    /// Price tier from 1 (cheap) to 3 (expensive).
    pub price: u8,
    /// Size tier from 1 (small) to 3 (large).
    pub size: u8,
    /// Typical snow depth in centimetres.
    pub snow_depth: u32,
    /// Peak elevation in metres.
    pub elevation: u32,
    /// Number of runs.
    pub runs: u32,
    /// Facility names, unique within a resort.
    pub facilities: Vec<String>,
}

impl Resort {
    /// Returns a header label combining name and country.
    pub fn title(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }

    /// Human-readable size tier.
    pub fn size_label(&self) -> &'static str {
        match self.size {
            1 => "Small",
            2 => "Average",
            _ => "Large",
        }
    }

    /// Price tier rendered as a run of dollar signs.
    pub fn price_label(&self) -> String {
        "$".repeat(usize::from(self.price))
    }

    /// Facilities joined as a natural-language list ("A, B, and C").
    pub fn facility_list(&self) -> String {
        match self.facilities.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [first, second] => format!("{first} and {second}"),
            [head @ .., last] => format!("{}, and {}", head.join(", "), last),
        }
    }
}
