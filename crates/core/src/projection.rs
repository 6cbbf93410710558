//! Sorted and filtered views over the catalog.
//!
//! The pipeline always sorts the full list first and then filters, so a
//! filtered view is an order-preserving subsequence of the unfiltered view
//! for the same sort order.

use caseless::default_case_fold_str;
use serde::{Deserialize, Serialize};

use crate::models::Resort;

/// Ordering applied to the resort list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Catalog order.
    #[default]
    Unsorted,
    /// Ascending by resort name.
    Alphabetical,
    /// Ascending by country.
    ByCountry,
}

impl SortOrder {
    /// Every order, in the sequence offered to the user.
    pub const ALL: [SortOrder; 3] = [
        SortOrder::Unsorted,
        SortOrder::Alphabetical,
        SortOrder::ByCountry,
    ];

    /// User-facing label.
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Unsorted => "Default",
            SortOrder::Alphabetical => "Alphabetical",
            SortOrder::ByCountry => "Country",
        }
    }

    /// The order following this one, wrapping around.
    pub fn next(self) -> Self {
        match self {
            SortOrder::Unsorted => SortOrder::Alphabetical,
            SortOrder::Alphabetical => SortOrder::ByCountry,
            SortOrder::ByCountry => SortOrder::Unsorted,
        }
    }
}

/// Sort `resorts` by `order`, then keep those whose name contains `search`.
///
/// Sorting is stable and compares strings ordinally. An empty `search`
/// keeps everything; otherwise both sides are compared in Unicode
/// case-folded form.
pub fn project<'a>(resorts: &'a [Resort], order: SortOrder, search: &str) -> Vec<&'a Resort> {
    let sorted = sort(resorts, order);
    if search.is_empty() {
        return sorted;
    }

    let needle = default_case_fold_str(search);
    sorted
        .into_iter()
        .filter(|resort| name_matches(resort, &needle))
        .collect()
}

fn sort(resorts: &[Resort], order: SortOrder) -> Vec<&Resort> {
    let mut sorted: Vec<&Resort> = resorts.iter().collect();
    match order {
        SortOrder::Unsorted => {}
        SortOrder::Alphabetical => sorted.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOrder::ByCountry => sorted.sort_by(|a, b| a.country.cmp(&b.country)),
    }
    sorted
}

fn name_matches(resort: &Resort, folded_needle: &str) -> bool {
    default_case_fold_str(&resort.name).contains(folded_needle)
}
