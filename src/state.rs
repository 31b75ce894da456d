// Shared selection state: selected region plus all selectable regions

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    selected_region: String,
    all_regions: Vec<String>,
}

impl SelectionState {
    pub fn new(default_region: &str) -> Self {
        SelectionState {
            selected_region: default_region.to_string(),
            all_regions: Vec::new(),
        }
    }

    pub fn selected_region(&self) -> &str {
        &self.selected_region
    }

    /// Sorted, distinct regions; empty until a dataset scan reports them.
    pub fn all_regions(&self) -> &[String] {
        &self.all_regions
    }

    /// Change the selection (dropdown change or map click).
    /// Returns `false` when `region` is already selected.
    pub fn select(&mut self, region: &str) -> bool {
        if self.selected_region == region {
            return false;
        }
        log::debug!("Region selection: '{}' -> '{}'", self.selected_region, region);
        self.selected_region = region.to_string();
        true
    }

    /// Replace the region list with the distinct, sorted, non-empty values of
    /// `regions`. Replacing with an equivalent list is a no-op; returns
    /// whether the stored list changed.
    pub fn set_all_regions<I, S>(&mut self, regions: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized: Vec<String> = regions
            .into_iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if normalized == self.all_regions {
            return false;
        }
        self.all_regions = normalized;
        true
    }

    /// Forget the region list ahead of a new dataset load. The selection
    /// itself is kept.
    pub fn reset_regions(&mut self) {
        self.all_regions.clear();
    }

    pub fn is_populated(&self) -> bool {
        !self.all_regions.is_empty()
    }
}
