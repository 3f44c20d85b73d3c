use std::collections::BTreeSet;

use serde::Serialize;

use crate::{bindings::SelectedColumns, dataset::Dataset};

/// District allow-set plus an optional institution-name search.
///
/// An empty allow-set admits nothing. The search is case-insensitive and
/// never matches a row whose institution name is blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowFilter {
    pub districts: BTreeSet<String>,
    pub search: Option<String>,
}

impl RowFilter {
    pub fn new<I, S>(districts: I, search: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            districts: districts.into_iter().map(Into::into).collect(),
            search: search.map(str::to_string),
        }
    }

    /// Admits every district present in `dataset`.
    pub fn all_districts(dataset: &Dataset, columns: &SelectedColumns) -> Self {
        Self::new(
            dataset
                .district_counts(&columns.district)
                .into_iter()
                .map(|(district, _)| district),
            None,
        )
    }

    pub fn with_search(mut self, search: Option<&str>) -> Self {
        self.search = search.map(str::to_string);
        self
    }

    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Indexes of the rows that pass, in input order.
    pub fn apply(&self, dataset: &Dataset, columns: &SelectedColumns) -> Vec<usize> {
        if self.districts.is_empty() {
            return Vec::new();
        }
        let needle = self.needle();
        (0..dataset.len())
            .filter(|&row| {
                let district = dataset.cell(row, columns.district.index).as_display();
                self.districts.contains(&district)
            })
            .filter(|&row| match &needle {
                None => true,
                Some(needle) => dataset
                    .text(row, columns.institution.index)
                    .is_some_and(|name| name.to_lowercase().contains(needle.as_str())),
            })
            .collect()
    }
}
