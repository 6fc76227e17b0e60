//! Deduplicated views of the subresources of a filing set.

use crate::error::{FilingsError, Result};
use crate::resource::{ApiResource, DataValue};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Column-major table data keyed by column name.
pub type ColumnData = IndexMap<String, Vec<Option<DataValue>>>;

/// Entities or validation messages of a [`crate::FilingSet`].
///
/// Every resource appears once even when several filings share it.
#[derive(Debug, Clone)]
pub struct ResourceCollection<T> {
    items: Vec<Arc<T>>,
}

impl<T: ApiResource> ResourceCollection<T> {
    pub(crate) fn from_items(items: impl IntoIterator<Item = Arc<T>>) -> Self {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.api_id().to_string()))
            .collect();
        Self { items }
    }

    /// Number of distinct resources.
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// No resources.
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// At least one resource exists.
    pub const fn exist(&self) -> bool {
        !self.items.is_empty()
    }

    /// Resource with the given `api_id` is in the collection.
    pub fn contains(&self, api_id: &str) -> bool {
        self.get(api_id).is_some()
    }

    /// Resource by `api_id`.
    pub fn get(&self, api_id: &str) -> Option<&Arc<T>> {
        self.items.iter().find(|item| item.api_id() == api_id)
    }

    /// Iterate the resources in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(AsRef::as_ref)
    }

    /// Data columns of the resource type.
    pub fn columns(&self) -> Vec<String> {
        T::columns()
    }

    /// Column-major data, all columns when `attr_names` is `None`.
    ///
    /// # Errors
    /// Returns [`FilingsError::UnknownAttribute`] for a name that is not
    /// a data column of the type.
    pub fn get_data(&self, attr_names: Option<&[&str]>) -> Result<ColumnData> {
        let columns = select_columns::<T>(self.columns(), attr_names)?;
        Ok(column_data(self.iter(), &columns))
    }
}

impl<'a, T> IntoIterator for &'a ResourceCollection<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Check requested names against the available columns.
pub(crate) fn select_columns<T: ApiResource>(
    available: Vec<String>,
    attr_names: Option<&[&str]>,
) -> Result<Vec<String>> {
    let Some(names) = attr_names else {
        return Ok(available);
    };
    names
        .iter()
        .map(|name| {
            if T::data_attributes().contains(name) {
                Ok((*name).to_string())
            } else {
                Err(FilingsError::UnknownAttribute {
                    table: T::TABLE,
                    attribute: (*name).to_string(),
                })
            }
        })
        .collect()
}

/// Collect `columns` of `items` column by column.
pub(crate) fn column_data<'a, T, I>(items: I, columns: &[String]) -> ColumnData
where
    T: ApiResource + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut data: ColumnData = columns.iter().map(|c| (c.clone(), Vec::new())).collect();
    for item in items {
        for (column, values) in &mut data {
            values.push(item.value(column));
        }
    }
    data
}
