//! Records of how API responses were read.
//!
//! Useful for noticing when the API adds, renames or drops fields.

use crate::json_tree::registry;

/// How often a key path was found for an object type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyPathRetrieveCounts {
    /// Object type, e.g. `Filing`
    pub class_name: String,
    /// Dot-delimited key path
    pub key_path: String,
    /// Reads that returned a value
    pub success_count: u64,
    /// All reads
    pub total_count: u64,
}

/// `(class_name, key_path)` pairs present in responses but never read.
pub fn unaccessed_key_paths() -> Vec<(String, String)> {
    registry().unaccessed.iter().cloned().collect()
}

/// Read counts of every key path the library has asked for.
pub fn key_path_availability_counts() -> Vec<KeyPathRetrieveCounts> {
    registry()
        .counters
        .iter()
        .map(|((class_name, key_path), counter)| KeyPathRetrieveCounts {
            class_name: class_name.clone(),
            key_path: key_path.clone(),
            success_count: counter.success_count,
            total_count: counter.total_count,
        })
        .collect()
}

/// `(type, origin)` pairs of resources the library does not handle.
/// Origin is `data` or `included`.
pub fn unexpected_resource_types() -> Vec<(String, String)> {
    registry().unexpected_types.iter().cloned().collect()
}
