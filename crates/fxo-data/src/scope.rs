//! Scope of the resources requested with filings.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Which related resources are requested together with filings.
    ///
    /// `GET_ONLY_FILINGS` overrides the other flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ScopeFlags: u8 {
        /// Only filings, no related resources
        const GET_ONLY_FILINGS = 1;
        /// Include the entity of each filing
        const GET_ENTITY = 1 << 1;
        /// Include the validation messages of each filing
        const GET_VALIDATION_MESSAGES = 1 << 2;
    }
}

impl Default for ScopeFlags {
    fn default() -> Self {
        Self::GET_ONLY_FILINGS
    }
}

impl ScopeFlags {
    /// Entities and validation messages.
    pub const fn everything() -> Self {
        Self::GET_ENTITY.union(Self::GET_VALIDATION_MESSAGES)
    }

    /// Entities are requested.
    pub const fn wants_entity(self) -> bool {
        !self.contains(Self::GET_ONLY_FILINGS) && self.contains(Self::GET_ENTITY)
    }

    /// Validation messages are requested.
    pub const fn wants_validation_messages(self) -> bool {
        !self.contains(Self::GET_ONLY_FILINGS) && self.contains(Self::GET_VALIDATION_MESSAGES)
    }

    /// Value of the JSON:API `include` parameter, if any.
    pub fn include_param(self) -> Option<String> {
        let mut parts = Vec::new();
        if self.wants_entity() {
            parts.push("entity");
        }
        if self.wants_validation_messages() {
            parts.push("validation_messages");
        }
        (!parts.is_empty()).then(|| parts.join(","))
    }
}
