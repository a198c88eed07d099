//! Procedure code to model registry.

use std::collections::HashMap;

use predict_common::ServiceEntry;

use crate::error::{Error, Result};

/// Read-only mapping from procedure code to model identifier.
///
/// Built once at startup and shared behind an `Arc`; lookups are exact and
/// case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, String>,
}

impl ServiceRegistry {
    pub fn new(services: HashMap<String, String>) -> Self {
        Self { services }
    }

    /// Build from configured entries. A repeated code keeps its last model.
    pub fn from_entries(entries: &[ServiceEntry]) -> Self {
        entries
            .iter()
            .map(|entry| (entry.code.as_str(), entry.model.as_str()))
            .collect()
    }

    /// Resolve a procedure code to its model identifier.
    pub fn resolve(&self, code: &str) -> Result<&str> {
        self.services
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownProcedureCode(code.to_string()))
    }

    /// All entries, sorted by procedure code.
    pub fn entries(&self) -> Vec<ServiceEntry> {
        let mut entries: Vec<ServiceEntry> = self
            .services
            .iter()
            .map(|(code, model)| ServiceEntry {
                code: code.clone(),
                model: model.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ServiceRegistry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(code, model)| (code.into(), model.into()))
                .collect(),
        )
    }
}
