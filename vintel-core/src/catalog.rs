//! Location catalog
//!
//! Read-only mapping from an upper-case location name (what players type) to
//! its canonical record. The catalog is supplied by the caller, usually loaded
//! from a JSON file produced by whatever fetches the map data:
//!
//! ```json
//! { "Jita": { "name": "Jita", "region": "The Forge" }, "HED-GP": "HED-GP" }
//! ```
//!
//! A plain array of names is accepted too. Entry order is kept, because
//! abbreviation lookups resolve to the first matching entry.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Canonical record for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    /// Canonical upper-case name
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
}

impl LocationEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_uppercase(),
            region: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Name(String),
    Full(LocationEntry),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCatalog {
    Names(Vec<String>),
    Map(serde_json::Map<String, serde_json::Value>),
}

/// Ordered set of known locations.
#[derive(Debug, Clone, Default)]
pub struct LocationCatalog {
    entries: Vec<(String, LocationEntry)>,
    index: HashMap<String, usize>,
}

impl LocationCatalog {
    /// Build a catalog from `(typed name, entry)` pairs.
    ///
    /// Keys and canonical names are upper-cased; a repeated key keeps its first
    /// position but takes the later entry.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, LocationEntry)>,
        K: AsRef<str>,
    {
        let mut catalog = Self::default();
        for (key, mut entry) in entries {
            let key = key.as_ref().trim().to_uppercase();
            if key.is_empty() {
                continue;
            }
            entry.name = entry.name.trim().to_uppercase();
            match catalog.index.get(&key) {
                Some(&i) => catalog.entries[i].1 = entry,
                None => {
                    catalog.index.insert(key.clone(), catalog.entries.len());
                    catalog.entries.push((key, entry));
                }
            }
        }
        catalog
    }

    /// Build a catalog in which every name is its own canonical entry.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_entries(names.into_iter().map(|n| {
            let entry = LocationEntry::new(n.as_ref().trim());
            (n, entry)
        }))
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        match raw {
            RawCatalog::Names(names) => Ok(Self::from_names(names)),
            RawCatalog::Map(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, value) in map {
                    let entry = match serde_json::from_value::<RawEntry>(value) {
                        Ok(RawEntry::Name(name)) => LocationEntry::new(&name),
                        Ok(RawEntry::Full(entry)) => entry,
                        Err(e) => {
                            return Err(Error::Catalog(format!(
                                "invalid entry for {:?}: {}",
                                key, e
                            )))
                        }
                    };
                    entries.push((key, entry));
                }
                Ok(Self::from_entries(entries))
            }
        }
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Catalog(format!("failed to read catalog {:?}: {}", path, e))
        })?;
        let catalog = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            locations = catalog.len(),
            "Location catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for an exact (upper-case) name.
    pub fn get(&self, upper_name: &str) -> Option<&LocationEntry> {
        self.index.get(upper_name).map(|&i| &self.entries[i].1)
    }

    /// Canonical name of the first entry whose key starts with `upper_prefix`.
    pub fn first_with_prefix(&self, upper_prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.starts_with(upper_prefix))
            .map(|(_, entry)| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LocationEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}
