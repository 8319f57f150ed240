//! # Key-System Registry
//!
//! Maps the protection-system GUIDs found in containers to the canonical
//! key-system domain names DRM engines are created with.

use uuid::Uuid;

use crate::config::KeySystemEntry;
use crate::error::{DecryptError, Result};

pub const WIDEVINE_SYSTEM_ID: &str = "edef8ba9-79d6-4ace-a3c8-27dcd51d21ed";
pub const WIDEVINE_DOMAIN: &str = "com.widevine.alpha";

pub const PLAYREADY_SYSTEM_ID: &str = "9a04f079-9840-4286-ab92-e65be0885f95";
pub const PLAYREADY_DOMAIN: &str = "com.microsoft.playready";

/// Fixed lookup table from system GUID to domain name.
///
/// System ids are stored in canonical hyphenated lowercase form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySystemRegistry {
    entries: Vec<(String, String)>,
}

impl KeySystemRegistry {
    /// Build a registry from configuration entries.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::Config`] if an entry's system id is not a GUID,
    /// its domain is empty, or a system id appears twice. Ids in other GUID
    /// spellings are accepted here and stored canonically.
    pub fn from_entries(entries: &[KeySystemEntry]) -> Result<Self> {
        let mut parsed: Vec<(String, String)> = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = Uuid::parse_str(&entry.system_id).map_err(|e| {
                DecryptError::Config(format!(
                    "Key system id '{}' is not a GUID: {}",
                    entry.system_id, e
                ))
            })?;
            let id = id.hyphenated().to_string();

            if entry.domain.is_empty() {
                return Err(DecryptError::Config(format!(
                    "Key system {} has an empty domain name",
                    entry.system_id
                )));
            }

            if parsed.iter().any(|(existing, _)| *existing == id) {
                return Err(DecryptError::Config(format!(
                    "Key system {} is registered twice",
                    entry.system_id
                )));
            }

            parsed.push((id, entry.domain.clone()));
        }

        Ok(Self { entries: parsed })
    }

    /// Resolve a system GUID to its domain name.
    ///
    /// Only the exact canonical spelling matches. Uppercase, braced,
    /// unhyphenated and `urn:uuid:` forms do not resolve.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::UnsupportedKeySystem`] for any other string.
    pub fn resolve(&self, system_id: &str) -> Result<&str> {
        self.entries
            .iter()
            .find(|(known, _)| known == system_id)
            .map(|(_, domain)| domain.as_str())
            .ok_or_else(|| DecryptError::UnsupportedKeySystem(system_id.to_string()))
    }

    /// Registered system ids in their canonical hyphenated lowercase form.
    pub fn system_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|(id, _)| id.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for KeySystemRegistry {
    fn default() -> Self {
        let entries = [
            (WIDEVINE_SYSTEM_ID, WIDEVINE_DOMAIN),
            (PLAYREADY_SYSTEM_ID, PLAYREADY_DOMAIN),
        ];

        Self {
            entries: entries
                .iter()
                .map(|(id, domain)| (id.to_string(), domain.to_string()))
                .collect(),
        }
    }
}
