//! Stable identity keys for deduplicating business records.
//!
//! The fingerprint is a truncated SHA-256 over the normalized name, street
//! and the best available locator: postal code, else phone, else website
//! domain. Differences in any of those fields produce different
//! fingerprints, so incomplete data can miss a duplicate but two distinct
//! businesses are never merged.

use sha2::{Digest, Sha256};

use crate::models::DiscoveryRecord;
use crate::normalize::{
    normalize_name, normalize_phone, normalize_postal_code, normalize_street, normalize_website,
};

/// Hex characters kept from the SHA-256 digest (128 bits).
pub const FINGERPRINT_LEN: usize = 32;

/// Errors raised before a record can be given an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    #[error("record has no name, address, phone or website to identify it")]
    InsufficientIdentity,

    #[error("record has no usable business name")]
    MissingName,
}

/// Normalized identity fields of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFields {
    pub name: String,
    pub street: String,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl IdentityFields {
    /// Normalize the identity-bearing fields of a discovery record.
    pub fn from_record(record: &DiscoveryRecord) -> Self {
        Self {
            name: record
                .name
                .as_deref()
                .map(normalize_name)
                .unwrap_or_default(),
            street: record
                .street
                .as_deref()
                .map(normalize_street)
                .unwrap_or_default(),
            postal_code: record.postal_code.as_deref().and_then(normalize_postal_code),
            phone: record.phone.as_deref().and_then(normalize_phone),
            website: record.website.as_deref().and_then(normalize_website),
        }
    }

    /// Locator component used after name and street.
    fn locator(&self) -> Option<String> {
        if let Some(ref postal) = self.postal_code {
            return Some(postal.clone());
        }
        if let Some(ref phone) = self.phone {
            return Some(format!("phone:{}", phone));
        }
        self.website.as_ref().map(|web| format!("web:{}", web))
    }

    fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.street.is_empty()
            && self.postal_code.is_none()
            && self.phone.is_none()
            && self.website.is_none()
    }
}

/// Compute the identity hash for a set of normalized fields.
///
/// Fields are normalized again here, so callers may pass raw values
/// too. Normalization is idempotent, so already-normalized input hashes the
/// same.
pub fn compute_fingerprint(fields: &IdentityFields) -> Result<String, FingerprintError> {
    if fields.is_empty() {
        return Err(FingerprintError::InsufficientIdentity);
    }

    let name = normalize_name(&fields.name);
    if name.is_empty() {
        return Err(FingerprintError::MissingName);
    }

    let normalized = IdentityFields {
        name,
        street: normalize_street(&fields.street),
        postal_code: fields.postal_code.as_deref().and_then(normalize_postal_code),
        phone: fields.phone.as_deref().and_then(normalize_phone),
        website: fields.website.as_deref().and_then(normalize_website),
    };

    let key = format!(
        "{}|{}|{}",
        normalized.name,
        normalized.street,
        normalized.locator().unwrap_or_default()
    );

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(FINGERPRINT_LEN);
    Ok(digest)
}

/// Fingerprint a raw discovery record.
pub fn fingerprint_record(record: &DiscoveryRecord) -> Result<String, FingerprintError> {
    compute_fingerprint(&IdentityFields::from_record(record))
}
