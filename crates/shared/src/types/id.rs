//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `AccountId` where a
//! `FiscalPeriodId` is expected. The tenant key is a validated string rather
//! than a UUID because upstream modules identify tenants by their own keys.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a user acting on the ledger.");
typed_id!(
    AccountId,
    "Unique identifier for a chart of accounts entry."
);
typed_id!(JournalEntryId, "Unique identifier for a journal entry.");
typed_id!(JournalLineId, "Unique identifier for a journal line.");
typed_id!(FiscalPeriodId, "Unique identifier for a fiscal period.");

/// Maximum length of a tenant key, matching the storage column width.
pub const TENANT_ID_MAX_LEN: usize = 64;

/// Errors raised when constructing a [`TenantId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantIdError {
    /// The key is empty or whitespace only.
    #[error("Tenant id must not be blank")]
    Blank,

    /// The key is longer than [`TENANT_ID_MAX_LEN`].
    #[error("Tenant id exceeds {TENANT_ID_MAX_LEN} characters")]
    TooLong,
}

/// Identifier of the tenant that owns a book of accounts.
///
/// Every ledger operation takes one explicitly; there is no ambient tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant id from a non-blank key. Surrounding whitespace is
    /// trimmed.
    ///
    /// # Errors
    ///
    /// Returns `Blank` or `TooLong` if the key is unusable.
    pub fn new(key: impl AsRef<str>) -> Result<Self, TenantIdError> {
        let trimmed = key.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TenantIdError::Blank);
        }
        if trimmed.chars().count() > TENANT_ID_MAX_LEN {
            return Err(TenantIdError::TooLong);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = TenantIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_new_is_unique() {
        let id1 = AccountId::new();
        let id2 = AccountId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_typed_id_round_trips_through_text() {
        let id = JournalEntryId::new();
        let parsed = JournalEntryId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert_eq!(parsed.into_inner(), id.0);
        assert!(FiscalPeriodId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_tenant_id_trims() {
        let tenant = TenantId::new("  t1 ").unwrap();
        assert_eq!(tenant.as_str(), "t1");
        assert_eq!(tenant.to_string(), "t1");
    }

    #[test]
    fn test_tenant_id_rejects_blank() {
        assert_eq!(TenantId::new(""), Err(TenantIdError::Blank));
        assert_eq!(TenantId::new("   "), Err(TenantIdError::Blank));
    }

    #[test]
    fn test_tenant_id_rejects_long_keys() {
        let key = "x".repeat(TENANT_ID_MAX_LEN + 1);
        assert_eq!(TenantId::new(key), Err(TenantIdError::TooLong));
        assert!(TenantId::new("x".repeat(TENANT_ID_MAX_LEN)).is_ok());
    }

    #[test]
    fn test_tenant_id_serde() {
        let tenant: TenantId = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(tenant.as_str(), "acme");
        assert_eq!(serde_json::to_string(&tenant).unwrap(), "\"acme\"");
        assert!(serde_json::from_str::<TenantId>("\"\"").is_err());
    }
}
