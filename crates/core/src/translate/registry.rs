//! Translator trait, outcomes and the registry keyed by event kind.

use std::collections::BTreeMap;
use std::sync::Arc;

use tally_shared::types::{Money, TenantId, TenantIdError};
use tally_shared::{ErrorKind, MoneyError};
use thiserror::Error;

use super::events::{EventKind, LedgerEvent};
use super::mappings;
use crate::ledger::PostingDraft;

/// Why a translator chose to record nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event carries no tenant id.
    MissingTenant,
    /// The triggering amount is zero or negative.
    NonPositiveAmount,
    /// Every sub-line was excluded (e.g. no line had a unit price).
    NoUsableLines,
}

impl SkipReason {
    /// Returns the log representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingTenant => "missing_tenant",
            Self::NonPositiveAmount => "non_positive_amount",
            Self::NoUsableLines => "no_usable_lines",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of translating one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// A complete draft to post for a tenant.
    Draft {
        /// Tenant to post into.
        tenant_id: TenantId,
        /// The entry to create and post.
        draft: PostingDraft,
    },
    /// Nothing to record. Not an error.
    Skip(SkipReason),
}

/// Errors for events whose content cannot be turned into a sound entry.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// A monetary or quantity field is not a valid decimal.
    #[error("Invalid amount in {field}: {value:?}")]
    InvalidAmount {
        /// Field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// Payroll totals do not reconcile, so no balanced entry exists.
    #[error("Inconsistent payroll amounts: gross {gross}, net {net}, deductions {deductions}")]
    InconsistentAmounts {
        /// Gross salaries.
        gross: Money,
        /// Net pay.
        net: Money,
        /// Deductions.
        deductions: Money,
    },

    /// The tenant id is present but malformed.
    #[error("Invalid tenant id: {0}")]
    InvalidTenant(#[from] TenantIdError),

    /// The translator was handed an event kind it does not map.
    #[error("Unsupported event kind: {0}")]
    Unsupported(&'static str),

    /// Line arithmetic overflowed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl TranslateError {
    /// Returns the error code for structured output.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_EVENT_AMOUNT",
            Self::InconsistentAmounts { .. } => "INCONSISTENT_AMOUNTS",
            Self::InvalidTenant(_) => "INVALID_TENANT",
            Self::Unsupported(_) => "UNSUPPORTED_EVENT",
            Self::Money(e) => e.error_code(),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::InconsistentAmounts { .. }
            | Self::InvalidTenant(_)
            | Self::Unsupported(_) => ErrorKind::Validation,
            Self::Money(e) => e.kind(),
        }
    }
}

/// A pure mapping from an event to a draft or a skip.
///
/// Implementations must not perform I/O; they run before any storage
/// unit is opened.
pub trait EventTranslator: Send + Sync {
    /// Translates one event.
    ///
    /// # Errors
    ///
    /// Returns a [`TranslateError`] when the event content cannot produce a
    /// balanced entry.
    fn translate(&self, event: &LedgerEvent) -> Result<Translation, TranslateError>;
}

impl<F> EventTranslator for F
where
    F: Fn(&LedgerEvent) -> Result<Translation, TranslateError> + Send + Sync,
{
    fn translate(&self, event: &LedgerEvent) -> Result<Translation, TranslateError> {
        self(event)
    }
}

/// Registers a payload mapping under its kind. An event of any other kind
/// is reported as unsupported.
macro_rules! builtin {
    ($registry:ident, $kind:ident, $mapping:path) => {
        $registry.register(EventKind::$kind, |event: &LedgerEvent| match event {
            LedgerEvent::$kind(payload) => $mapping(payload),
            other => Err(TranslateError::Unsupported(
                other.kind().map_or("unknown", EventKind::as_str),
            )),
        })
    };
}

/// Translators keyed by event kind.
#[derive(Clone, Default)]
pub struct TranslatorRegistry {
    translators: BTreeMap<EventKind, Arc<dyn EventTranslator>>,
}

impl TranslatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in mapping for every kind.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        builtin!(registry, AssetDepreciated, mappings::asset_depreciated);
        builtin!(registry, ExpenseClaimApproved, mappings::expense_claim_approved);
        builtin!(registry, GoodsReceived, mappings::goods_received);
        builtin!(registry, PayrollCompleted, mappings::payroll_completed);
        builtin!(registry, SalesOrderConfirmed, mappings::sales_order_confirmed);
        builtin!(registry, SubscriptionRenewed, mappings::subscription_renewed);
        builtin!(registry, ManualJournal, mappings::manual_journal);
        registry
    }

    /// Registers a translator, replacing any previous one for `kind`.
    pub fn register<T>(&mut self, kind: EventKind, translator: T)
    where
        T: EventTranslator + 'static,
    {
        self.translators.insert(kind, Arc::new(translator));
    }

    /// Removes the translator for `kind`, so its events are ignored.
    pub fn unregister(&mut self, kind: EventKind) {
        self.translators.remove(&kind);
    }

    /// Returns the translator for `kind`.
    #[must_use]
    pub fn get(&self, kind: EventKind) -> Option<Arc<dyn EventTranslator>> {
        self.translators.get(&kind).cloned()
    }

    /// Lists registered kinds.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.translators.keys().copied()
    }
}

impl std::fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.translators.keys()).finish()
    }
}
