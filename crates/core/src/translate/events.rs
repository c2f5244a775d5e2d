//! Inbound business events.
//!
//! One struct per upstream business fact. Monetary values arrive as exact
//! decimal text and are parsed by the mapping that consumes them. Fields
//! that upstream documents may leave empty are optional.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of a [`LedgerEvent`], used as the translator registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A fixed asset depreciated for a period.
    AssetDepreciated,
    /// An employee expense claim was approved for reimbursement.
    ExpenseClaimApproved,
    /// Goods were received against a purchase order.
    GoodsReceived,
    /// A payroll run completed.
    PayrollCompleted,
    /// A sales order was confirmed.
    SalesOrderConfirmed,
    /// A subscription renewed.
    SubscriptionRenewed,
    /// An administrative journal with explicit lines.
    ManualJournal,
}

impl EventKind {
    /// Every kind, in registration order.
    pub const ALL: [Self; 7] = [
        Self::AssetDepreciated,
        Self::ExpenseClaimApproved,
        Self::GoodsReceived,
        Self::PayrollCompleted,
        Self::SalesOrderConfirmed,
        Self::SubscriptionRenewed,
        Self::ManualJournal,
    ];

    /// Returns the wire name, also used as the idempotency key prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssetDepreciated => "asset_depreciated",
            Self::ExpenseClaimApproved => "expense_claim_approved",
            Self::GoodsReceived => "goods_received",
            Self::PayrollCompleted => "payroll_completed",
            Self::SalesOrderConfirmed => "sales_order_confirmed",
            Self::SubscriptionRenewed => "subscription_renewed",
            Self::ManualJournal => "manual_journal",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Periodic depreciation of a fixed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDepreciated {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Asset identifier.
    pub asset_id: String,
    /// Asset display name.
    #[serde(default)]
    pub asset_name: Option<String>,
    /// Period label (e.g. "March 2026").
    #[serde(default)]
    pub period_label: Option<String>,
    /// Accounting date of the charge.
    pub depreciation_date: NaiveDate,
    /// Depreciation amount.
    pub amount: String,
}

/// An approved expense claim, owed to the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseClaimApproved {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Claim identifier.
    pub claim_id: String,
    /// Employee to reimburse.
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Approval date.
    pub approved_on: NaiveDate,
    /// Amount to reimburse.
    pub amount: String,
}

/// One line of a receiving document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedLine {
    /// Item label.
    #[serde(default)]
    pub item: Option<String>,
    /// Quantity accepted into stock.
    pub accepted_quantity: String,
    /// Unit price from the purchase order, when known.
    #[serde(default)]
    pub unit_price: Option<String>,
}

/// Goods received against a purchase order; becomes a vendor bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceived {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Receiving document identifier.
    pub receipt_id: String,
    /// Purchase order number.
    #[serde(default)]
    pub purchase_order: Option<String>,
    /// Supplier display name.
    #[serde(default)]
    pub supplier_name: Option<String>,
    /// Receipt date.
    pub received_on: NaiveDate,
    /// Received lines.
    #[serde(default)]
    pub lines: Vec<ReceivedLine>,
}

/// A completed payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollCompleted {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Payroll run identifier.
    pub run_id: String,
    /// Period label (e.g. "April 2026").
    #[serde(default)]
    pub period_label: Option<String>,
    /// Payment date.
    pub paid_on: NaiveDate,
    /// Gross salaries.
    pub total_gross: String,
    /// Net pay owed to employees.
    pub total_net: String,
    /// Withheld deductions.
    pub total_deductions: String,
}

/// One line of a sales order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Item label.
    #[serde(default)]
    pub item: Option<String>,
    /// Ordered quantity.
    pub quantity: String,
    /// Unit price, when resolvable.
    #[serde(default)]
    pub unit_price: Option<String>,
}

/// A confirmed sales order; becomes a customer invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderConfirmed {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Sales order identifier.
    pub order_id: String,
    /// Customer display name.
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Confirmation date.
    pub confirmed_on: NaiveDate,
    /// Order lines.
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

/// A subscription renewal; becomes an invoice for the renewal amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRenewed {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Subscription identifier.
    pub subscription_id: String,
    /// Plan display name.
    #[serde(default)]
    pub plan_name: Option<String>,
    /// Renewal date.
    pub renewed_on: NaiveDate,
    /// Renewal amount.
    pub amount: String,
}

/// One line of a manual journal, naming its account by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualLine {
    /// Account code.
    pub account_code: String,
    /// Debit amount.
    #[serde(default)]
    pub debit: Option<String>,
    /// Credit amount.
    #[serde(default)]
    pub credit: Option<String>,
    /// Line memo.
    #[serde(default)]
    pub description: Option<String>,
}

/// An administrative posting with explicit lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualJournal {
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Caller-chosen identifier, the idempotency anchor.
    pub journal_id: String,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Lines in entry order.
    #[serde(default)]
    pub lines: Vec<ManualLine>,
}

/// Any event the posting gateway accepts.
///
/// Unrecognised `type` tags deserialize to [`LedgerEvent::Unknown`], which
/// the gateway ignores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// See [`AssetDepreciated`].
    AssetDepreciated(AssetDepreciated),
    /// See [`ExpenseClaimApproved`].
    ExpenseClaimApproved(ExpenseClaimApproved),
    /// See [`GoodsReceived`].
    GoodsReceived(GoodsReceived),
    /// See [`PayrollCompleted`].
    PayrollCompleted(PayrollCompleted),
    /// See [`SalesOrderConfirmed`].
    SalesOrderConfirmed(SalesOrderConfirmed),
    /// See [`SubscriptionRenewed`].
    SubscriptionRenewed(SubscriptionRenewed),
    /// See [`ManualJournal`].
    ManualJournal(ManualJournal),
    /// An event type this ledger does not know.
    #[serde(other)]
    Unknown,
}

impl LedgerEvent {
    /// Returns the event kind, or `None` for [`LedgerEvent::Unknown`].
    #[must_use]
    pub const fn kind(&self) -> Option<EventKind> {
        match self {
            Self::AssetDepreciated(_) => Some(EventKind::AssetDepreciated),
            Self::ExpenseClaimApproved(_) => Some(EventKind::ExpenseClaimApproved),
            Self::GoodsReceived(_) => Some(EventKind::GoodsReceived),
            Self::PayrollCompleted(_) => Some(EventKind::PayrollCompleted),
            Self::SalesOrderConfirmed(_) => Some(EventKind::SalesOrderConfirmed),
            Self::SubscriptionRenewed(_) => Some(EventKind::SubscriptionRenewed),
            Self::ManualJournal(_) => Some(EventKind::ManualJournal),
            Self::Unknown => None,
        }
    }

    /// Returns the raw tenant id carried by the event.
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            Self::AssetDepreciated(e) => e.tenant_id.as_deref(),
            Self::ExpenseClaimApproved(e) => e.tenant_id.as_deref(),
            Self::GoodsReceived(e) => e.tenant_id.as_deref(),
            Self::PayrollCompleted(e) => e.tenant_id.as_deref(),
            Self::SalesOrderConfirmed(e) => e.tenant_id.as_deref(),
            Self::SubscriptionRenewed(e) => e.tenant_id.as_deref(),
            Self::ManualJournal(e) => e.tenant_id.as_deref(),
            Self::Unknown => None,
        }
    }

    /// Returns the upstream identity of the fact, or `None` when the event
    /// carries a blank id and so has no identity to deduplicate on.
    ///
    /// Recurring facts (depreciation, renewals) include their date, since
    /// the same asset or subscription produces one event per period.
    #[must_use]
    pub fn source_id(&self) -> Option<String> {
        let (id, date) = match self {
            Self::AssetDepreciated(e) => (&e.asset_id, Some(e.depreciation_date)),
            Self::ExpenseClaimApproved(e) => (&e.claim_id, None),
            Self::GoodsReceived(e) => (&e.receipt_id, None),
            Self::PayrollCompleted(e) => (&e.run_id, None),
            Self::SalesOrderConfirmed(e) => (&e.order_id, None),
            Self::SubscriptionRenewed(e) => (&e.subscription_id, Some(e.renewed_on)),
            Self::ManualJournal(e) => (&e.journal_id, None),
            Self::Unknown => return None,
        };
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        Some(match date {
            Some(date) => format!("{id}:{date}"),
            None => id.to_string(),
        })
    }

    /// Returns the natural idempotency key `"<kind>:<source id>"`.
    #[must_use]
    pub fn idempotency_key(&self) -> Option<String> {
        let kind = self.kind()?;
        let source = self.source_id()?;
        Some(format!("{}:{source}", kind.as_str()))
    }
}
