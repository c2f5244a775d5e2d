//! Built-in event mappings.
//!
//! Each mapping is a pure function from one event to a [`Translation`].
//! Accounts are named through [`SystemAccount`] and resolved by the ledger
//! at posting time, so no mapping knows a concrete account id.

use rust_decimal::Decimal;
use tally_shared::types::{Money, TenantId};

use super::events::{
    AssetDepreciated, ExpenseClaimApproved, GoodsReceived, ManualJournal, PayrollCompleted,
    SalesOrderConfirmed, SubscriptionRenewed,
};
use super::registry::{SkipReason, TranslateError, Translation};
use crate::accounts::{AccountRef, SystemAccount};
use crate::ledger::PostingDraft;

/// Depreciation: Dr Depreciation Expense, Cr Accumulated Depreciation.
///
/// # Errors
///
/// `InvalidAmount` or `InvalidTenant` for malformed fields.
pub fn asset_depreciated(event: &AssetDepreciated) -> Result<Translation, TranslateError> {
    let Some(tenant_id) = tenant(event.tenant_id.as_deref())? else {
        return Ok(Translation::Skip(SkipReason::MissingTenant));
    };
    let amount = money("amount", &event.amount)?;
    if !amount.is_positive() {
        return Ok(Translation::Skip(SkipReason::NonPositiveAmount));
    }

    let asset = event.asset_name.as_deref().unwrap_or(&event.asset_id);
    let description = match event.period_label.as_deref() {
        Some(period) => format!("Depreciation of {asset} for {period}"),
        None => format!("Depreciation of {asset}"),
    };

    let draft = PostingDraft::new(event.depreciation_date, description)
        .debit(system(SystemAccount::DepreciationExpense), amount, None)
        .credit(system(SystemAccount::AccumulatedDepreciation), amount, None);
    Ok(Translation::Draft { tenant_id, draft })
}

/// Expense claim: a bill owed to the employee.
/// Dr Employee Expense, Cr Accounts Payable.
///
/// # Errors
///
/// `InvalidAmount` or `InvalidTenant` for malformed fields.
pub fn expense_claim_approved(event: &ExpenseClaimApproved) -> Result<Translation, TranslateError> {
    let Some(tenant_id) = tenant(event.tenant_id.as_deref())? else {
        return Ok(Translation::Skip(SkipReason::MissingTenant));
    };
    let amount = money("amount", &event.amount)?;
    if !amount.is_positive() {
        return Ok(Translation::Skip(SkipReason::NonPositiveAmount));
    }

    let description = match event.employee_name.as_deref() {
        Some(employee) => format!("Expense claim {} reimbursable to {employee}", event.claim_id),
        None => format!("Expense claim {}", event.claim_id),
    };

    let draft = PostingDraft::new(event.approved_on, description)
        .debit(system(SystemAccount::EmployeeExpense), amount, None)
        .credit(system(SystemAccount::AccountsPayable), amount, None);
    Ok(Translation::Draft { tenant_id, draft })
}

/// Goods received: a vendor bill from accepted quantity times PO unit price.
/// One Dr Inventory line per priced receiving line, Cr Accounts Payable for
/// the total.
///
/// Lines without a unit price or quantity (absent or blank), or with
/// nothing accepted, are left out.
///
/// # Errors
///
/// `InvalidAmount` for a quantity or price that is present but malformed.
pub fn goods_received(event: &GoodsReceived) -> Result<Translation, TranslateError> {
    let Some(tenant_id) = tenant(event.tenant_id.as_deref())? else {
        return Ok(Translation::Skip(SkipReason::MissingTenant));
    };

    let mut priced = Vec::new();
    for line in &event.lines {
        let price = present(line.unit_price.as_deref());
        let count = present(Some(line.accepted_quantity.as_str()));
        let (Some(price), Some(count)) = (price, count) else {
            continue;
        };
        let quantity = quantity("accepted_quantity", count)?;
        let amount = money("unit_price", price)?.multiply(quantity)?;
        if amount.is_positive() {
            priced.push((line.item.as_deref(), quantity, amount));
        }
    }
    if priced.is_empty() {
        return Ok(Translation::Skip(SkipReason::NoUsableLines));
    }

    let total = Money::try_sum(priced.iter().map(|(_, _, amount)| *amount))?;
    let mut description = format!("Goods received {}", event.receipt_id);
    if let Some(po) = event.purchase_order.as_deref() {
        description.push_str(&format!(" against {po}"));
    }
    if let Some(supplier) = event.supplier_name.as_deref() {
        description.push_str(&format!(" from {supplier}"));
    }

    let mut draft = PostingDraft::new(event.received_on, description);
    for (item, quantity, amount) in priced {
        let memo = item.map(|item| format!("{item} x {}", quantity.normalize()));
        draft = draft.debit(system(SystemAccount::Inventory), amount, memo);
    }
    draft = draft.credit(system(SystemAccount::AccountsPayable), total, None);
    Ok(Translation::Draft { tenant_id, draft })
}

/// Payroll: Dr Salary Expense (gross), Cr Salary Payable (net), and
/// Cr Payroll Deductions Payable only when deductions are positive.
///
/// # Errors
///
/// - `InvalidAmount` for malformed totals
/// - `InconsistentAmounts` if net or deductions is negative, or
///   `gross != net + deductions`
pub fn payroll_completed(event: &PayrollCompleted) -> Result<Translation, TranslateError> {
    let Some(tenant_id) = tenant(event.tenant_id.as_deref())? else {
        return Ok(Translation::Skip(SkipReason::MissingTenant));
    };
    let gross = money("total_gross", &event.total_gross)?;
    let net = money("total_net", &event.total_net)?;
    let deductions = money("total_deductions", &event.total_deductions)?;

    if !gross.is_positive() {
        return Ok(Translation::Skip(SkipReason::NonPositiveAmount));
    }
    if net.is_negative() || deductions.is_negative() || net.checked_add(deductions)? != gross {
        return Err(TranslateError::InconsistentAmounts {
            gross,
            net,
            deductions,
        });
    }

    let description = match event.period_label.as_deref() {
        Some(period) => format!("Payroll run {} for {period}", event.run_id),
        None => format!("Payroll run {}", event.run_id),
    };

    let mut draft = PostingDraft::new(event.paid_on, description)
        .debit(system(SystemAccount::SalaryExpense), gross, None);
    if net.is_positive() {
        draft = draft.credit(system(SystemAccount::SalaryPayable), net, None);
    }
    if deductions.is_positive() {
        draft = draft.credit(system(SystemAccount::PayrollDeductionsPayable), deductions, None);
    }
    Ok(Translation::Draft { tenant_id, draft })
}

/// Sales order: a customer invoice. Dr Accounts Receivable for the total,
/// one Cr Sales Revenue line per priced order line.
///
/// # Errors
///
/// `InvalidAmount` for a quantity or price that is present but malformed.
pub fn sales_order_confirmed(event: &SalesOrderConfirmed) -> Result<Translation, TranslateError> {
    let Some(tenant_id) = tenant(event.tenant_id.as_deref())? else {
        return Ok(Translation::Skip(SkipReason::MissingTenant));
    };

    let mut priced = Vec::new();
    for line in &event.lines {
        let price = present(line.unit_price.as_deref());
        let count = present(Some(line.quantity.as_str()));
        let (Some(price), Some(count)) = (price, count) else {
            continue;
        };
        let quantity = quantity("quantity", count)?;
        let amount = money("unit_price", price)?.multiply(quantity)?;
        if amount.is_positive() {
            priced.push((line.item.as_deref(), quantity, amount));
        }
    }
    if priced.is_empty() {
        return Ok(Translation::Skip(SkipReason::NoUsableLines));
    }

    let total = Money::try_sum(priced.iter().map(|(_, _, amount)| *amount))?;
    let description = match event.customer_name.as_deref() {
        Some(customer) => format!("Sales order {} confirmed for {customer}", event.order_id),
        None => format!("Sales order {} confirmed", event.order_id),
    };

    let mut draft = PostingDraft::new(event.confirmed_on, description)
        .debit(system(SystemAccount::AccountsReceivable), total, None);
    for (item, quantity, amount) in priced {
        let memo = item.map(|item| format!("{item} x {}", quantity.normalize()));
        draft = draft.credit(system(SystemAccount::SalesRevenue), amount, memo);
    }
    Ok(Translation::Draft { tenant_id, draft })
}

/// Subscription renewal: Dr Accounts Receivable, Cr Subscription Revenue.
///
/// # Errors
///
/// `InvalidAmount` or `InvalidTenant` for malformed fields.
pub fn subscription_renewed(event: &SubscriptionRenewed) -> Result<Translation, TranslateError> {
    let Some(tenant_id) = tenant(event.tenant_id.as_deref())? else {
        return Ok(Translation::Skip(SkipReason::MissingTenant));
    };
    let amount = money("amount", &event.amount)?;
    if !amount.is_positive() {
        return Ok(Translation::Skip(SkipReason::NonPositiveAmount));
    }

    let description = match event.plan_name.as_deref() {
        Some(plan) => format!("Subscription {} renewed on {plan}", event.subscription_id),
        None => format!("Subscription {} renewed", event.subscription_id),
    };

    let draft = PostingDraft::new(event.renewed_on, description)
        .debit(system(SystemAccount::AccountsReceivable), amount, None)
        .credit(system(SystemAccount::SubscriptionRevenue), amount, None);
    Ok(Translation::Draft { tenant_id, draft })
}

/// Manual journal: lines pass through by account code. Line rules and the
/// balance check are left to the ledger, which reports them precisely.
///
/// # Errors
///
/// `InvalidAmount` for malformed line amounts.
pub fn manual_journal(event: &ManualJournal) -> Result<Translation, TranslateError> {
    let Some(tenant_id) = tenant(event.tenant_id.as_deref())? else {
        return Ok(Translation::Skip(SkipReason::MissingTenant));
    };
    if event.lines.is_empty() {
        return Ok(Translation::Skip(SkipReason::NoUsableLines));
    }

    let mut draft = PostingDraft::new(event.entry_date, event.description.clone());
    for line in &event.lines {
        let debit = optional_money("debit", line.debit.as_deref())?;
        let credit = optional_money("credit", line.credit.as_deref())?;
        let account = AccountRef::Code(line.account_code.trim().to_string());
        draft.lines.push(crate::ledger::DraftLine {
            account,
            debit,
            credit,
            description: line.description.clone(),
        });
    }
    Ok(Translation::Draft { tenant_id, draft })
}

const fn system(account: SystemAccount) -> AccountRef {
    AccountRef::System(account)
}

/// `Ok(None)` when the tenant is absent or blank.
fn tenant(raw: Option<&str>) -> Result<Option<TenantId>, TranslateError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(key) => Ok(Some(TenantId::new(key)?)),
    }
}

fn money(field: &'static str, text: &str) -> Result<Money, TranslateError> {
    Money::parse(text).map_err(|_| TranslateError::InvalidAmount {
        field,
        value: text.to_string(),
    })
}

/// Trimmed text, or `None` when absent or blank.
fn present(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

fn optional_money(field: &'static str, text: Option<&str>) -> Result<Money, TranslateError> {
    present(text).map_or(Ok(Money::ZERO), |text| money(field, text))
}

/// Quantities are exact decimals too; a non-positive one marks a line with
/// nothing to bill, which the caller drops.
fn quantity(field: &'static str, text: &str) -> Result<Decimal, TranslateError> {
    Decimal::from_str_exact(text.trim()).map_err(|_| TranslateError::InvalidAmount {
        field,
        value: text.to_string(),
    })
}
