//! Row-Level Security (RLS) tenant context.
//!
//! Every unit of work runs inside a transaction whose `app.current_tenant`
//! setting names the tenant it was opened for. The setting is
//! transaction-local, so it never leaks to the next user of the pooled
//! connection.
//!
//! # Usage
//!
//! ```ignore
//! use tally_db::rls::begin_tenant_scope;
//!
//! let txn = begin_tenant_scope(&db, &tenant).await?;
//! let accounts = accounts::Entity::find().all(&txn).await?;
//! txn.commit().await?;
//! ```

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
    TransactionTrait,
};
use tally_shared::types::TenantId;

/// Name of the setting the tenant isolation policies read.
pub const TENANT_SETTING: &str = "app.current_tenant";

/// Begins a transaction scoped to `tenant`.
///
/// # Errors
///
/// Returns an error if the transaction cannot be started or the tenant
/// context cannot be set.
pub async fn begin_tenant_scope(
    db: &DatabaseConnection,
    tenant: &TenantId,
) -> Result<DatabaseTransaction, DbErr> {
    let txn = db.begin().await?;
    set_tenant_context(&txn, tenant).await?;
    Ok(txn)
}

/// Sets the tenant context for the current transaction.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_tenant_context(txn: &DatabaseTransaction, tenant: &TenantId) -> Result<(), DbErr> {
    txn.execute(tenant_context_statement(tenant)).await?;
    Ok(())
}

/// `set_config(.., true)` is the bindable form of `SET LOCAL`.
fn tenant_context_statement(tenant: &TenantId) -> Statement {
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT set_config($1, $2, true)",
        [TENANT_SETTING.into(), tenant.as_str().into()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_context_is_bound_not_interpolated() {
        let tenant = TenantId::new("acme'; DROP TABLE accounts; --").unwrap();
        let stmt = tenant_context_statement(&tenant);

        assert_eq!(stmt.sql, "SELECT set_config($1, $2, true)");
        let values = stmt.values.unwrap().0;
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], sea_orm::Value::from(tenant.as_str()));
    }
}
