//! Ledger schema.
//!
//! Creates the account, fiscal period, journal entry and entry sequence
//! tables. Constraint names are part of the storage contract: the store maps
//! violations of them to `StoreError::UniqueViolation` by name.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(EXTENSIONS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(FISCAL_PERIODS_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;
        db.execute_unprepared(ENTRY_SEQUENCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const EXTENSIONS_SQL: &str = r"
-- Required for the period overlap exclusion constraint
CREATE EXTENSION IF NOT EXISTS btree_gist;
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    tenant_id VARCHAR(64) NOT NULL,
    parent_id UUID REFERENCES accounts(id),
    code VARCHAR(50) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(16) NOT NULL,
    normal_balance VARCHAR(8) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    current_balance NUMERIC(28, 8) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT accounts_tenant_code_key UNIQUE (tenant_id, code),
    CONSTRAINT chk_account_type
        CHECK (account_type IN ('asset', 'liability', 'equity', 'revenue', 'expense')),
    CONSTRAINT chk_normal_balance CHECK (normal_balance IN ('debit', 'credit')),
    CONSTRAINT chk_normal_balance_matches_type CHECK (
        (account_type IN ('asset', 'expense') AND normal_balance = 'debit')
        OR (account_type IN ('liability', 'equity', 'revenue') AND normal_balance = 'credit')
    )
);

CREATE INDEX idx_accounts_tenant_parent ON accounts(tenant_id, parent_id);
";

const FISCAL_PERIODS_SQL: &str = r"
CREATE TABLE fiscal_periods (
    id UUID PRIMARY KEY,
    tenant_id VARCHAR(64) NOT NULL,
    name VARCHAR(50) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    status VARCHAR(8) NOT NULL DEFAULT 'open',
    closed_by UUID,
    closed_at TIMESTAMPTZ,
    locked_by UUID,
    locked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_period_dates CHECK (end_date >= start_date),
    CONSTRAINT chk_period_status CHECK (status IN ('open', 'closed', 'locked')),
    -- Ranges are inclusive on both ends
    CONSTRAINT fiscal_periods_no_overlap EXCLUDE USING gist (
        tenant_id WITH =,
        daterange(start_date, end_date, '[]') WITH &&
    )
);

CREATE INDEX idx_fiscal_periods_tenant_dates ON fiscal_periods(tenant_id, start_date, end_date);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    tenant_id VARCHAR(64) NOT NULL,
    entry_number BIGINT NOT NULL,
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    source_reference VARCHAR(255),
    idempotency_key VARCHAR(255),
    status VARCHAR(8) NOT NULL DEFAULT 'draft',
    reversed_entry_id UUID REFERENCES journal_entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    posted_at TIMESTAMPTZ,
    CONSTRAINT journal_entries_tenant_number_key UNIQUE (tenant_id, entry_number),
    CONSTRAINT chk_entry_status CHECK (status IN ('draft', 'posted', 'reversed')),
    CONSTRAINT chk_entry_number CHECK (entry_number > 0),
    CONSTRAINT chk_posted_at CHECK (status = 'draft' OR posted_at IS NOT NULL)
);

CREATE UNIQUE INDEX journal_entries_tenant_idempotency_key
    ON journal_entries(tenant_id, idempotency_key)
    WHERE idempotency_key IS NOT NULL;
CREATE INDEX idx_journal_entries_tenant_date ON journal_entries(tenant_id, entry_date);
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    tenant_id VARCHAR(64) NOT NULL,
    entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    debit NUMERIC(28, 8) NOT NULL DEFAULT 0,
    credit NUMERIC(28, 8) NOT NULL DEFAULT 0,
    description TEXT,
    CONSTRAINT journal_lines_entry_line_key UNIQUE (entry_id, line_no),
    -- Exactly one side carries a strictly positive amount
    CONSTRAINT chk_line_one_sided CHECK (
        (debit > 0 AND credit = 0) OR (debit = 0 AND credit > 0)
    )
);

CREATE INDEX idx_journal_lines_account ON journal_lines(tenant_id, account_id);
";

const ENTRY_SEQUENCES_SQL: &str = r"
CREATE TABLE entry_sequences (
    tenant_id VARCHAR(64) PRIMARY KEY,
    last_number BIGINT NOT NULL DEFAULT 0
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS entry_sequences CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS fiscal_periods CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";
