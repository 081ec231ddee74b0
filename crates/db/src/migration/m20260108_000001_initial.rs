//! Initial database migration.
//!
//! Creates the directory tables the ledger reads (locations, courses, batches,
//! students, directors), the ledger tables it writes, and the audit log.
//!
//! The SQL sticks to the subset shared by PostgreSQL and SQLite so the same
//! migration backs production and the repository tests. Ids and timestamps are
//! always supplied by the application.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: DIRECTORY TABLES
        // ============================================================
        for statement in DIRECTORY_SQL {
            db.execute_unprepared(statement).await?;
        }

        // ============================================================
        // PART 2: FEE LEDGER
        // ============================================================
        for statement in FEE_LEDGER_SQL {
            db.execute_unprepared(statement).await?;
        }

        // ============================================================
        // PART 3: POSTING SOURCES
        // ============================================================
        for statement in POSTING_SQL {
            db.execute_unprepared(statement).await?;
        }

        // ============================================================
        // PART 4: PAYMENTS, HISTORY AND AUDIT
        // ============================================================
        for statement in PAYMENT_SQL {
            db.execute_unprepared(statement).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for statement in DROP_ALL_SQL {
            db.execute_unprepared(statement).await?;
        }
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const DIRECTORY_SQL: &[&str] = &[
    r"
CREATE TABLE locations (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
)",
    r"
CREATE TABLE courses (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    base_fee BIGINT NOT NULL CHECK (base_fee >= 0),
    created_at TIMESTAMPTZ NOT NULL
)",
    r"
CREATE TABLE batches (
    id UUID PRIMARY KEY,
    course_id UUID NOT NULL REFERENCES courses(id),
    location_id UUID NOT NULL REFERENCES locations(id),
    name VARCHAR(255) NOT NULL,
    slot_limit INTEGER NOT NULL CHECK (slot_limit >= 0),
    current_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_batch_occupancy CHECK (current_count >= 0 AND current_count <= slot_limit)
)",
    r"
CREATE TABLE students (
    id UUID PRIMARY KEY,
    location_id UUID NOT NULL REFERENCES locations(id),
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255),
    phone VARCHAR(32),
    current_batch_id UUID REFERENCES batches(id),
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)",
    r"CREATE INDEX idx_students_current_batch ON students(current_batch_id)",
    r"
CREATE TABLE directors (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL
)",
];

const FEE_LEDGER_SQL: &[&str] = &[
    r"
CREATE TABLE fees (
    id UUID PRIMARY KEY,
    student_id UUID NOT NULL REFERENCES students(id),
    batch_id UUID NOT NULL REFERENCES batches(id),
    total_course_fee BIGINT NOT NULL CHECK (total_course_fee >= 0),
    discount_amount BIGINT NOT NULL DEFAULT 0 CHECK (discount_amount >= 0),
    carry_over_amount BIGINT NOT NULL DEFAULT 0 CHECK (carry_over_amount >= 0),
    final_fee BIGINT NOT NULL CHECK (final_fee >= 0),
    balance_amount BIGINT CHECK (balance_amount >= 0),
    advance_amount BIGINT,
    status VARCHAR(32) NOT NULL,
    is_locked BOOLEAN NOT NULL DEFAULT false,
    transfer_id UUID,
    note TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_fee_terms CHECK (final_fee = total_course_fee - discount_amount - carry_over_amount)
)",
    r"CREATE INDEX idx_fees_student ON fees(student_id, status)",
    r"CREATE INDEX idx_fees_transfer ON fees(transfer_id)",
];

const POSTING_SQL: &[&str] = &[
    r"
CREATE TABLE bank_accounts (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    bank_name VARCHAR(255),
    account_number VARCHAR(64),
    balance BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)",
    r"
CREATE TABLE bank_transactions (
    id UUID PRIMARY KEY,
    bank_account_id UUID NOT NULL REFERENCES bank_accounts(id),
    amount BIGINT NOT NULL CHECK (amount > 0),
    debit_credit VARCHAR(32) NOT NULL,
    category VARCHAR(32) NOT NULL,
    mode VARCHAR(32),
    transaction_ref VARCHAR(255),
    description TEXT,
    transaction_date DATE NOT NULL,
    fee_id UUID REFERENCES fees(id),
    student_id UUID REFERENCES students(id),
    location_id UUID REFERENCES locations(id),
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)",
    r"CREATE INDEX idx_bank_transactions_account ON bank_transactions(bank_account_id, transaction_date)",
    r"
CREATE TABLE cash_entries (
    id UUID PRIMARY KEY,
    location_id UUID NOT NULL REFERENCES locations(id),
    transaction_date DATE NOT NULL,
    amount BIGINT NOT NULL CHECK (amount > 0),
    transaction_type VARCHAR(32) NOT NULL,
    debit_credit VARCHAR(32) NOT NULL,
    description TEXT,
    reference_id VARCHAR(255),
    student_id UUID REFERENCES students(id),
    director_id UUID REFERENCES directors(id),
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)",
    r"CREATE INDEX idx_cash_entries_location ON cash_entries(location_id, transaction_date)",
    r"
CREATE TABLE director_ledger_entries (
    id UUID PRIMARY KEY,
    director_id UUID NOT NULL REFERENCES directors(id),
    location_id UUID NOT NULL REFERENCES locations(id),
    transaction_date DATE NOT NULL,
    amount BIGINT NOT NULL CHECK (amount > 0),
    transaction_type VARCHAR(32) NOT NULL,
    debit_credit VARCHAR(32) NOT NULL,
    description TEXT,
    reference_id VARCHAR(255),
    student_id UUID REFERENCES students(id),
    bank_transaction_id UUID REFERENCES bank_transactions(id),
    source_cash_entry_id UUID UNIQUE REFERENCES cash_entries(id),
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)",
    r"CREATE INDEX idx_director_ledger_director ON director_ledger_entries(director_id, transaction_date)",
];

const PAYMENT_SQL: &[&str] = &[
    r"
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    fee_id UUID NOT NULL REFERENCES fees(id),
    student_id UUID NOT NULL REFERENCES students(id),
    amount BIGINT NOT NULL CHECK (amount > 0),
    status VARCHAR(32) NOT NULL,
    mode VARCHAR(32),
    due_date DATE,
    paid_at TIMESTAMPTZ,
    transaction_ref VARCHAR(255),
    note TEXT,
    is_advance BOOLEAN NOT NULL DEFAULT false,
    cash_entry_id UUID UNIQUE REFERENCES cash_entries(id),
    director_ledger_entry_id UUID UNIQUE REFERENCES director_ledger_entries(id),
    bank_transaction_id UUID UNIQUE REFERENCES bank_transactions(id),
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_payment_single_origin CHECK (
        (CASE WHEN cash_entry_id IS NULL THEN 0 ELSE 1 END)
        + (CASE WHEN director_ledger_entry_id IS NULL THEN 0 ELSE 1 END)
        + (CASE WHEN bank_transaction_id IS NULL THEN 0 ELSE 1 END) <= 1
    ),
    CONSTRAINT chk_payment_paid_at CHECK (
        (status = 'PAID' AND paid_at IS NOT NULL) OR (status = 'PENDING' AND paid_at IS NULL)
    )
)",
    r"CREATE INDEX idx_payments_fee ON payments(fee_id, status)",
    r"CREATE INDEX idx_payments_due ON payments(status, due_date)",
    r"
CREATE TABLE batch_histories (
    id UUID PRIMARY KEY,
    student_id UUID NOT NULL REFERENCES students(id),
    from_batch_id UUID NOT NULL REFERENCES batches(id),
    to_batch_id UUID NOT NULL REFERENCES batches(id),
    transfer_id UUID NOT NULL,
    fee_id_from UUID NOT NULL REFERENCES fees(id),
    fee_id_to UUID NOT NULL REFERENCES fees(id),
    policy VARCHAR(32) NOT NULL,
    reason TEXT,
    change_date TIMESTAMPTZ NOT NULL,
    created_by UUID NOT NULL
)",
    r"CREATE INDEX idx_batch_histories_student ON batch_histories(student_id, change_date)",
    r"
CREATE TABLE communication_logs (
    id UUID PRIMARY KEY,
    actor_id UUID NOT NULL,
    event_type VARCHAR(64) NOT NULL,
    subject VARCHAR(255) NOT NULL,
    message TEXT NOT NULL,
    student_id UUID,
    location_id UUID NOT NULL,
    director_id UUID,
    batch_id UUID,
    occurred_at TIMESTAMPTZ NOT NULL
)",
    r"CREATE INDEX idx_communication_logs_student ON communication_logs(student_id, occurred_at)",
];

const DROP_ALL_SQL: &[&str] = &[
    "DROP TABLE IF EXISTS communication_logs",
    "DROP TABLE IF EXISTS batch_histories",
    "DROP TABLE IF EXISTS payments",
    "DROP TABLE IF EXISTS director_ledger_entries",
    "DROP TABLE IF EXISTS cash_entries",
    "DROP TABLE IF EXISTS bank_transactions",
    "DROP TABLE IF EXISTS bank_accounts",
    "DROP TABLE IF EXISTS fees",
    "DROP TABLE IF EXISTS directors",
    "DROP TABLE IF EXISTS students",
    "DROP TABLE IF EXISTS batches",
    "DROP TABLE IF EXISTS courses",
    "DROP TABLE IF EXISTS locations",
];
