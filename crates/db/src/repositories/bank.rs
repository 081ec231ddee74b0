//! Bank accounts and bank transactions.
//!
//! A bank transaction is either owned (by a payment or a director ledger row,
//! created and removed through them) or manual (OTHER_INCOME / OTHER_EXPENSE,
//! managed here). Each one moves its account balance by its signed amount in
//! the same transaction that writes it.

use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tuition_core::ActorContext;
use tuition_core::cache::bank_scopes;
use tuition_core::effects::{AuditEvent, AuditEventType, Committed, EffectSet};
use tuition_core::posting::{
    BankCategory, BankLink, BankStep, DebitCredit, ExistingBankLink, PaymentMode, balance_effect,
    ensure_covered, plan_bank_transition, validate_amount,
};
use tuition_core::{EntityKind, LedgerError};
use tuition_shared::types::{PageRequest, PageResponse};
use uuid::Uuid;

use super::support::{bounded, db_err, fetch_page, lock_by_id, now};
use crate::entities::{bank_accounts, bank_transactions};

/// Descriptive fields of a bank transaction written on behalf of an owner.
#[derive(Debug, Clone)]
pub(crate) struct BankMeta {
    pub category: BankCategory,
    pub mode: Option<PaymentMode>,
    pub transaction_ref: Option<String>,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub fee_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub created_by: Uuid,
}

impl BankMeta {
    const fn direction(&self) -> DebitCredit {
        self.category.direction()
    }

    /// Money leaving an account must be covered by its balance.
    fn is_outflow(&self) -> bool {
        self.direction() == DebitCredit::Debit
    }
}

/// Moves an account balance by `effect`, checking cover for outflows.
async fn move_balance(
    txn: &DatabaseTransaction,
    account_id: Uuid,
    effect: i64,
    check_cover: bool,
) -> Result<bank_accounts::Model, LedgerError> {
    let account =
        lock_by_id::<bank_accounts::Entity, _>(txn, EntityKind::BankAccount, account_id).await?;
    ensure_covered(account_id, account.balance, effect, check_cover)?;

    let balance = account.balance + effect;
    let mut active: bank_accounts::ActiveModel = account.into();
    active.balance = Set(balance);
    active.updated_at = Set(now());
    active.update(txn).await.map_err(db_err)
}

/// Writes a bank transaction and moves its account balance.
pub(crate) async fn create_bank_transaction(
    txn: &DatabaseTransaction,
    link: BankLink,
    meta: &BankMeta,
) -> Result<bank_transactions::Model, LedgerError> {
    validate_amount(link.amount)?;
    let step = BankStep::Create(link);
    move_balance(
        txn,
        link.account_id,
        balance_effect(&step, meta.direction()),
        meta.is_outflow(),
    )
    .await?;

    let timestamp = now();
    bank_transactions::ActiveModel {
        id: Set(Uuid::now_v7()),
        bank_account_id: Set(link.account_id),
        amount: Set(link.amount),
        debit_credit: Set(meta.direction().into()),
        category: Set(meta.category.into()),
        mode: Set(meta.mode.map(Into::into)),
        transaction_ref: Set(meta.transaction_ref.clone()),
        description: Set(meta.description.clone()),
        transaction_date: Set(meta.transaction_date),
        fee_id: Set(meta.fee_id),
        student_id: Set(meta.student_id),
        location_id: Set(meta.location_id),
        created_by: Set(meta.created_by),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    }
    .insert(txn)
    .await
    .map_err(db_err)
}

/// Loads the current bank link of an owner.
pub(crate) async fn existing_link(
    txn: &DatabaseTransaction,
    transaction_id: Option<Uuid>,
) -> Result<Option<ExistingBankLink>, LedgerError> {
    let Some(id) = transaction_id else {
        return Ok(None);
    };
    let row =
        lock_by_id::<bank_transactions::Entity, _>(txn, EntityKind::BankTransaction, id).await?;
    Ok(Some(ExistingBankLink {
        transaction_id: row.id,
        link: BankLink {
            account_id: row.bank_account_id,
            amount: row.amount,
        },
    }))
}

/// The bank side of an owner edit, split around the owner's own update.
///
/// Creates and adjustments run first so the owner can point at the resulting
/// row; removals run after the owner has dropped its reference.
#[derive(Debug)]
pub(crate) struct BankTransition {
    steps: Vec<BankStep>,
    kept: Option<Uuid>,
}

impl BankTransition {
    /// Plans the move from `old` to `new`.
    pub(crate) fn plan(old: Option<ExistingBankLink>, new: Option<BankLink>) -> Self {
        let kept = match (old, new) {
            (Some(existing), Some(_)) => Some(existing.transaction_id),
            _ => None,
        };
        Self {
            steps: plan_bank_transition(old, new),
            kept,
        }
    }

    /// Runs creates and adjustments. Returns the bank transaction the owner
    /// should link to afterwards.
    pub(crate) async fn apply_leading(
        &self,
        txn: &DatabaseTransaction,
        meta: &BankMeta,
    ) -> Result<Option<Uuid>, LedgerError> {
        let mut link = self.kept;
        for step in &self.steps {
            match *step {
                BankStep::Create(new_link) => {
                    let row = create_bank_transaction(txn, new_link, meta).await?;
                    link = Some(row.id);
                }
                BankStep::Adjust {
                    transaction_id,
                    account_id,
                    new_amount,
                    ..
                } => {
                    move_balance(
                        txn,
                        account_id,
                        balance_effect(step, meta.direction()),
                        meta.is_outflow(),
                    )
                    .await?;
                    let row = lock_by_id::<bank_transactions::Entity, _>(
                        txn,
                        EntityKind::BankTransaction,
                        transaction_id,
                    )
                    .await?;
                    let mut active: bank_transactions::ActiveModel = row.into();
                    active.amount = Set(new_amount);
                    active.transaction_date = Set(meta.transaction_date);
                    active.updated_at = Set(now());
                    active.update(txn).await.map_err(db_err)?;
                }
                BankStep::Remove { .. } => {}
            }
        }
        Ok(link)
    }

    /// Runs removals, restoring the removed rows' balance effects.
    pub(crate) async fn apply_trailing(
        &self,
        txn: &DatabaseTransaction,
        direction: DebitCredit,
    ) -> Result<(), LedgerError> {
        for step in &self.steps {
            if let BankStep::Remove {
                transaction_id,
                link,
            } = *step
            {
                move_balance(txn, link.account_id, balance_effect(step, direction), false).await?;
                bank_transactions::Entity::delete_by_id(transaction_id)
                    .exec(txn)
                    .await
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }
}

/// Deletes an owned bank transaction and restores its balance effect.
pub(crate) async fn remove_bank_transaction(
    txn: &DatabaseTransaction,
    transaction_id: Uuid,
) -> Result<(), LedgerError> {
    let row = lock_by_id::<bank_transactions::Entity, _>(
        txn,
        EntityKind::BankTransaction,
        transaction_id,
    )
    .await?;
    let direction: DebitCredit = row.debit_credit.into();
    move_balance(txn, row.bank_account_id, -direction.signed(row.amount), false).await?;
    bank_transactions::Entity::delete_by_id(transaction_id)
        .exec(txn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Points an owned bank transaction at another fee and student.
pub(crate) async fn reattribute_bank_transaction(
    txn: &DatabaseTransaction,
    transaction_id: Uuid,
    fee_id: Uuid,
    student_id: Uuid,
) -> Result<(), LedgerError> {
    let row = lock_by_id::<bank_transactions::Entity, _>(
        txn,
        EntityKind::BankTransaction,
        transaction_id,
    )
    .await?;
    if row.fee_id == Some(fee_id) {
        return Ok(());
    }
    let mut active: bank_transactions::ActiveModel = row.into();
    active.fee_id = Set(Some(fee_id));
    active.student_id = Set(Some(student_id));
    active.updated_at = Set(now());
    active.update(txn).await.map_err(db_err)?;
    Ok(())
}

/// Input for opening a bank account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBankAccount {
    /// Display name.
    pub name: String,
    /// Bank name.
    pub bank_name: Option<String>,
    /// Account number.
    pub account_number: Option<String>,
    /// Balance at opening.
    pub opening_balance: i64,
}

/// Input for a manual bank transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualBankTransaction {
    /// Account moved.
    pub bank_account_id: Uuid,
    /// Positive amount.
    pub amount: i64,
    /// OTHER_INCOME or OTHER_EXPENSE.
    pub category: BankCategory,
    /// Value date.
    pub transaction_date: NaiveDate,
    /// Free text.
    pub description: Option<String>,
    /// External reference.
    pub transaction_ref: Option<String>,
}

/// Bank account repository.
#[derive(Debug, Clone)]
pub struct BankRepository {
    db: DatabaseConnection,
    tx_timeout: Duration,
}

impl BankRepository {
    /// Creates a new bank repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, tx_timeout: Duration) -> Self {
        Self { db, tx_timeout }
    }

    /// Opens a bank account.
    pub async fn create_account(
        &self,
        input: CreateBankAccount,
    ) -> Result<Committed<bank_accounts::Model>, LedgerError> {
        if input.opening_balance < 0 {
            return Err(LedgerError::Validation(format!(
                "opening balance {} is negative",
                input.opening_balance
            )));
        }
        let timestamp = now();
        let account = bank_accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            bank_name: Set(input.bank_name),
            account_number: Set(input.account_number),
            balance: Set(input.opening_balance),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        let mut effects = EffectSet::new();
        effects.invalidate(bank_scopes());
        Ok(effects.commit(account))
    }

    /// Lists bank accounts by name.
    pub async fn list_accounts(&self) -> Result<Vec<bank_accounts::Model>, LedgerError> {
        bank_accounts::Entity::find()
            .order_by_asc(bank_accounts::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Lists the transactions of an account, newest first.
    pub async fn list_transactions(
        &self,
        account_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageResponse<bank_transactions::Model>, LedgerError> {
        let query = bank_transactions::Entity::find()
            .filter(bank_transactions::Column::BankAccountId.eq(account_id))
            .order_by_desc(bank_transactions::Column::TransactionDate)
            .order_by_desc(bank_transactions::Column::CreatedAt);
        fetch_page(&self.db, query, page).await
    }

    /// Records a manual income or expense.
    pub async fn create_manual(
        &self,
        actor: &ActorContext,
        input: ManualBankTransaction,
    ) -> Result<Committed<bank_transactions::Model>, LedgerError> {
        ensure_manual(input.category)?;
        validate_amount(input.amount)?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let meta = manual_meta(actor, &input);
            let row = create_bank_transaction(
                &txn,
                BankLink {
                    account_id: input.bank_account_id,
                    amount: input.amount,
                },
                &meta,
            )
            .await?;
            txn.commit().await.map_err(db_err)?;

            tracing::info!(
                bank_transaction_id = %row.id,
                account_id = %row.bank_account_id,
                amount = row.amount,
                "manual bank transaction recorded"
            );
            let mut effects = EffectSet::new();
            effects.invalidate(bank_scopes()).audit(AuditEvent::new(
                actor,
                AuditEventType::BankTransactionAdded,
                "Bank transaction",
                format!("{} of {} recorded", category_label(input.category), row.amount),
            ));
            Ok(effects.commit(row))
        })
        .await
    }

    /// Edits a manual transaction: undoes its old balance effect and applies
    /// the new one.
    pub async fn edit_manual(
        &self,
        actor: &ActorContext,
        transaction_id: Uuid,
        input: ManualBankTransaction,
    ) -> Result<Committed<bank_transactions::Model>, LedgerError> {
        ensure_manual(input.category)?;
        validate_amount(input.amount)?;

        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let row = lock_manual(&txn, transaction_id).await?;
            let old_category: BankCategory = row.category.into();

            // Undo the old effect, then apply the new one.
            let old_effect = old_category.direction().signed(row.amount);
            move_balance(&txn, row.bank_account_id, -old_effect, false).await?;
            let new_effect = input.category.direction().signed(input.amount);
            move_balance(
                &txn,
                input.bank_account_id,
                new_effect,
                input.category.direction() == DebitCredit::Debit,
            )
            .await?;

            let mut active: bank_transactions::ActiveModel = row.into();
            active.bank_account_id = Set(input.bank_account_id);
            active.amount = Set(input.amount);
            active.category = Set(input.category.into());
            active.debit_credit = Set(input.category.direction().into());
            active.transaction_date = Set(input.transaction_date);
            active.description = Set(input.description.clone());
            active.transaction_ref = Set(input.transaction_ref.clone());
            active.updated_at = Set(now());
            let row = active.update(&txn).await.map_err(db_err)?;
            txn.commit().await.map_err(db_err)?;

            tracing::info!(bank_transaction_id = %row.id, amount = row.amount, "manual bank transaction updated");
            let mut effects = EffectSet::new();
            effects.invalidate(bank_scopes()).audit(AuditEvent::new(
                actor,
                AuditEventType::BankTransactionUpdated,
                "Bank transaction",
                format!("{} changed to {}", category_label(input.category), row.amount),
            ));
            Ok(effects.commit(row))
        })
        .await
    }

    /// Deletes a manual transaction, restoring its balance effect.
    pub async fn delete_manual(
        &self,
        actor: &ActorContext,
        transaction_id: Uuid,
    ) -> Result<Committed<()>, LedgerError> {
        bounded(self.tx_timeout, async {
            let txn = self.db.begin().await.map_err(db_err)?;
            let row = lock_manual(&txn, transaction_id).await?;
            let amount = row.amount;
            remove_bank_transaction(&txn, row.id).await?;
            txn.commit().await.map_err(db_err)?;

            tracing::info!(bank_transaction_id = %transaction_id, "manual bank transaction deleted");
            let mut effects = EffectSet::new();
            effects.invalidate(bank_scopes()).audit(AuditEvent::new(
                actor,
                AuditEventType::BankTransactionDeleted,
                "Bank transaction",
                format!("transaction of {amount} deleted"),
            ));
            Ok(effects.commit(()))
        })
        .await
    }
}

fn ensure_manual(category: BankCategory) -> Result<(), LedgerError> {
    if category.is_manual() {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "{} transactions are written by their owning posting",
            category_label(category)
        )))
    }
}

async fn lock_manual(
    txn: &DatabaseTransaction,
    transaction_id: Uuid,
) -> Result<bank_transactions::Model, LedgerError> {
    let row = lock_by_id::<bank_transactions::Entity, _>(
        txn,
        EntityKind::BankTransaction,
        transaction_id,
    )
    .await?;
    let category: BankCategory = row.category.into();
    if !category.is_manual() {
        return Err(LedgerError::InvalidState(format!(
            "bank transaction {transaction_id} belongs to a posting and changes only through it"
        )));
    }
    Ok(row)
}

fn manual_meta(actor: &ActorContext, input: &ManualBankTransaction) -> BankMeta {
    BankMeta {
        category: input.category,
        mode: None,
        transaction_ref: input.transaction_ref.clone(),
        description: input.description.clone(),
        transaction_date: input.transaction_date,
        fee_id: None,
        student_id: None,
        location_id: Some(actor.location_id.into_inner()),
        created_by: actor.user_id.into_inner(),
    }
}

const fn category_label(category: BankCategory) -> &'static str {
    match category {
        BankCategory::StudentPayment => "student payment",
        BankCategory::DirectorDisbursement => "director disbursement",
        BankCategory::OtherIncome => "income",
        BankCategory::OtherExpense => "expense",
    }
}
