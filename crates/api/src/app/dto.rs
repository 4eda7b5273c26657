use serde::Deserialize;
use serde_json::json;

use ferrobank_core::{AccountId, Money, UserId};
use ferrobank_credit::{Credit, PaymentEntry};
use ferrobank_infra::TransferReceipt;
use ferrobank_ledger::{Account, Transaction};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct OpenAccountRequest {
    pub owner_id: UserId,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    /// Signed amount: positive deposits, negative withdraws.
    pub amount: Money,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Money,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCreditRequest {
    pub account_id: AccountId,
    pub principal: Money,
    pub term_months: u32,
}

// -------------------------
// Response mapping
// -------------------------

pub fn account_to_json(account: &Account) -> serde_json::Value {
    json!({
        "id": account.id,
        "owner_id": account.owner_id,
        "balance": account.balance,
        "currency": account.currency,
        "created_at": account.created_at,
        "updated_at": account.updated_at,
    })
}

pub fn transaction_to_json(tx: &Transaction) -> serde_json::Value {
    json!({
        "id": tx.id,
        "account_id": tx.account_id,
        "amount": tx.amount,
        "kind": tx.kind,
        "description": tx.description,
        "created_at": tx.created_at,
    })
}

pub fn transfer_to_json(receipt: &TransferReceipt) -> serde_json::Value {
    json!({
        "debit": transaction_to_json(&receipt.debit),
        "credit": transaction_to_json(&receipt.credit),
    })
}

pub fn credit_to_json(credit: &Credit) -> serde_json::Value {
    json!({
        "id": credit.id,
        "account_id": credit.account_id,
        "principal": credit.principal,
        "interest_rate": credit.interest_rate,
        "term_months": credit.term_months,
        "start_date": credit.start_date,
        "status": credit.status,
        "created_at": credit.created_at,
    })
}

pub fn schedule_entry_to_json(entry: &PaymentEntry) -> serde_json::Value {
    json!({
        "id": entry.id,
        "credit_id": entry.credit_id,
        "due_date": entry.due_date,
        "amount": entry.amount,
        "principal": entry.principal,
        "interest": entry.interest,
        "status": entry.status,
        "paid_at": entry.paid_at,
    })
}
