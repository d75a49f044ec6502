use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Payment,
    Refund,
    Fee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub invoice_id: Option<i64>,
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewTransaction {
    pub invoice_id: Option<i64>,
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct TransactionFilter {
    pub user_id: Option<i64>,
    pub invoice_id: Option<i64>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
}

/// True once completed payments cover the invoice amount.
pub fn settles(completed_payments: f64, invoice_amount: f64) -> bool {
    completed_payments >= invoice_amount
}
