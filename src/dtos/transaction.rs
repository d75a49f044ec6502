use serde::{Deserialize, Serialize};
use validator::Validate;

use super::page::{PageWindow, Pagination};
use crate::models::transaction::{Transaction, TransactionKind, TransactionStatus};

#[derive(Deserialize, Validate)]
pub struct CreateTransactionRequest {
    pub invoice_id: Option<i64>,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub reference: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub invoice_id: Option<i64>,
}

impl TransactionQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.limit)
    }
}

#[derive(Serialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct TransactionCreated {
    pub message: &'static str,
    pub transaction: Transaction,
}
