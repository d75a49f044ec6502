use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub shipment_id: i64,
    /// Billed customer.
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewInvoice {
    pub invoice_number: String,
    pub shipment_id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    pub due_date: NaiveDate,
}

#[derive(Default)]
pub struct InvoiceChanges {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Default)]
pub struct InvoiceFilter {
    pub user_id: Option<i64>,
    pub status: Option<InvoiceStatus>,
}

pub const DEFAULT_CURRENCY: &str = "MAD";

/// `INV-<yyyymmdd>-<shipment id>-<4 random digits>`.
pub fn generate_invoice_number(today: NaiveDate, shipment_id: i64) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
    format!("INV-{}-{shipment_id}-{suffix}", today.format("%Y%m%d"))
}
