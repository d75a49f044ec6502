use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::page::{PageWindow, Pagination};
use crate::models::invoice::{Invoice, InvoiceStatus};

#[derive(Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub shipment_id: i64,
    #[validate(length(min = 1, message = "Invoice number cannot be empty"))]
    pub invoice_number: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub due_date: NaiveDate,
}

#[derive(Deserialize, Validate)]
pub struct UpdateInvoiceRequest {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: Option<f64>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Deserialize)]
pub struct InvoiceQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<InvoiceStatus>,
}

impl InvoiceQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.limit)
    }
}

#[derive(Serialize)]
pub struct InvoiceList {
    pub invoices: Vec<Invoice>,
    pub pagination: Pagination,
}
