use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::dtos::invoice::{CreateInvoiceRequest, InvoiceList, InvoiceQuery, UpdateInvoiceRequest};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthContext;
use crate::models::invoice::{
    generate_invoice_number, Invoice, InvoiceChanges, InvoiceFilter, NewInvoice, DEFAULT_CURRENCY,
};
use crate::state::AppState;

async fn find_visible_invoice(state: &AppState, auth: &AuthContext, id: i64) -> AppResult<Invoice> {
    let invoice = state
        .store
        .find_invoice(id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice not found"))?;

    if !auth.is_admin() && invoice.user_id != auth.user_id() {
        return Err(AppError::forbidden("You do not have access to this invoice"));
    }
    Ok(invoice)
}

/// Admins see every invoice; everyone else only the ones billed to them.
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<InvoiceQuery>,
) -> AppResult<Json<InvoiceList>> {
    let window = query.window();
    let offset = window.offset()?;
    let filter = InvoiceFilter {
        user_id: (!auth.is_admin()).then(|| auth.user_id()),
        status: query.status,
    };

    let result = state.store.list_invoices(&filter, window.limit, offset).await?;
    Ok(Json(InvoiceList {
        invoices: result.items,
        pagination: window.pagination(result.total),
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<Invoice>> {
    Ok(Json(find_visible_invoice(&state, &auth, id).await?))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    let shipment = state
        .store
        .find_shipment(req.shipment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Shipment not found"))?;

    if !auth.is_admin() && shipment.customer_id != auth.user_id() {
        return Err(AppError::forbidden("You can only invoice your own shipments"));
    }
    if state.store.find_invoice_by_shipment(shipment.id).await?.is_some() {
        return Err(AppError::conflict("Invoice already exists for this shipment"));
    }

    let invoice_number = match req.invoice_number.map(|n| n.trim().to_string()) {
        Some(number) => {
            if state.store.find_invoice_by_number(&number).await?.is_some() {
                return Err(AppError::conflict("Invoice number already exists"));
            }
            number
        }
        None => generate_invoice_number(Utc::now().date_naive(), shipment.id),
    };

    let invoice = state
        .store
        .create_invoice(NewInvoice {
            invoice_number,
            shipment_id: shipment.id,
            user_id: shipment.customer_id,
            amount: req.amount,
            currency: req.currency.map(|c| c.to_uppercase()).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            due_date: req.due_date,
        })
        .await?;

    tracing::info!(invoice_id = invoice.id, shipment_id = invoice.shipment_id, "invoice created");
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateInvoiceRequest>,
) -> AppResult<Json<Invoice>> {
    find_visible_invoice(&state, &auth, id).await?;

    let changes = InvoiceChanges {
        amount: req.amount,
        currency: req.currency.map(|c| c.to_uppercase()),
        due_date: req.due_date,
        status: req.status,
    };

    let invoice = state
        .store
        .update_invoice(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice not found"))?;
    Ok(Json(invoice))
}
