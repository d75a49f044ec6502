use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::dtos::clean;
use crate::dtos::transaction::{CreateTransactionRequest, TransactionCreated, TransactionList, TransactionQuery};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthContext;
use crate::models::invoice::DEFAULT_CURRENCY;
use crate::models::transaction::{NewTransaction, TransactionFilter, TransactionStatus};
use crate::state::AppState;

/// Admins see the whole ledger; everyone else only their own entries.
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<TransactionList>> {
    let window = query.window();
    let offset = window.offset()?;
    let filter = TransactionFilter {
        user_id: (!auth.is_admin()).then(|| auth.user_id()),
        invoice_id: query.invoice_id,
        kind: query.kind,
        status: query.status,
    };

    let result = state.store.list_transactions(&filter, window.limit, offset).await?;
    Ok(Json(TransactionList {
        transactions: result.items,
        pagination: window.pagination(result.total),
    }))
}

/// Records a settled ledger entry. A payment that covers its invoice marks it PAID.
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<TransactionCreated>)> {
    if let Some(invoice_id) = req.invoice_id {
        let invoice = state
            .store
            .find_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::not_found("Invoice not found"))?;
        if !auth.is_admin() && invoice.user_id != auth.user_id() {
            return Err(AppError::forbidden("You can only create transactions for your own invoices"));
        }
    }

    let transaction = state
        .store
        .record_transaction(NewTransaction {
            invoice_id: req.invoice_id,
            user_id: auth.user_id(),
            amount: req.amount,
            currency: req.currency.map(|c| c.to_uppercase()).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            kind: req.kind,
            status: TransactionStatus::Completed,
            reference: clean(req.reference),
            description: clean(req.description),
        })
        .await?;

    tracing::info!(
        transaction_id = transaction.id,
        invoice_id = ?transaction.invoice_id,
        kind = ?transaction.kind,
        "transaction recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(TransactionCreated { message: "Transaction created successfully", transaction }),
    ))
}
