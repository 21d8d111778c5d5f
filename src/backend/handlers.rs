use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::backend::AppState;
use crate::database::db::queries;
use crate::storage::StorageError;

#[derive(Debug, Deserialize)]
pub struct PropertyPayload {
    pub name: String,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateExpense {
    pub property_id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

fn db_error(err: sqlx::Error) -> Response {
    tracing::error!("database error: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, "database error").into_response()
}

/*==========Property Handlers===========*/

pub async fn get_all_properties(State(state): State<AppState>) -> Response {
    match queries::get_all_properties(&state.db).await {
        Ok(properties) => Json(properties).into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn get_property(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match queries::get_property_by_id(&state.db, id).await {
        Ok(Some(property)) => Json(property).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn create_property(
    State(state): State<AppState>,
    Json(payload): Json<PropertyPayload>,
) -> Response {
    if payload.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "property name must not be empty").into_response();
    }
    match queries::create_property(
        &state.db,
        &payload.name,
        payload.address.as_deref(),
        payload.notes.as_deref(),
    )
    .await
    {
        Ok(property) => Json(property).into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn update_property(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PropertyPayload>,
) -> Response {
    if payload.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "property name must not be empty").into_response();
    }
    match queries::property_exists(&state.db, id).await {
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Ok(true) => {}
        Err(e) => return db_error(e),
    }
    match queries::update_property(
        &state.db,
        id,
        &payload.name,
        payload.address.as_deref(),
        payload.notes.as_deref(),
    )
    .await
    {
        Ok(property) => Json(property).into_response(),
        Err(e) => db_error(e),
    }
}

// No cascade: expenses keep referencing the vanished property id, and any
// stored receipts stay on disk.
pub async fn delete_property(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match queries::delete_property(&state.db, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => db_error(e),
    }
}

/*==========Expense Handlers===========*/

pub async fn get_all_expenses(State(state): State<AppState>) -> Response {
    match queries::get_all_expenses(&state.db).await {
        Ok(expenses) => Json(expenses).into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn get_expenses_by_property(
    State(state): State<AppState>,
    Path(property_id): Path<i64>,
) -> Response {
    match queries::get_expenses_by_property(&state.db, property_id).await {
        Ok(expenses) => Json(expenses).into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn get_expenses_in_range(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Response {
    let start = match NaiveDate::parse_from_str(&range.start, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid start date").into_response(),
    };
    let end = match NaiveDate::parse_from_str(&range.end, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid end date").into_response(),
    };
    match queries::get_expenses_in_range(&state.db, start, end).await {
        Ok(expenses) => Json(expenses).into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateExpense>,
) -> Response {
    // The referenced property must exist; nothing is persisted otherwise.
    match queries::property_exists(&state.db, payload.property_id).await {
        Ok(false) => {
            return (StatusCode::BAD_REQUEST, "referenced property does not exist")
                .into_response()
        }
        Ok(true) => {}
        Err(e) => return db_error(e),
    }
    match queries::create_expense(
        &state.db,
        payload.property_id,
        payload.date,
        &payload.category,
        payload.amount,
        payload.description.as_deref(),
    )
    .await
    {
        Ok(expense) => Json(expense).into_response(),
        Err(e) => db_error(e),
    }
}

pub async fn delete_expense(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match queries::delete_expense(&state.db, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => db_error(e),
    }
}

/*==========Receipt Handlers===========*/

// Write-then-persist: the receipt path is only stored on the expense after
// the file write succeeded, so a failed upload never leaves the record
// pointing at a missing or partial file.
pub async fn upload_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Response {
    let expense = match queries::get_expense_by_id(&state.db, id).await {
        Ok(Some(expense)) => expense,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return db_error(e),
    };
    let property = match queries::get_property_by_id(&state.db, expense.property_id).await {
        Ok(Some(property)) => property,
        Ok(None) => {
            // Dangling foreign key after a property delete.
            return (StatusCode::NOT_FOUND, "owning property no longer exists").into_response();
        }
        Err(e) => return db_error(e),
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = field.file_name().unwrap_or("").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes.to_vec())),
                    Err(e) => {
                        return (StatusCode::BAD_REQUEST, format!("invalid upload: {e}"))
                            .into_response()
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, format!("invalid multipart body: {e}"))
                    .into_response()
            }
        }
    }
    let Some((filename, content)) = upload else {
        return (StatusCode::BAD_REQUEST, "missing multipart field \"file\"").into_response();
    };

    let relative_path = match state.receipts.store(&property, &expense, &content, &filename) {
        Ok(path) => path,
        Err(e) => {
            tracing::error!("receipt upload for expense {id} failed: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to store receipt").into_response();
        }
    };

    if let Err(e) = queries::set_receipt_path(&state.db, id, Some(&relative_path)).await {
        return db_error(e);
    }

    tracing::info!("stored receipt for expense {id} at {relative_path}");
    format!("Receipt uploaded to {relative_path}").into_response()
}

pub async fn get_receipt(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let expense = match queries::get_expense_by_id(&state.db, id).await {
        Ok(Some(expense)) => expense,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return db_error(e),
    };
    let Some(receipt_path) = expense.receipt_path else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match state.receipts.retrieve(&receipt_path) {
        Ok((bytes, content_type)) => {
            let filename = receipt_path.rsplit('/').next().unwrap_or("receipt");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(StorageError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("receipt download for expense {id} failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to read receipt").into_response()
        }
    }
}

pub async fn delete_receipt(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let expense = match queries::get_expense_by_id(&state.db, id).await {
        Ok(Some(expense)) => expense,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return db_error(e),
    };
    let Some(receipt_path) = expense.receipt_path else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Err(e) = state.receipts.remove(&receipt_path) {
        tracing::error!("receipt delete for expense {id} failed: {e}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to delete receipt").into_response();
    }
    if let Err(e) = queries::set_receipt_path(&state.db, id, None).await {
        return db_error(e);
    }

    tracing::info!("deleted receipt for expense {id}");
    "Receipt deleted".into_response()
}
