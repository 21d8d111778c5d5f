use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An expense (rent, mortgage, hoa, maintenance, utilities, ...) charged
/// against a property. `receipt_path` is the relative path of the stored
/// receipt file, `None` until one is attached; it is kept in lock-step
/// with the file on disk by the upload/delete handlers.
///
/// The amount is persisted as TEXT and parsed into a Decimal when rows
/// are read, so no FromRow derive here; see `queries::expense_from_row`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub property_id: i64,
    pub date: NaiveDate,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub receipt_path: Option<String>,
}
