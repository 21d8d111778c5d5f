use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A property (house, condo, rental unit, etc). Name is required;
/// address and notes are free text.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub notes: Option<String>,
}
