use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

use crate::database::models::{Expense, Property};

/*
CRUD queries for properties and expenses. No transactional guarantee is
assumed between this store and the receipt file store.
 */

/*==========Property Queries===========*/

pub async fn create_property(
    pool: &Pool<Sqlite>,
    name: &str,
    address: Option<&str>,
    notes: Option<&str>,
) -> Result<Property, sqlx::Error> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO properties (name, address, notes)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(address)
    .bind(notes)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(Property {
        id,
        name: name.to_string(),
        address: address.map(str::to_string),
        notes: notes.map(str::to_string),
    })
}

pub async fn get_property_by_id(
    pool: &Pool<Sqlite>,
    property_id: i64,
) -> Result<Option<Property>, sqlx::Error> {
    sqlx::query_as::<_, Property>(
        r#"
        SELECT id, name, address, notes
        FROM properties
        WHERE id = ?
        "#,
    )
    .bind(property_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_all_properties(pool: &Pool<Sqlite>) -> Result<Vec<Property>, sqlx::Error> {
    sqlx::query_as::<_, Property>(
        r#"
        SELECT id, name, address, notes
        FROM properties
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn update_property(
    pool: &Pool<Sqlite>,
    property_id: i64,
    name: &str,
    address: Option<&str>,
    notes: Option<&str>,
) -> Result<Property, sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE properties
        SET name = ?, address = ?, notes = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(address)
    .bind(notes)
    .bind(property_id)
    .execute(pool)
    .await?;

    Ok(Property {
        id: property_id,
        name: name.to_string(),
        address: address.map(str::to_string),
        notes: notes.map(str::to_string),
    })
}

// Returns whether a row was actually deleted. Expenses referencing the
// property are left in place, dangling foreign key and all.
pub async fn delete_property(pool: &Pool<Sqlite>, property_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM properties
        WHERE id = ?
        "#,
    )
    .bind(property_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn property_exists(pool: &Pool<Sqlite>, property_id: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT 1 AS present FROM properties WHERE id = ?
        "#,
    )
    .bind(property_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

/*==========Expense Queries===========*/

// The amount column is TEXT; convert the string to Decimal on the way out.
fn expense_from_row(row: &SqliteRow) -> Result<Expense, sqlx::Error> {
    let amount_text: String = row.get("amount");
    let amount = Decimal::from_str(&amount_text)
        .map_err(|e| sqlx::Error::Decode(format!("invalid Decimal for amount: {}", e).into()))?;

    Ok(Expense {
        id: row.get("id"),
        property_id: row.get("property_id"),
        date: row.try_get("date")?,
        category: row.get("category"),
        amount,
        description: row.get("description"),
        receipt_path: row.get("receipt_path"),
    })
}

pub async fn create_expense(
    pool: &Pool<Sqlite>,
    property_id: i64,
    date: NaiveDate,
    category: &str,
    amount: Decimal,
    description: Option<&str>,
) -> Result<Expense, sqlx::Error> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO expenses (property_id, date, category, amount, description, receipt_path)
        VALUES (?, ?, ?, ?, ?, NULL)
        RETURNING id
        "#,
    )
    .bind(property_id)
    .bind(date)
    .bind(category)
    .bind(amount.to_string())
    .bind(description)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(Expense {
        id,
        property_id,
        date,
        category: category.to_string(),
        amount,
        description: description.map(str::to_string),
        receipt_path: None,
    })
}

pub async fn get_expense_by_id(
    pool: &Pool<Sqlite>,
    expense_id: i64,
) -> Result<Option<Expense>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, property_id, date, category, amount, description, receipt_path
        FROM expenses
        WHERE id = ?
        "#,
    )
    .bind(expense_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(expense_from_row).transpose()
}

pub async fn get_all_expenses(pool: &Pool<Sqlite>) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT id, property_id, date, category, amount, description, receipt_path
        FROM expenses
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(expense_from_row)
    .collect()
}

pub async fn get_expenses_by_property(
    pool: &Pool<Sqlite>,
    property_id: i64,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT id, property_id, date, category, amount, description, receipt_path
        FROM expenses
        WHERE property_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(property_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(expense_from_row)
    .collect()
}

// Inclusive on both ends. Dates are stored as ISO-8601 TEXT, so the
// lexicographic comparison is also the calendar comparison.
pub async fn get_expenses_in_range(
    pool: &Pool<Sqlite>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT id, property_id, date, category, amount, description, receipt_path
        FROM expenses
        WHERE date >= ? AND date <= ?
        ORDER BY date ASC, id ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?
    .iter()
    .map(expense_from_row)
    .collect()
}

// Sets or clears the stored receipt path. Callers only set it after the
// file write succeeded, and clear it after the file was removed.
pub async fn set_receipt_path(
    pool: &Pool<Sqlite>,
    expense_id: i64,
    receipt_path: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE expenses
        SET receipt_path = ?
        WHERE id = ?
        "#,
    )
    .bind(receipt_path)
    .bind(expense_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_expense(pool: &Pool<Sqlite>, expense_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM expenses
        WHERE id = ?
        "#,
    )
    .bind(expense_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn expense_exists(pool: &Pool<Sqlite>, expense_id: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT 1 AS present FROM expenses WHERE id = ?
        "#,
    )
    .bind(expense_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}
