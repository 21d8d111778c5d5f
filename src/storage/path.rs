use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::storage::slug::slug;

/// Used when a supplied filename sanitizes down to nothing.
const FALLBACK_FILENAME: &str = "receipt";

/// Computes the canonical storage directory for a receipt, relative to the
/// base directory:
///
/// `{propertyId}_{slug(propertyName)}/{expenseId}_{slug(category_date)}`
///
/// Pure and deterministic. The directory is derived from the entity
/// attributes at upload time and is not recomputed if they change later;
/// the persisted receipt path stays authoritative.
pub fn receipt_dir(
    property_id: i64,
    property_name: &str,
    expense_id: i64,
    category: &str,
    date: NaiveDate,
) -> PathBuf {
    let property_dir = format!("{}_{}", property_id, slug(property_name));
    let expense_dir = format!(
        "{}_{}",
        expense_id,
        slug(&format!("{}_{}", category, date.format("%Y-%m-%d")))
    );
    PathBuf::from(property_dir).join(expense_dir)
}

/// Joins a sanitized filename onto a resolved directory.
pub fn receipt_file(dir: &Path, original_filename: &str) -> PathBuf {
    dir.join(sanitize_filename(original_filename))
}

/// Keeps only the final path segment of a user-supplied filename, so
/// traversal sequences like `../../etc/passwd` collapse to `passwd`.
/// Bare `.`/`..` segments and empty names fall back to a fixed name.
fn sanitize_filename(original: &str) -> String {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();
    match last {
        "" | "." | ".." => FALLBACK_FILENAME.to_string(),
        name => name.to_string(),
    }
}
