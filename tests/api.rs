use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequest, Json, Multipart, Path, Query, State};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use property_pilot::backend::handlers::{self, CreateExpense, DateRange, PropertyPayload};
use property_pilot::backend::AppState;
use property_pilot::database::db::queries;
use property_pilot::database::models::{Expense, Property};
use property_pilot::storage::ReceiptStore;

async fn setup() -> (AppState, TempDir) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let dir = TempDir::new().unwrap();
    let state = AppState {
        db: pool,
        receipts: Arc::new(ReceiptStore::new(dir.path())),
    };
    (state, dir)
}

async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn property_payload(name: &str) -> PropertyPayload {
    PropertyPayload {
        name: name.to_string(),
        address: None,
        notes: None,
    }
}

async fn create_property(state: &AppState, name: &str) -> Property {
    let response =
        handlers::create_property(State(state.clone()), Json(property_payload(name))).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn create_expense(state: &AppState, property_id: i64, category: &str, date: &str) -> Expense {
    let payload = CreateExpense {
        property_id,
        date: date.parse().unwrap(),
        category: category.to_string(),
        amount: Decimal::new(1500_00, 2),
        description: None,
    };
    let response = handlers::create_expense(State(state.clone()), Json(payload)).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn multipart_upload(filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "test-boundary-7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn upload(state: &AppState, expense_id: i64, filename: &str, content: &[u8]) -> Response {
    let multipart = Multipart::from_request(multipart_upload(filename, content), &())
        .await
        .unwrap();
    handlers::upload_receipt(State(state.clone()), Path(expense_id), multipart).await
}

#[tokio::test]
async fn property_crud_lifecycle() {
    let (state, _dir) = setup().await;

    let created = create_property(&state, "Main St Duplex").await;
    assert_eq!(created.name, "Main St Duplex");

    let response = handlers::get_property(State(state.clone()), Path(created.id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = handlers::update_property(
        State(state.clone()),
        Path(created.id),
        Json(PropertyPayload {
            name: "Main Street Duplex".to_string(),
            address: Some("12 Main St".to_string()),
            notes: None,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Property = body_json(response).await;
    assert_eq!(updated.name, "Main Street Duplex");
    assert_eq!(updated.address.as_deref(), Some("12 Main St"));

    let response = handlers::delete_property(State(state.clone()), Path(created.id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = handlers::get_property(State(state.clone()), Path(created.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = handlers::delete_property(State(state.clone()), Path(created.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_property_names_are_rejected() {
    let (state, _dir) = setup().await;

    let response =
        handlers::create_property(State(state.clone()), Json(property_payload("   "))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(queries::get_all_properties(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn expense_creation_requires_an_existing_property() {
    let (state, _dir) = setup().await;

    let payload = CreateExpense {
        property_id: 42,
        date: "2024-07-01".parse().unwrap(),
        category: "rent".to_string(),
        amount: Decimal::new(900_00, 2),
        description: None,
    };
    let response = handlers::create_expense(State(state.clone()), Json(payload)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was persisted.
    assert!(queries::get_all_expenses(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn expenses_list_by_property_and_by_inclusive_range() {
    let (state, _dir) = setup().await;
    let duplex = create_property(&state, "Main St Duplex").await;
    let condo = create_property(&state, "Condo").await;

    create_expense(&state, duplex.id, "rent", "2024-06-30").await;
    create_expense(&state, duplex.id, "mortgage", "2024-07-01").await;
    create_expense(&state, condo.id, "hoa", "2024-07-15").await;

    let response =
        handlers::get_expenses_by_property(State(state.clone()), Path(duplex.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let expenses: Vec<Expense> = body_json(response).await;
    assert_eq!(expenses.len(), 2);

    let response = handlers::get_expenses_by_property(State(state.clone()), Path(999)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let expenses: Vec<Expense> = body_json(response).await;
    assert!(expenses.is_empty());

    // Both endpoints of the range are inclusive.
    let response = handlers::get_expenses_in_range(
        State(state.clone()),
        Query(DateRange {
            start: "2024-06-30".to_string(),
            end: "2024-07-15".to_string(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let expenses: Vec<Expense> = body_json(response).await;
    assert_eq!(expenses.len(), 3);

    let response = handlers::get_expenses_in_range(
        State(state.clone()),
        Query(DateRange {
            start: "2024-07-01".to_string(),
            end: "2024-07-01".to_string(),
        }),
    )
    .await;
    let expenses: Vec<Expense> = body_json(response).await;
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].category, "mortgage");
}

#[tokio::test]
async fn malformed_range_dates_are_a_client_error() {
    let (state, _dir) = setup().await;
    let response = handlers::get_expenses_in_range(
        State(state.clone()),
        Query(DateRange {
            start: "July 1st".to_string(),
            end: "2024-07-31".to_string(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn receipt_upload_download_delete_scenario() {
    let (state, dir) = setup().await;
    let duplex = create_property(&state, "Main St Duplex").await;
    // First expense takes id 1; the mortgage expense gets id 2.
    create_expense(&state, duplex.id, "rent", "2024-06-01").await;
    let mortgage = create_expense(&state, duplex.id, "mortgage", "2024-07-01").await;
    assert_eq!(mortgage.id, 2);

    let content = b"%PDF-1.4 mortgage receipt";
    let response = upload(&state, mortgage.id, "receipt.pdf", content).await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = queries::get_expense_by_id(&state.db, mortgage.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.receipt_path.as_deref(),
        Some("1_Main_St_Duplex/2_mortgage_2024-07-01/receipt.pdf")
    );

    let response = handlers::get_receipt(State(state.clone()), Path(mortgage.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"receipt.pdf\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], content);

    let response = handlers::delete_receipt(State(state.clone()), Path(mortgage.id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cleared = queries::get_expense_by_id(&state.db, mortgage.id)
        .await
        .unwrap()
        .unwrap();
    assert!(cleared.receipt_path.is_none());
    // Expense-level dir is gone, property-level dir survives the cleanup.
    assert!(!dir
        .path()
        .join("1_Main_St_Duplex/2_mortgage_2024-07-01")
        .exists());
    assert!(dir.path().join("1_Main_St_Duplex").is_dir());

    let response = handlers::get_receipt(State(state.clone()), Path(mortgage.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = handlers::delete_receipt(State(state.clone()), Path(mortgage.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_filenames_are_sanitized_on_upload() {
    let (state, dir) = setup().await;
    let duplex = create_property(&state, "Main St Duplex").await;
    let exp = create_expense(&state, duplex.id, "maintenance", "2024-05-20").await;

    let response = upload(&state, exp.id, "../../etc/passwd", b"not a passwd").await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = queries::get_expense_by_id(&state.db, exp.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.receipt_path.as_deref(),
        Some("1_Main_St_Duplex/1_maintenance_2024-05-20/passwd")
    );
    assert!(!dir.path().join("etc").exists());
}

#[tokio::test]
async fn upload_to_unknown_expense_is_not_found() {
    let (state, _dir) = setup().await;
    let response = upload(&state, 77, "receipt.pdf", b"bytes").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_a_file_field_is_a_client_error() {
    let (state, _dir) = setup().await;
    let duplex = create_property(&state, "Condo").await;
    let exp = create_expense(&state, duplex.id, "hoa", "2024-02-01").await;

    let boundary = "test-boundary-7MA4YWxkTrZu0gW";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let multipart = Multipart::from_request(request, &()).await.unwrap();

    let response = handlers::upload_receipt(State(state.clone()), Path(exp.id), multipart).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = queries::get_expense_by_id(&state.db, exp.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.receipt_path.is_none());
}

#[tokio::test]
async fn download_with_no_upload_ever_performed_is_not_found() {
    let (state, _dir) = setup().await;
    let duplex = create_property(&state, "Condo").await;
    let exp = create_expense(&state, duplex.id, "utilities", "2024-09-09").await;

    let response = handlers::get_receipt(State(state.clone()), Path(exp.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stale_receipt_path_with_missing_file_is_not_found() {
    let (state, _dir) = setup().await;
    let duplex = create_property(&state, "Condo").await;
    let exp = create_expense(&state, duplex.id, "utilities", "2024-09-09").await;

    // Record points at a file that was never written (or vanished).
    queries::set_receipt_path(&state.db, exp.id, Some("1_Condo/1_utilities_2024-09-09/gone.pdf"))
        .await
        .unwrap();

    let response = handlers::get_receipt(State(state.clone()), Path(exp.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_style_reuploads_are_last_writer_wins() {
    let (state, _dir) = setup().await;
    let duplex = create_property(&state, "Main St Duplex").await;
    let exp = create_expense(&state, duplex.id, "rent", "2024-04-01").await;

    // Two uploads to the same expense: both report success and the later
    // content wins. Accepted weak-consistency policy, not a defect.
    let first = upload(&state, exp.id, "receipt.pdf", b"first").await;
    let second = upload(&state, exp.id, "receipt.pdf", b"second").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);

    let response = handlers::get_receipt(State(state.clone()), Path(exp.id)).await;
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"second");
}

#[tokio::test]
async fn existence_checks_track_create_and_delete() {
    let (state, _dir) = setup().await;
    assert!(!queries::expense_exists(&state.db, 1).await.unwrap());

    let condo = create_property(&state, "Condo").await;
    let exp = create_expense(&state, condo.id, "rent", "2024-01-01").await;
    assert!(queries::expense_exists(&state.db, exp.id).await.unwrap());
    assert!(queries::property_exists(&state.db, condo.id).await.unwrap());

    queries::delete_expense(&state.db, exp.id).await.unwrap();
    assert!(!queries::expense_exists(&state.db, exp.id).await.unwrap());
}

#[tokio::test]
async fn expense_delete_responds_like_the_property_delete() {
    let (state, _dir) = setup().await;
    let duplex = create_property(&state, "Condo").await;
    let exp = create_expense(&state, duplex.id, "rent", "2024-01-01").await;

    let response = handlers::delete_expense(State(state.clone()), Path(exp.id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = handlers::delete_expense(State(state.clone()), Path(exp.id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
