use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use salon_core::SalonError;
use salon_core::booking::{
    BookingRequest, BookingService, BookingStore, MISSING_FIELDS, MemoryBookingStore,
    PgBookingStore,
};
use salon_core::maintenance::MaintenanceFlag;
use salon_core::portfolio::{
    BlobStore, DiskBlobStore, MAX_FILE_SIZE, MAX_FILES, MemoryBlobStore, PortfolioImage,
    PortfolioService, UploadedFile,
};
use salon_db::models::Booking;

use crate::config::{PortfolioBackend, SalonConfig, StorageBackend};

/// Multipart field name carrying portfolio images.
pub const UPLOAD_FIELD: &str = "images";

/// Whole-request limit for uploads: every file at its maximum plus room for
/// multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_FILES * MAX_FILE_SIZE + 1024 * 1024;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    /// A 500 whose body carries only `public`. The full error chain, which
    /// may name files and hosts, goes to the log.
    pub fn internal(public: &'static str, err: anyhow::Error) -> Self {
        error!(error = %format!("{err:#}"), "{public}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: public.to_owned(),
        }
    }
}

impl From<SalonError> for AppError {
    fn from(err: SalonError) -> Self {
        match err {
            SalonError::Validation(msg) => Self::bad_request(msg),
            SalonError::NotFound(msg) => Self::not_found(msg),
            SalonError::Storage(e) => Self::internal(INTERNAL_ERROR, e),
        }
    }
}

const INTERNAL_ERROR: &str = "Internal server error";

/// Convert a domain error, using `public` as the body of storage failures.
fn storage_failure(public: &'static str) -> impl Fn(SalonError) -> AppError {
    move |err| match err {
        SalonError::Storage(e) => AppError::internal(public, e),
        other => AppError::from(other),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingCreatedResponse {
    pub success: bool,
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MaintenanceResponse {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct MaintenanceUpdatedResponse {
    pub success: bool,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub files: Vec<PortfolioImage>,
}

#[derive(Debug, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub enabled: Option<bool>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything the handlers share. Cloned per request; the services are
/// cheap handles around `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub bookings: BookingService,
    pub portfolio: PortfolioService,
    pub maintenance: Arc<MaintenanceFlag>,
}

impl AppState {
    pub fn new(bookings: Arc<dyn BookingStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            bookings: BookingService::new(bookings),
            portfolio: PortfolioService::new(blobs),
            maintenance: Arc::new(MaintenanceFlag::default()),
        }
    }

    /// Memory-only state, used by tests and `--storage memory --portfolio memory`.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBookingStore::new()),
            Arc::new(MemoryBlobStore::new()),
        )
    }

    /// Build the stores selected by `config`. For the PostgreSQL backend the
    /// store is returned too so the caller can close it on shutdown.
    pub async fn from_config(config: &SalonConfig) -> Result<(Self, Option<PgBookingStore>)> {
        let mut durable = None;
        let bookings: Arc<dyn BookingStore> = match config.storage {
            StorageBackend::Memory => Arc::new(MemoryBookingStore::new()),
            StorageBackend::Postgres => {
                let store = PgBookingStore::connect(&config.db_config).await?;
                durable = Some(store.clone());
                Arc::new(store)
            }
        };

        let blobs: Arc<dyn BlobStore> = match config.portfolio {
            PortfolioBackend::Disk => Arc::new(DiskBlobStore::new(&config.image_dir)),
            PortfolioBackend::Memory => Arc::new(MemoryBlobStore::new()),
        };

        Ok((Self::new(bookings, blobs), durable))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/admin", get(admin_page))
        .route("/api/book", post(create_booking))
        .route("/api/bookings", get(list_bookings))
        .route("/api/bookings/{id}", delete(delete_booking))
        .route("/api/maintenance", get(get_maintenance).post(set_maintenance))
        .route("/api/portfolio", get(list_portfolio))
        .route(
            "/api/portfolio/upload",
            post(upload_portfolio).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/portfolio/{filename}", delete(delete_portfolio_image))
        .route("/image/{filename}", get(serve_image))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &SalonConfig) -> Result<()> {
    let (state, durable) = AppState::from_config(config).await?;
    info!(
        storage = state.bookings.backend(),
        portfolio = state.portfolio.backend(),
        "stores ready"
    );

    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", config.bind, config.port))?;
    info!("salon serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(store) = durable {
        store.close().await;
    }
    info!("salon serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Booking handlers
// ---------------------------------------------------------------------------

async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    // A field of the wrong JSON type counts as not filled in.
    let Json(request) = payload.map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(_) => AppError::bad_request(MISSING_FIELDS),
        other => AppError::from(other),
    })?;
    let booking = state
        .bookings
        .book(request)
        .await
        .map_err(storage_failure("Error saving booking"))?;
    Ok(Json(BookingCreatedResponse {
        success: true,
        booking,
    })
    .into_response())
}

async fn list_bookings(State(state): State<AppState>) -> Result<Response, AppError> {
    let bookings = state
        .bookings
        .list()
        .await
        .map_err(storage_failure("Error loading bookings"))?;
    Ok(Json(bookings).into_response())
}

async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    state.bookings.delete_raw(&id).await?;
    Ok(Json(SuccessResponse { success: true }).into_response())
}

// ---------------------------------------------------------------------------
// Maintenance handlers
// ---------------------------------------------------------------------------

async fn get_maintenance(State(state): State<AppState>) -> Json<MaintenanceResponse> {
    Json(MaintenanceResponse {
        enabled: state.maintenance.is_enabled(),
    })
}

async fn set_maintenance(
    State(state): State<AppState>,
    payload: Result<Json<MaintenanceRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let enabled = request
        .enabled
        .ok_or_else(|| AppError::bad_request("enabled must be a boolean"))?;
    let enabled = state.maintenance.set(enabled);
    Ok(Json(MaintenanceUpdatedResponse {
        success: true,
        enabled,
    })
    .into_response())
}

// ---------------------------------------------------------------------------
// Portfolio handlers
// ---------------------------------------------------------------------------

async fn list_portfolio(State(state): State<AppState>) -> Result<Response, AppError> {
    let images = state
        .portfolio
        .list()
        .await
        .map_err(storage_failure("Error loading portfolio"))?;
    Ok(Json(images).into_response())
}

async fn upload_portfolio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart?;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid multipart request: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(format!("Multipart error: {e}")))?;

        files.push(UploadedFile {
            original_name,
            content_type,
            data: data.to_vec(),
        });
        // One past the limit is enough for the policy to reject the batch.
        if files.len() > MAX_FILES {
            break;
        }
    }

    let stored = state
        .portfolio
        .upload(files)
        .await
        .map_err(storage_failure("Error uploading images"))?;
    Ok(Json(UploadResponse {
        success: true,
        files: stored,
    })
    .into_response())
}

async fn delete_portfolio_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    state
        .portfolio
        .delete(&filename)
        .await
        .map_err(storage_failure("Error deleting image"))?;
    Ok(Json(SuccessResponse { success: true }).into_response())
}

async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.portfolio.fetch(&filename).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    Ok(([(CONTENT_TYPE, mime.to_string())], bytes).into_response())
}

// ---------------------------------------------------------------------------
// Admin page
// ---------------------------------------------------------------------------

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

async fn admin_page(State(state): State<AppState>) -> Result<Response, AppError> {
    let bookings = state.bookings.list().await?;
    let images = state.portfolio.list().await?;

    let booking_rows = if bookings.is_empty() {
        "<tr><td colspan=\"9\">No bookings yet.</td></tr>".to_string()
    } else {
        bookings
            .iter()
            .map(|b| {
                let message = if b.message.is_empty() {
                    "None"
                } else {
                    b.message.as_str()
                };
                format!(
                    "<tr><td>{id}</td><td>{name}</td><td>{email}</td><td>{phone}</td>\
<td>{date}</td><td>{time}</td><td>{service}</td><td>{message}</td><td>{created}</td></tr>",
                    id = b.id,
                    name = escape_html(&b.name),
                    email = escape_html(&b.email),
                    phone = escape_html(&b.phone),
                    date = escape_html(&b.date),
                    time = escape_html(&b.time),
                    service = escape_html(&b.service),
                    message = escape_html(message),
                    created = b.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let image_items = if images.is_empty() {
        "<li>No portfolio images.</li>".to_string()
    } else {
        images
            .iter()
            .map(|img| {
                format!(
                    "<li><a href=\"{url}\">{name}</a></li>",
                    url = escape_html(&img.url),
                    name = escape_html(&img.filename),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let maintenance = if state.maintenance.is_enabled() {
        "on"
    } else {
        "off"
    };

    let html = format!(
        "<!DOCTYPE html>\
<html><head><title>salon admin</title></head><body>\
<h1>Admin dashboard</h1>\
<p>Maintenance mode: <strong id=\"maintenance\">{maintenance}</strong></p>\
<h2>Bookings</h2>\
<table><tr><th>ID</th><th>Name</th><th>Email</th><th>Phone</th><th>Date</th>\
<th>Time</th><th>Service</th><th>Message</th><th>Created</th></tr>{booking_rows}</table>\
<h2>Portfolio</h2><ul>{image_items}</ul>\
</body></html>"
    );

    Ok(Html(html).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    const BOUNDARY: &str = "salon-test-boundary";

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn delete_req(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json_req(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// (field name, file name, content type, bytes)
    fn multipart_req(parts: &[(&str, &str, &str, Vec<u8>)]) -> Request<Body> {
        let mut body = Vec::new();
        for (field, file_name, content_type, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/portfolio/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn ann() -> Value {
        json!({
            "name": "Ann",
            "email": "a@b.com",
            "phone": "555-1212",
            "date": "2099-01-01",
            "time": "10:00",
            "service": "Mani"
        })
    }

    fn app() -> Router {
        build_router(AppState::in_memory())
    }

    // -----------------------------------------------------------------------
    // Bookings
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_book_then_list() {
        let app = app();

        let resp = send(&app, json_req("/api/book", ann())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["booking"]["id"], 1);
        assert_eq!(json["booking"]["name"], "Ann");
        assert_eq!(json["booking"]["message"], "");
        assert!(json["booking"]["createdAt"].is_string());

        let resp = send(&app, get_req("/api/bookings")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let arr = json.as_array().expect("response should be an array");
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["id"], 1);
        assert_eq!(arr[0]["name"], "Ann");
    }

    #[tokio::test]
    async fn test_book_missing_service_is_400_and_not_stored() {
        let app = app();
        let mut body = ann();
        body.as_object_mut().unwrap().remove("service");

        let resp = send(&app, json_req("/api/book", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "All required fields must be filled");

        let json = body_json(send(&app, get_req("/api/bookings")).await).await;
        assert_eq!(json, json!([]));
    }

    #[tokio::test]
    async fn test_book_blank_field_is_400() {
        let app = app();
        let mut body = ann();
        body["name"] = json!("   ");
        let resp = send(&app, json_req("/api/book", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_book_malformed_json_is_400() {
        let app = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/book")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_book_wrongly_typed_field_is_missing_fields() {
        let app = app();
        let mut body = ann();
        body["phone"] = json!(5551212);

        let resp = send(&app, json_req("/api/book", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["error"],
            "All required fields must be filled"
        );

        let json = body_json(send(&app, get_req("/api/bookings")).await).await;
        assert_eq!(json, json!([]));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let app = app();
        for name in ["Ann", "Bea"] {
            let mut body = ann();
            body["name"] = json!(name);
            send(&app, json_req("/api/book", body)).await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let json = body_json(send(&app, get_req("/api/bookings")).await).await;
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Bea", "Ann"]);
    }

    #[tokio::test]
    async fn test_delete_booking() {
        let app = app();
        send(&app, json_req("/api/book", ann())).await;

        let resp = send(&app, delete_req("/api/bookings/1")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "success": true }));

        let json = body_json(send(&app, get_req("/api/bookings")).await).await;
        assert_eq!(json, json!([]));
    }

    #[tokio::test]
    async fn test_delete_unknown_booking_is_404() {
        let app = app();
        send(&app, json_req("/api/book", ann())).await;

        for uri in ["/api/bookings/99", "/api/bookings/abc"] {
            let resp = send(&app, delete_req(uri)).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body_json(resp).await["error"], "Booking not found");
        }

        let json = body_json(send(&app, get_req("/api/bookings")).await).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_maintenance_defaults_off_and_toggles() {
        let app = app();

        let json = body_json(send(&app, get_req("/api/maintenance")).await).await;
        assert_eq!(json, json!({ "enabled": false }));

        let resp = send(&app, json_req("/api/maintenance", json!({ "enabled": true }))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({ "success": true, "enabled": true })
        );
        let json = body_json(send(&app, get_req("/api/maintenance")).await).await;
        assert_eq!(json["enabled"], true);

        send(&app, json_req("/api/maintenance", json!({ "enabled": false }))).await;
        let json = body_json(send(&app, get_req("/api/maintenance")).await).await;
        assert_eq!(json["enabled"], false);
    }

    #[tokio::test]
    async fn test_maintenance_requires_boolean() {
        let app = app();
        let resp = send(&app, json_req("/api/maintenance", json!({}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json = body_json(send(&app, get_req("/api/maintenance")).await).await;
        assert_eq!(json["enabled"], false);
    }

    // -----------------------------------------------------------------------
    // Portfolio
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_portfolio_upload_list_fetch_delete() {
        let app = app();

        let resp = send(
            &app,
            multipart_req(&[
                (UPLOAD_FIELD, "a.jpg", "image/jpeg", vec![0xFF; 3 * 1024 * 1024]),
                (UPLOAD_FIELD, "b.png", "image/png", vec![0x89; 16]),
            ]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        let files = json["files"].as_array().unwrap();
        assert_eq!(files.len(), 2);
        let png_name = files[1]["filename"].as_str().unwrap().to_owned();
        assert!(png_name.ends_with(".png"));
        assert_eq!(files[1]["url"], format!("/image/{png_name}"));

        let json = body_json(send(&app, get_req("/api/portfolio")).await).await;
        assert_eq!(json.as_array().unwrap().len(), 2);

        let resp = send(&app, get_req(&format!("/image/{png_name}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "image/png");

        let resp = send(&app, delete_req(&format!("/api/portfolio/{png_name}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "success": true }));

        let json = body_json(send(&app, get_req("/api/portfolio")).await).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_oversized_image_is_rejected() {
        let app = app();
        let resp = send(
            &app,
            multipart_req(&[(UPLOAD_FIELD, "big.jpg", "image/jpeg", vec![0; 6 * 1024 * 1024])]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json = body_json(send(&app, get_req("/api/portfolio")).await).await;
        assert_eq!(json, json!([]));
    }

    #[tokio::test]
    async fn test_upload_with_text_file_rejects_whole_request() {
        let app = app();
        let resp = send(
            &app,
            multipart_req(&[
                (UPLOAD_FIELD, "a.jpg", "image/jpeg", vec![0xFF; 3 * 1024 * 1024]),
                (UPLOAD_FIELD, "notes.txt", "text/plain", b"hello".to_vec()),
            ]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("Only image files"));

        let json = body_json(send(&app, get_req("/api/portfolio")).await).await;
        assert_eq!(json, json!([]), "nothing from the batch should be stored");
    }

    #[tokio::test]
    async fn test_upload_without_files_is_rejected() {
        let app = app();
        let resp = send(
            &app,
            multipart_req(&[("caption", "x.txt", "text/plain", b"hi".to_vec())]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "No files uploaded");
    }

    #[tokio::test]
    async fn test_upload_too_many_files_is_rejected() {
        let app = app();
        let parts: Vec<_> = (0..=MAX_FILES)
            .map(|i| (UPLOAD_FIELD, "p.jpg", "image/jpeg", vec![i as u8; 8]))
            .collect();
        let resp = send(&app, multipart_req(&parts)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_requires_multipart() {
        let app = app();
        let resp = send(&app, json_req("/api/portfolio/upload", json!({}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_image_is_500() {
        let app = app();
        let resp = send(&app, delete_req("/api/portfolio/ghost.jpg")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "Error deleting image");
    }

    #[tokio::test]
    async fn test_delete_missing_image_on_disk_hides_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = AppState::new(
            Arc::new(MemoryBookingStore::new()),
            Arc::new(DiskBlobStore::new(tmp.path())),
        );
        let app = build_router(state);

        let resp = send(&app, delete_req("/api/portfolio/ghost.jpg")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json, json!({ "error": "Error deleting image" }));
        let dir = tmp.path().to_string_lossy().into_owned();
        assert!(!json.to_string().contains(&dir));
    }

    #[tokio::test]
    async fn test_missing_image_is_404() {
        let app = app();
        let resp = send(&app, get_req("/image/ghost.jpg")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_disk_portfolio_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let state = AppState::new(
            Arc::new(MemoryBookingStore::new()),
            Arc::new(DiskBlobStore::new(tmp.path())),
        );
        let app = build_router(state);

        let resp = send(
            &app,
            multipart_req(&[(UPLOAD_FIELD, "a.webp", "image/webp", vec![1, 2, 3])]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let name = json["files"][0]["filename"].as_str().unwrap();
        assert_eq!(std::fs::read(tmp.path().join(name)).unwrap(), vec![1, 2, 3]);
    }

    // -----------------------------------------------------------------------
    // Admin page
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_admin_page_lists_bookings_escaped() {
        let app = app();
        let mut body = ann();
        body["name"] = json!("<b>Ann</b>");
        send(&app, json_req("/api/book", body)).await;

        let resp = send(&app, get_req("/admin")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[CONTENT_TYPE].to_str().unwrap().to_owned();
        assert!(content_type.contains("text/html"), "got {content_type}");
        let html = body_text(resp).await;
        assert!(html.contains("&lt;b&gt;Ann&lt;/b&gt;"));
        assert!(!html.contains("<b>Ann</b>"));
        assert!(html.contains("Maintenance mode: <strong id=\"maintenance\">off</strong>"));
    }

    #[test]
    fn escape_html_covers_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    // -----------------------------------------------------------------------
    // PostgreSQL backend
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_booking_api_on_postgres() {
        let (db_pool, db_name) = salon_test_utils::create_test_db().await;
        let state = AppState::new(
            Arc::new(PgBookingStore::new(db_pool.clone())),
            Arc::new(MemoryBlobStore::new()),
        );
        let app = build_router(state);

        let json = body_json(send(&app, json_req("/api/book", ann())).await).await;
        assert_eq!(json["booking"]["id"], 1);

        let json = body_json(send(&app, get_req("/api/bookings")).await).await;
        assert_eq!(json[0]["name"], "Ann");

        let resp = send(&app, delete_req("/api/bookings/7")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        db_pool.close().await;
        salon_test_utils::drop_test_db(&db_name).await;
    }
}
