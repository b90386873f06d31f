// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod actor;
mod live;

use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use clap::Parser;
use repairhub_api::{
    ApiError, AppContext, AssignTechnicianRequest, AssignTechnicianResult, AvailabilityRequest,
    BroadcastPublisher, CancelBookingRequest, CancellationResult, CompleteBookingRequest,
    CompleteBookingResult, ConfirmPaymentRequest, CreateBookingRequest, CreateBookingResult,
    EarningActionRequest, GatewayRegistry, InitiatePaymentRequest, MockGateway,
    PaymentInitiation, PricingRuleRequest, QuoteRequest, QuoteResponse, RefundPaymentRequest,
    RefundResult, RegisterTechnicianRequest, RescheduleBookingRequest, RescheduleResult,
    ServiceConfig, UpdateStatusRequest, UpdateTechnicianProfileRequest, VerificationRequest,
    approve_earning, assign_technician, cancel_booking, complete_booking, confirm_payment,
    create_booking, get_booking, hold_earning, initiate_payment, list_bookings,
    mark_earning_paid, own_profile, quote_price, refund_payment, register_technician,
    reschedule_booking, set_availability, start_booking, update_profile, update_status,
    upsert_pricing_rule, verify_technician,
};
use repairhub_domain::{Booking, BookingStatus, Earning, Payment, PricingRule, Technician};
use repairhub_persistence::Persistence;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::actor::RequestActor;

/// `RepairHub` Server - HTTP server for the repair marketplace
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Path to a JSON service config. Missing keys use the defaults.
    #[arg(short, long)]
    config: Option<String>,
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    /// Store, configuration, gateways and event sink.
    ctx: AppContext,
    /// The publisher behind `ctx`, kept for subscribing live consumers.
    events: BroadcastPublisher,
}

impl AppState {
    fn new(persistence: Persistence, config: ServiceConfig) -> Self {
        let mut gateways: GatewayRegistry = GatewayRegistry::new(&config.default_gateway);
        gateways.register(Arc::new(MockGateway::new()));
        let events: BroadcastPublisher = BroadcastPublisher::new();
        Self {
            ctx: AppContext::new(persistence, config, gateways, Arc::new(events.clone())),
            events,
        }
    }
}

/// Query parameters for listing bookings.
#[derive(Debug, Deserialize)]
struct ListBookingsQuery {
    /// Optional status filter.
    status: Option<String>,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match &err {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::PaymentRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Handler for POST `/bookings`.
async fn handle_create_booking(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResult>), HttpError> {
    let result: CreateBookingResult = create_booking(&app_state.ctx, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Handler for GET `/bookings`.
///
/// Lists the caller's bookings (all bookings for admins).
async fn handle_list_bookings(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>, HttpError> {
    let status: Option<BookingStatus> = query
        .status
        .as_deref()
        .map(str::parse::<BookingStatus>)
        .transpose()
        .map_err(ApiError::from)?;
    let bookings: Vec<Booking> = list_bookings(&app_state.ctx, &actor, status).await?;
    Ok(Json(bookings))
}

/// Handler for GET `/bookings/{id}`.
async fn handle_get_booking(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(booking_id): Path<i64>,
) -> Result<Json<Booking>, HttpError> {
    Ok(Json(get_booking(&app_state.ctx, &actor, booking_id).await?))
}

/// Handler for POST `/bookings/{id}/assign`.
async fn handle_assign_technician(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(booking_id): Path<i64>,
    Json(req): Json<AssignTechnicianRequest>,
) -> Result<Json<AssignTechnicianResult>, HttpError> {
    Ok(Json(
        assign_technician(&app_state.ctx, &actor, booking_id, req).await?,
    ))
}

/// Handler for POST `/bookings/{id}/start`.
async fn handle_start_booking(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(booking_id): Path<i64>,
) -> Result<Json<Booking>, HttpError> {
    Ok(Json(
        start_booking(&app_state.ctx, &actor, booking_id).await?,
    ))
}

/// Handler for POST `/bookings/{id}/complete`.
async fn handle_complete_booking(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(booking_id): Path<i64>,
    Json(req): Json<CompleteBookingRequest>,
) -> Result<Json<CompleteBookingResult>, HttpError> {
    Ok(Json(
        complete_booking(&app_state.ctx, &actor, booking_id, req).await?,
    ))
}

/// Handler for POST `/bookings/{id}/cancel`.
async fn handle_cancel_booking(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(booking_id): Path<i64>,
    Json(req): Json<CancelBookingRequest>,
) -> Result<Json<CancellationResult>, HttpError> {
    Ok(Json(
        cancel_booking(&app_state.ctx, &actor, booking_id, req).await?,
    ))
}

/// Handler for POST `/bookings/{id}/reschedule`.
async fn handle_reschedule_booking(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(booking_id): Path<i64>,
    Json(req): Json<RescheduleBookingRequest>,
) -> Result<Json<RescheduleResult>, HttpError> {
    Ok(Json(
        reschedule_booking(&app_state.ctx, &actor, booking_id, req).await?,
    ))
}

/// Handler for POST `/bookings/{id}/status`.
///
/// Admin override of the booking status.
async fn handle_update_status(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(booking_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, HttpError> {
    Ok(Json(
        update_status(&app_state.ctx, &actor, booking_id, req).await?,
    ))
}

/// Handler for POST `/payments`.
async fn handle_initiate_payment(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentInitiation>), HttpError> {
    let initiation: PaymentInitiation = initiate_payment(&app_state.ctx, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(initiation)))
}

/// Handler for POST `/payments/{id}/confirm`.
async fn handle_confirm_payment(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(payment_id): Path<i64>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<Payment>, HttpError> {
    Ok(Json(
        confirm_payment(&app_state.ctx, &actor, payment_id, req).await?,
    ))
}

/// Handler for POST `/payments/{id}/refund`.
async fn handle_refund_payment(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(payment_id): Path<i64>,
    Json(req): Json<RefundPaymentRequest>,
) -> Result<Json<RefundResult>, HttpError> {
    Ok(Json(
        refund_payment(&app_state.ctx, &actor, payment_id, req).await?,
    ))
}

/// Handler for POST `/technicians`.
async fn handle_register_technician(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<RegisterTechnicianRequest>,
) -> Result<(StatusCode, Json<Technician>), HttpError> {
    let technician: Technician = register_technician(&app_state.ctx, &actor, req).await?;
    Ok((StatusCode::CREATED, Json(technician)))
}

/// Handler for GET `/technicians/me`.
async fn handle_get_own_profile(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
) -> Result<Json<Technician>, HttpError> {
    Ok(Json(own_profile(&app_state.ctx, &actor).await?))
}

/// Handler for PATCH `/technicians/me`.
async fn handle_update_profile(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<UpdateTechnicianProfileRequest>,
) -> Result<Json<Technician>, HttpError> {
    Ok(Json(update_profile(&app_state.ctx, &actor, req).await?))
}

/// Handler for POST `/technicians/me/availability`.
async fn handle_set_availability(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<Technician>, HttpError> {
    Ok(Json(set_availability(&app_state.ctx, &actor, req).await?))
}

/// Handler for POST `/technicians/{id}/verification`.
async fn handle_verify_technician(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(technician_id): Path<i64>,
    Json(req): Json<VerificationRequest>,
) -> Result<Json<Technician>, HttpError> {
    Ok(Json(
        verify_technician(&app_state.ctx, &actor, technician_id, req).await?,
    ))
}

/// Handler for PUT `/pricing-rules`.
async fn handle_upsert_pricing_rule(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<PricingRuleRequest>,
) -> Result<Json<PricingRule>, HttpError> {
    Ok(Json(
        upsert_pricing_rule(&app_state.ctx, &actor, req).await?,
    ))
}

/// Handler for GET `/pricing/quote`.
///
/// Quotes are public; no actor is required.
async fn handle_quote(
    AxumState(app_state): AxumState<AppState>,
    Query(req): Query<QuoteRequest>,
) -> Result<Json<QuoteResponse>, HttpError> {
    let quote = quote_price(
        &app_state.ctx,
        &req.service_type,
        &req.issue_type,
        req.urgency,
    )
    .await?;
    Ok(Json(QuoteResponse { quote }))
}

/// Handler for POST `/earnings/{id}/approve`.
async fn handle_approve_earning(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(earning_id): Path<i64>,
    Json(req): Json<EarningActionRequest>,
) -> Result<Json<Earning>, HttpError> {
    Ok(Json(
        approve_earning(&app_state.ctx, &actor, earning_id, req.note.as_deref()).await?,
    ))
}

/// Handler for POST `/earnings/{id}/hold`.
async fn handle_hold_earning(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(earning_id): Path<i64>,
    Json(req): Json<EarningActionRequest>,
) -> Result<Json<Earning>, HttpError> {
    Ok(Json(
        hold_earning(&app_state.ctx, &actor, earning_id, req.note.as_deref()).await?,
    ))
}

/// Handler for POST `/earnings/{id}/pay`.
async fn handle_mark_earning_paid(
    AxumState(app_state): AxumState<AppState>,
    RequestActor(actor): RequestActor,
    Path(earning_id): Path<i64>,
    Json(req): Json<EarningActionRequest>,
) -> Result<Json<Earning>, HttpError> {
    Ok(Json(
        mark_earning_paid(&app_state.ctx, &actor, earning_id, req.note.as_deref()).await?,
    ))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/bookings",
            post(handle_create_booking).get(handle_list_bookings),
        )
        .route("/bookings/{id}", get(handle_get_booking))
        .route("/bookings/{id}/assign", post(handle_assign_technician))
        .route("/bookings/{id}/start", post(handle_start_booking))
        .route("/bookings/{id}/complete", post(handle_complete_booking))
        .route("/bookings/{id}/cancel", post(handle_cancel_booking))
        .route("/bookings/{id}/reschedule", post(handle_reschedule_booking))
        .route("/bookings/{id}/status", post(handle_update_status))
        .route("/payments", post(handle_initiate_payment))
        .route("/payments/{id}/confirm", post(handle_confirm_payment))
        .route("/payments/{id}/refund", post(handle_refund_payment))
        .route("/technicians", post(handle_register_technician))
        .route(
            "/technicians/me",
            get(handle_get_own_profile).patch(handle_update_profile),
        )
        .route(
            "/technicians/me/availability",
            post(handle_set_availability),
        )
        .route(
            "/technicians/{id}/verification",
            post(handle_verify_technician),
        )
        .route("/pricing-rules", put(handle_upsert_pricing_rule))
        .route("/pricing/quote", get(handle_quote))
        .route("/earnings/{id}/approve", post(handle_approve_earning))
        .route("/earnings/{id}/hold", post(handle_hold_earning))
        .route("/earnings/{id}/pay", post(handle_mark_earning_paid))
        .route("/live", get(live::live_events_handler))
        .with_state(app_state)
}

fn load_config(path: Option<&str>) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        info!("Using default service config");
        return Ok(ServiceConfig::default());
    };
    info!("Loading service config from: {}", path);
    let raw: String = std::fs::read_to_string(path)?;
    Ok(ServiceConfig::from_json(&raw)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing RepairHub Server");

    let config: ServiceConfig = load_config(args.config.as_deref())?;

    // Initialize persistence (in-memory or file-based based on CLI argument)
    let persistence: Persistence = if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path);
        Persistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        Persistence::new_in_memory()?
    };

    let app_state: AppState = AppState::new(persistence, config);
    // Fail fast if the configured default gateway has no adapter.
    app_state.ctx.gateways().resolve(None)?;

    let _logger = live::spawn_event_logger(&app_state.events);

    // Build router
    let app: Router = build_router(app_state);

    // Bind to address
    let addr: std::net::SocketAddr = format!("127.0.0.1:{}", args.port).parse()?;
    info!("Server listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use repairhub_domain::{DeviceInfo, PaymentStatus, PricingSnapshot, StatusHistoryEntry, Urgency};
    use serde_json::{Value, json};
    use time::macros::{date, datetime};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    use crate::actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

    /// Helper to create test app state with in-memory persistence.
    fn create_test_app_state() -> AppState {
        let persistence: Persistence =
            Persistence::new_in_memory().expect("Failed to create in-memory persistence");
        AppState::new(persistence, ServiceConfig::default())
    }

    /// A standalone booking value for serialization tests.
    pub fn sample_booking() -> Booking {
        let created_at = datetime!(2026-03-01 09:00 UTC);
        Booking {
            booking_id: 1,
            user_id: 10,
            technician_id: None,
            service_type: String::from("mobile"),
            issue_type: String::from("screen_repair"),
            urgency: Urgency::Normal,
            description: String::from("Cracked screen"),
            device: DeviceInfo::default(),
            location: None,
            preferred_date: date!(2026-03-10),
            time_slot: None,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            is_paid: false,
            estimated_cost: 500,
            final_cost: None,
            pricing: PricingSnapshot {
                base_price: 500,
                urgency: Urgency::Normal,
                multiplier: 1.0,
                estimated_cost: 500,
                rule_id: None,
            },
            status_history: vec![StatusHistoryEntry {
                status: String::from("pending"),
                changed_at: created_at,
                changed_by: 10,
                note: None,
            }],
            reschedule_history: Vec::new(),
            reschedule_count: 0,
            notes: None,
            cancellation_reason: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn future_date(days: i64) -> String {
        (OffsetDateTime::now_utc().date() + Duration::days(days)).to_string()
    }

    /// Sends one request and returns the status and decoded JSON body.
    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        actor: Option<(i64, &str)>,
        body: Option<Value>,
    ) -> (HttpStatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = actor {
            builder = builder
                .header(ACTOR_ID_HEADER, id.to_string())
                .header(ACTOR_ROLE_HEADER, role);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn booking_body() -> Value {
        json!({
            "service_type": "mobile",
            "issue_type": "screen_repair",
            "urgency": "urgent",
            "description": "Cracked screen",
            "preferred_date": future_date(7),
        })
    }

    async fn onboard_technician(app: &Router, user_id: i64) -> i64 {
        let (status, technician) = send(
            app,
            "POST",
            "/technicians",
            Some((user_id, "technician")),
            Some(json!({ "specializations": ["mobile"], "experience_years": 4 })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CREATED);
        let technician_id = technician["technician_id"].as_i64().unwrap();

        let (status, _) = send(
            app,
            "POST",
            &format!("/technicians/{technician_id}/verification"),
            Some((1, "admin")),
            Some(json!({ "status": "approved" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);

        let (status, _) = send(
            app,
            "PATCH",
            "/technicians/me",
            Some((user_id, "technician")),
            Some(json!({ "is_online": true })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        technician_id
    }

    #[tokio::test]
    async fn test_missing_actor_headers_are_unauthorized() {
        let app: Router = build_router(create_test_app_state());

        let (status, body) = send(&app, "POST", "/bookings", None, Some(booking_body())).await;
        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], true);
    }

    #[tokio::test]
    async fn test_invalid_role_returns_bad_request() {
        let app: Router = build_router(create_test_app_state());

        let (status, body) = send(
            &app,
            "POST",
            "/bookings",
            Some((10, "superuser")),
            Some(booking_body()),
        )
        .await;
        assert_eq!(status, HttpStatusCode::BAD_REQUEST);
        assert_eq!(body["error"], true);

        let (status, _) = send(&app, "GET", "/bookings", Some((10, "system")), None).await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_and_read_booking() {
        let app: Router = build_router(create_test_app_state());

        let (status, created) = send(
            &app,
            "POST",
            "/bookings",
            Some((10, "user")),
            Some(booking_body()),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CREATED);
        assert_eq!(created["booking"]["status"], "pending");
        assert_eq!(created["auto_assigned"], false);
        let booking_id = created["booking"]["booking_id"].as_i64().unwrap();

        let (status, booking) = send(
            &app,
            "GET",
            &format!("/bookings/{booking_id}"),
            Some((10, "user")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(booking["estimated_cost"], 750);

        let (status, _) = send(
            &app,
            "GET",
            &format!("/bookings/{booking_id}"),
            Some((11, "user")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);

        let (status, _) = send(&app, "GET", "/bookings/999", Some((1, "admin")), None).await;
        assert_eq!(status, HttpStatusCode::NOT_FOUND);

        let (status, list) = send(
            &app,
            "GET",
            "/bookings?status=pending",
            Some((10, "user")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(1));

        let (status, _) = send(
            &app,
            "GET",
            "/bookings?status=archived",
            Some((10, "user")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_full_lifecycle_over_http() {
        let app: Router = build_router(create_test_app_state());
        onboard_technician(&app, 50).await;

        let (status, created) = send(
            &app,
            "POST",
            "/bookings",
            Some((10, "user")),
            Some(booking_body()),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CREATED);
        assert_eq!(created["auto_assigned"], true);
        let booking_id = created["booking"]["booking_id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/start"),
            Some((50, "technician")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::PAYMENT_REQUIRED);

        let (status, initiation) = send(
            &app,
            "POST",
            "/payments",
            Some((10, "user")),
            Some(json!({ "booking_id": booking_id })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CREATED);
        let payment_id = initiation["payment"]["payment_id"].as_i64().unwrap();
        let order_ref = initiation["order"]["order_ref"].as_str().unwrap().to_string();

        let (status, payment) = send(
            &app,
            "POST",
            &format!("/payments/{payment_id}/confirm"),
            Some((10, "user")),
            Some(json!({
                "gateway_payment_id": "pay_http",
                "signature": MockGateway::signature_for(&order_ref, "pay_http"),
            })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(payment["status"], "completed");

        let (status, started) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/start"),
            Some((50, "technician")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(started["status"], "in_progress");

        let (status, completed) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/complete"),
            Some((50, "technician")),
            Some(json!({ "final_cost": 1000 })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(completed["booking"]["status"], "completed");
        assert_eq!(completed["earning"]["commission_amount"], 150);
        let earning_id = completed["earning"]["earning_id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/earnings/{earning_id}/pay"),
            Some((1, "admin")),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CONFLICT);

        let (status, approved) = send(
            &app,
            "POST",
            &format!("/earnings/{earning_id}/approve"),
            Some((1, "admin")),
            Some(json!({ "note": "ok" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(approved["status"], "approved");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/cancel"),
            Some((10, "user")),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_cancel_and_refund_over_http() {
        let app: Router = build_router(create_test_app_state());

        let (_, created) = send(
            &app,
            "POST",
            "/bookings",
            Some((10, "user")),
            Some(booking_body()),
        )
        .await;
        let booking_id = created["booking"]["booking_id"].as_i64().unwrap();

        let (status, initiation) = send(
            &app,
            "POST",
            "/payments",
            Some((10, "user")),
            Some(json!({ "booking_id": booking_id })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CREATED);
        let payment_id = initiation["payment"]["payment_id"].as_i64().unwrap();
        let order_ref = initiation["order"]["order_ref"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/payments/{payment_id}/confirm"),
            Some((10, "user")),
            Some(json!({ "gateway_payment_id": "pay_x", "signature": "forged" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);

        let (status, initiation) = send(
            &app,
            "POST",
            "/payments",
            Some((10, "user")),
            Some(json!({ "booking_id": booking_id })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CREATED);
        let payment_id = initiation["payment"]["payment_id"].as_i64().unwrap();
        let order_ref_retry = initiation["order"]["order_ref"].as_str().unwrap().to_string();
        assert_ne!(order_ref, order_ref_retry);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/payments/{payment_id}/confirm"),
            Some((10, "user")),
            Some(json!({
                "gateway_payment_id": "pay_y",
                "signature": MockGateway::signature_for(&order_ref_retry, "pay_y"),
            })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/payments/{payment_id}/refund"),
            Some((10, "user")),
            Some(json!({ "amount": 100, "reason": "please" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);

        let (status, cancelled) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/cancel"),
            Some((10, "user")),
            Some(json!({ "reason": "Not needed" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(cancelled["booking"]["status"], "cancelled");
        assert_eq!(cancelled["booking"]["payment_status"], "refunded");
        assert_eq!(cancelled["refund"]["status"], "refunded");
    }

    #[tokio::test]
    async fn test_reschedule_and_status_over_http() {
        let app: Router = build_router(create_test_app_state());

        let (_, created) = send(
            &app,
            "POST",
            "/bookings",
            Some((10, "user")),
            Some(booking_body()),
        )
        .await;
        let booking_id = created["booking"]["booking_id"].as_i64().unwrap();

        let (status, rescheduled) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/reschedule"),
            Some((10, "user")),
            Some(json!({ "new_date": future_date(10), "time_slot": "morning" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(rescheduled["booking"]["reschedule_count"], 1);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/reschedule"),
            Some((10, "user")),
            Some(json!({ "new_date": "not-a-date" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/status"),
            Some((10, "user")),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);

        let (status, booking) = send(
            &app,
            "POST",
            &format!("/bookings/{booking_id}/status"),
            Some((1, "admin")),
            Some(json!({ "status": "cancelled", "reason": "Duplicate" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(booking["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_pricing_over_http() {
        let app: Router = build_router(create_test_app_state());

        let (status, quote) = send(
            &app,
            "GET",
            "/pricing/quote?service_type=laptop&issue_type=battery&urgency=emergency",
            None,
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(quote["quote"]["snapshot"]["estimated_cost"], 1000);

        let rule = json!({
            "service_type": "laptop",
            "issue_type": "battery",
            "base_price": 1200,
        });
        let (status, _) = send(
            &app,
            "PUT",
            "/pricing-rules",
            Some((10, "user")),
            Some(rule.clone()),
        )
        .await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);

        let (status, saved) = send(
            &app,
            "PUT",
            "/pricing-rules",
            Some((1, "admin")),
            Some(rule),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(saved["is_active"], true);

        let (status, quote) = send(
            &app,
            "GET",
            "/pricing/quote?service_type=laptop&issue_type=battery",
            None,
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(quote["quote"]["snapshot"]["estimated_cost"], 1200);
        assert_eq!(quote["quote"]["snapshot"]["rule_id"], saved["rule_id"]);
    }

    #[tokio::test]
    async fn test_technician_routes() {
        let app: Router = build_router(create_test_app_state());

        let (status, _) = send(
            &app,
            "GET",
            "/technicians/me",
            Some((50, "technician")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::FORBIDDEN);

        onboard_technician(&app, 50).await;

        let (status, _) = send(
            &app,
            "POST",
            "/technicians",
            Some((50, "technician")),
            Some(json!({ "specializations": ["tablet"] })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CONFLICT);

        let (status, technician) = send(
            &app,
            "POST",
            "/technicians/me/availability",
            Some((50, "technician")),
            Some(json!({ "is_available": false })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(technician["is_available"], false);
        assert_eq!(technician["verification_status"], "approved");

        let (status, profile) = send(
            &app,
            "GET",
            "/technicians/me",
            Some((50, "technician")),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(profile["is_online"], true);
    }

    #[test]
    fn test_api_errors_map_to_status_codes() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (
                ApiError::NotFound {
                    resource: String::from("Booking"),
                    message: String::from("missing"),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::PaymentRequired {
                    message: String::from("unpaid"),
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                ApiError::Gateway {
                    message: String::from("down"),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::Internal {
                    message: String::from("disk"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(HttpError::from(err).status, expected);
        }
    }

    #[test]
    fn test_config_defaults_without_file() {
        let config = load_config(None).expect("Default config should load");
        assert_eq!(config, ServiceConfig::default());
        assert!(load_config(Some("/nonexistent/repairhub.json")).is_err());
    }
}
