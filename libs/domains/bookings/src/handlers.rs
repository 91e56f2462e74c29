use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AuditEvent, AuditOutcome, AuthUser, JwtAuth, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, BookingRejectedResponse,
        ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse,
        PaymentDeniedResponse, ServiceUnavailableResponse, UnauthorizedResponse,
    },
    jwt_auth_middleware,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

use crate::error::{BookingError, BookingResult};
use crate::models::{
    Availability, Booking, BookingFilter, BookingOutcome, BookingStatus, CallbackData,
    CallbackPayload, CreateBooking, Payer, PaymentInfo, PaymentProvider, PaymentStatus,
    Resolution, VerifyResponse,
};
use crate::service::BookingService;

pub const BOOKINGS_TAG: &str = "bookings";
pub const EVENTS_TAG: &str = "events";
pub const PAYMENTS_TAG: &str = "payments";

/// OpenAPI documentation for the booking endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        create_booking,
        event_availability,
        payment_callback,
        verify_payment,
        list_bookings,
        get_booking,
        cancel_booking,
    ),
    components(
        schemas(
            Availability, Booking, BookingFilter, BookingOutcome, BookingStatus,
            CallbackAck, CallbackData, CallbackPayload, CreateBooking, PaymentInfo,
            PaymentProvider, PaymentStatus, Resolution, VerifyResponse
        ),
        responses(
            BadRequestUuidResponse,
            BadRequestValidationResponse,
            BookingRejectedResponse,
            ForbiddenResponse,
            InternalServerErrorResponse,
            NotFoundResponse,
            PaymentDeniedResponse,
            ServiceUnavailableResponse,
            UnauthorizedResponse
        )
    ),
    tags(
        (name = BOOKINGS_TAG, description = "Booking lifecycle endpoints"),
        (name = EVENTS_TAG, description = "Event booking and availability"),
        (name = PAYMENTS_TAG, description = "Payment gateway callbacks")
    )
)]
pub struct ApiDoc;

/// Acknowledgement returned to the payment gateway
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackAck {
    pub received: bool,
}

/// Build the booking router.
///
/// Availability and the gateway callback are public; everything else sits
/// behind the JWT middleware.
pub fn router(service: BookingService, auth: JwtAuth) -> Router {
    let shared_service = Arc::new(service);

    let public = Router::new()
        .route("/events/{id}/availability", get(event_availability))
        .route("/payments/callback", post(payment_callback));

    let protected = Router::new()
        .route("/events/{id}/book", post(create_booking))
        .route("/bookings", get(list_bookings))
        .route("/bookings/verify/{reference}", post(verify_payment))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
        .route_layer(middleware::from_fn_with_state(auth, jwt_auth_middleware));

    public.merge(protected).with_state(shared_service)
}

/// Book tickets for an event
///
/// Free events are confirmed immediately. Paid events return a pending
/// booking with a checkout URL.
#[utoipa::path(
    post,
    path = "/events/{id}/book",
    tag = EVENTS_TAG,
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = CreateBooking,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Booking created", body = BookingOutcome),
        (status = 400, response = BookingRejectedResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = PaymentDeniedResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthUser,
    headers: HeaderMap,
    UuidPath(event_id): UuidPath,
    ValidatedJson(input): ValidatedJson<CreateBooking>,
) -> BookingResult<impl IntoResponse> {
    let payer = Payer {
        user_id: user.id,
        email: user.email,
        name: (!user.name.is_empty()).then_some(user.name),
    };

    let result = service.create_booking(event_id, payer, input).await;

    let (outcome, details) = match &result {
        Ok(outcome) => (
            AuditOutcome::Success,
            json!({
                "event_id": event_id,
                "booking_id": outcome.booking.id,
                "quantity": outcome.booking.quantity,
                "status": outcome.booking.status,
            }),
        ),
        Err(err) => (
            AuditOutcome::Failure,
            json!({ "event_id": event_id, "error": err.to_string() }),
        ),
    };
    AuditEvent::new(
        Some(user.id.to_string()),
        "booking.create",
        Some(format!("event:{}", event_id)),
        outcome,
    )
    .from_request(&headers)
    .with_details(details)
    .log();

    Ok((StatusCode::CREATED, Json(result?)))
}

/// Remaining capacity for an event
#[utoipa::path(
    get,
    path = "/events/{id}/availability",
    tag = EVENTS_TAG,
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Capacity snapshot", body = Availability),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn event_availability(
    State(service): State<Arc<BookingService>>,
    UuidPath(event_id): UuidPath,
) -> BookingResult<Json<Availability>> {
    let availability = service.event_availability(event_id).await?;
    Ok(Json(availability))
}

/// Payment gateway webhook
///
/// Always answers 200 so the gateway does not retry application-level
/// failures. Unknown references and malformed bodies are logged.
#[utoipa::path(
    post,
    path = "/payments/callback",
    tag = PAYMENTS_TAG,
    request_body = CallbackPayload,
    responses(
        (status = 200, description = "Callback received", body = CallbackAck)
    )
)]
async fn payment_callback(
    State(service): State<Arc<BookingService>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<CallbackAck>) {
    let ack = (StatusCode::OK, Json(CallbackAck { received: true }));

    let payload: CallbackPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Malformed payment callback");
            AuditEvent::new(None, "payment.callback", None, AuditOutcome::Failure)
                .from_request(&headers)
                .with_details(json!({ "error": "malformed body" }))
                .log();
            return ack;
        }
    };

    let reference = payload.data.reference.clone();
    let reported = payload.reported_status();
    let resource = Some(format!("reference:{}", reference));

    match service.reconcile(&reference, reported).await {
        Ok(outcome) => {
            tracing::info!(
                reference = %reference,
                reported = %reported,
                resolution = ?outcome.resolution,
                status = %outcome.booking.status,
                "Payment callback reconciled"
            );
            AuditEvent::new(None, "payment.callback", resource, AuditOutcome::Success)
                .from_request(&headers)
                .with_details(json!({
                    "event": payload.event,
                    "reported": reported,
                    "resolution": outcome.resolution,
                    "booking_id": outcome.booking.id,
                }))
                .log();
        }
        Err(err) => {
            match &err {
                BookingError::NotFound(_) => {
                    tracing::warn!(reference = %reference, "Payment callback for unknown reference")
                }
                BookingError::GatewayUnavailable(_) => tracing::warn!(
                    reference = %reference,
                    error = %err,
                    "Payment callback left booking pending"
                ),
                _ => tracing::error!(reference = %reference, error = %err, "Payment callback failed"),
            }
            AuditEvent::new(None, "payment.callback", resource, AuditOutcome::Failure)
                .from_request(&headers)
                .with_details(json!({ "reported": reported, "error": err.to_string() }))
                .log();
        }
    }

    ack
}

/// Re-check a payment with the gateway
///
/// Fallback for when the gateway callback never arrived.
#[utoipa::path(
    post,
    path = "/bookings/verify/{reference}",
    tag = BOOKINGS_TAG,
    params(("reference" = String, Path, description = "Payment reference")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Post-reconciliation booking", body = VerifyResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn verify_payment(
    State(service): State<Arc<BookingService>>,
    user: AuthUser,
    headers: HeaderMap,
    Path(reference): Path<String>,
) -> BookingResult<Json<VerifyResponse>> {
    let outcome = service.manual_verify(&reference, user.id).await?;

    AuditEvent::new(
        Some(user.id.to_string()),
        "booking.verify",
        Some(format!("booking:{}", outcome.booking.id)),
        AuditOutcome::Success,
    )
    .from_request(&headers)
    .with_details(json!({ "reference": reference, "resolution": outcome.resolution }))
    .log();

    Ok(Json(outcome.into()))
}

/// List the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings",
    tag = BOOKINGS_TAG,
    params(BookingFilter),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Bookings, newest first", body = Vec<Booking>),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_bookings(
    State(service): State<Arc<BookingService>>,
    user: AuthUser,
    Query(filter): Query<BookingFilter>,
) -> BookingResult<Json<Vec<Booking>>> {
    let bookings = service.list_user_bookings(user.id, filter).await?;
    Ok(Json(bookings))
}

/// Get one of the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = BOOKINGS_TAG,
    params(("id" = Uuid, Path, description = "Booking ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Booking found", body = Booking),
        (status = 400, response = BadRequestUuidResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthUser,
    UuidPath(id): UuidPath,
) -> BookingResult<Json<Booking>> {
    let booking = service.get_booking_for_user(id, user.id).await?;
    Ok(Json(booking))
}

/// Cancel a pending booking
#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = BOOKINGS_TAG,
    params(("id" = Uuid, Path, description = "Booking ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn cancel_booking(
    State(service): State<Arc<BookingService>>,
    user: AuthUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> BookingResult<Json<Booking>> {
    let booking = service.cancel_booking(id, user.id).await?;

    AuditEvent::new(
        Some(user.id.to_string()),
        "booking.cancel",
        Some(format!("booking:{}", id)),
        AuditOutcome::Success,
    )
    .from_request(&headers)
    .with_details(json!({ "event_id": booking.event_id }))
    .log();

    Ok(Json(booking))
}
