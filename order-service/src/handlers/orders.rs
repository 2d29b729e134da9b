use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{
        ConfirmedOrderResponse, CreateOrderRequest, CreateOrderResponse, VerifyPaymentRequest,
        VerifyPaymentResponse,
    },
    handlers::json_body,
    AppState,
};

/// Place an order. Gateway-routed orders come back with the intent the
/// client opens the checkout with.
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let request = json_body(payload)?;

    tracing::info!(
        method = %request.method,
        items = request.products.len(),
        total = %request.total_amount,
        "Creating order"
    );

    let placed = state.workflow.place_order(request.into()).await?;
    let key_id = state.workflow.gateway().key_id().to_string();

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse::new(placed, &key_id)),
    ))
}

/// Verify the checkout callback signature and settle the payment.
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VerifyPaymentResponse>), AppError> {
    let request = json_body(payload)?;
    request.validate()?;

    tracing::info!(
        razorpay_order_id = %request.razorpay_order_id,
        razorpay_payment_id = %request.razorpay_payment_id,
        "Verifying payment"
    );

    match state.workflow.verify_payment(request.into()).await {
        Ok(verified) => Ok((
            StatusCode::OK,
            Json(VerifyPaymentResponse {
                verified: true,
                message: "Payment verified successfully".to_string(),
                order_confirmed: Some(verified.order_confirmed),
            }),
        )),
        Err(AppError::InvalidSignature) => Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyPaymentResponse {
                verified: false,
                message: "Invalid payment signature".to_string(),
                order_confirmed: None,
            }),
        )),
        Err(e) => Err(e),
    }
}

pub async fn list_user_orders(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<Vec<ConfirmedOrderResponse>>, AppError> {
    let orders = state.workflow.list_confirmed_orders_for_user(&number).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}
