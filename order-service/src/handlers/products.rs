use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::{
    dtos::{CreateProductRequest, ProductQuery, ProductResponse, UpdateProductRequest},
    handlers::json_body,
    models::{new_id, Category, ProductUpdate},
    AppState,
};

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let product = json_body(payload)?.into_product(new_id())?;
    let product = state.stores.products.create_product(product).await?;

    tracing::info!(product_id = %product.id, name = %product.name, "Product created");

    Ok((StatusCode::CREATED, Json(product.into())))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = state.stores.products.list_products(query.category()?).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

pub async fn list_categories() -> Json<Vec<&'static str>> {
    Json(Category::ALL.iter().map(|c| c.as_str()).collect())
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, AppError> {
    state
        .stores
        .products
        .get_product(&id)
        .await?
        .map(|product| Json(product.into()))
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, AppError> {
    let update = ProductUpdate::try_from(json_body(payload)?)?;
    if update.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("No fields to update")));
    }

    let product = state
        .stores
        .products
        .update_product(&id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product.into()))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.stores.products.delete_product(&id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Product not found")));
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
