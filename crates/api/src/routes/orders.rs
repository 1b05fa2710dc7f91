//! Order and order-item endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{Order, OrderItem, ShopStore};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::routes::products::ProductShortInfo;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub product_name: String,
    pub price: Money,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            product_name: item.product_name,
            price: item.price,
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub status: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            user_id: order.user_id,
            created_at: order.created_at,
            items: order.items.into_iter().map(Into::into).collect(),
        }
    }
}

// -- Handlers --

/// POST /orders — create a new empty order for the caller.
#[tracing::instrument(skip(state))]
pub async fn create<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state.orders.create_order(user).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — the caller's order history, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_orders(user).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/:id — load one of the caller's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .get_order(user, OrderId::from_uuid(id))
        .await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/items — add a product to the order.
///
/// Responds 409 with the recommendation payload when the product's stock
/// cannot cover the requested quantity.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .add_item(user, OrderId::from_uuid(id), req.product_id, req.quantity)
        .await?;
    Ok(Json(order.into()))
}

/// PUT /orders/:id/items/:item_id — set a line item's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .update_item(
            user,
            OrderId::from_uuid(id),
            OrderItemId::from_uuid(item_id),
            req.quantity,
        )
        .await?;
    Ok(Json(order.into()))
}

/// DELETE /orders/:id/items/:item_id — remove a line item, returning its
/// quantity to stock.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .remove_item(
            user,
            OrderId::from_uuid(id),
            OrderItemId::from_uuid(item_id),
        )
        .await?;
    Ok(Json(order.into()))
}

/// GET /orders/:id/shortages — dry-run shortage report: for every line
/// item the current stock cannot satisfy, the substitutes on offer.
#[tracing::instrument(skip(state))]
pub async fn shortages<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<HashMap<ProductId, Vec<ProductShortInfo>>>, ApiError> {
    let report = state
        .orders
        .order_shortages(user, OrderId::from_uuid(id))
        .await?;

    Ok(Json(
        report
            .into_iter()
            .map(|(product_id, alternatives)| {
                (
                    product_id,
                    alternatives.into_iter().map(Into::into).collect(),
                )
            })
            .collect(),
    ))
}
