//! Stock-aware order mutation service.
//!
//! Orchestrates add/update/remove of order line items. Every operation
//! receives the authenticated user and checks order ownership; an absent
//! or foreign order reports `OrderNotFound` either way. The store
//! executes each mutation atomically, and a store-level stock shortage is
//! converted here into a domain error carrying the recommendation
//! payload.

use std::collections::HashMap;

use common::{OrderId, OrderItemId, ProductId, UserId};
use store::{Order, Product, ShopStore, StoreError};

use crate::error::DomainError;
use crate::recommendation::{RecommendationEngine, prepare_recommendation_message};

/// Service for managing orders and their line items.
pub struct OrderMutationService<S> {
    store: S,
    recommender: RecommendationEngine<S>,
}

impl<S: ShopStore + Clone> OrderMutationService<S> {
    /// Creates a new service over the given store.
    pub fn new(store: S) -> Self {
        Self {
            recommender: RecommendationEngine::new(store.clone()),
            store,
        }
    }

    /// Returns the recommendation engine sharing this service's store.
    pub fn recommender(&self) -> &RecommendationEngine<S> {
        &self.recommender
    }

    /// Creates a new empty order for the user.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, user: UserId) -> Result<Order, DomainError> {
        Ok(self.store.create_order(user).await?)
    }

    /// Loads an order, checking ownership.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user: UserId, order_id: OrderId) -> Result<Order, DomainError> {
        match self.store.get_order(order_id).await? {
            Some(order) if order.user_id == user => Ok(order),
            _ => Err(DomainError::OrderNotFound(order_id)),
        }
    }

    /// Lists the user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders(user).await?)
    }

    /// Adds a product to an order, decrementing stock atomically.
    ///
    /// On insufficient stock, no state changes and the error carries
    /// recommendations for the product (no exclusions).
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user: UserId,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        self.get_order(user, order_id).await?;

        match self.store.add_item(order_id, product_id, quantity).await {
            Ok(order) => {
                metrics::counter!("order_items_added").increment(1);
                Ok(order)
            }
            Err(StoreError::InsufficientStock { product_id, .. }) => {
                Err(self.insufficient_stock(product_id).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Sets a line item's quantity; the stock delta is applied
    /// atomically. Decreases always succeed and return inventory.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user: UserId,
        order_id: OrderId,
        item_id: OrderItemId,
        new_quantity: i32,
    ) -> Result<Order, DomainError> {
        if new_quantity < 1 {
            return Err(DomainError::InvalidQuantity {
                quantity: new_quantity,
            });
        }
        self.get_order(user, order_id).await?;

        match self.store.update_item(order_id, item_id, new_quantity).await {
            Ok(order) => Ok(order),
            Err(StoreError::InsufficientStock { product_id, .. }) => {
                Err(self.insufficient_stock(product_id).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a line item, returning its full quantity to stock.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user: UserId,
        order_id: OrderId,
        item_id: OrderItemId,
    ) -> Result<Order, DomainError> {
        self.get_order(user, order_id).await?;
        Ok(self.store.remove_item(order_id, item_id).await?)
    }

    /// Dry-run shortage report for a whole order: for every line item the
    /// current stock cannot satisfy, the substitutes it would be offered.
    #[tracing::instrument(skip(self))]
    pub async fn order_shortages(
        &self,
        user: UserId,
        order_id: OrderId,
    ) -> Result<HashMap<ProductId, Vec<Product>>, DomainError> {
        let order = self.get_order(user, order_id).await?;
        self.recommender.find_alternatives_for_order(&order).await
    }

    /// Builds the recoverable shortage error, with recommendations
    /// attached, for the given product.
    async fn insufficient_stock(&self, product_id: ProductId) -> Result<DomainError, DomainError> {
        metrics::counter!("insufficient_stock_total").increment(1);
        let alternatives = self.recommender.find_alternatives(product_id, &[]).await?;
        Ok(DomainError::InsufficientStock {
            recommendations: prepare_recommendation_message(&alternatives),
        })
    }
}
