//! Substitute-product recommendations for insufficient stock.
//!
//! When an order mutation fails because a product cannot cover the
//! requested quantity, the engine offers up to [`MAX_RECOMMENDATIONS`]
//! in-stock substitutes: same-category products ranked by how many
//! ingredients they share with the reference product, backfilled from the
//! rest of the catalog when the category runs short.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use common::{Money, ProductId};
use store::{Order, Product, ShopStore};

use crate::error::DomainError;

/// Maximum number of substitute products offered per shortage.
pub const MAX_RECOMMENDATIONS: usize = 3;

/// Fixed human-readable explanation attached to every shortage payload.
pub const INSUFFICIENT_STOCK_DETAIL: &str = "Not enough stock available";

/// One recommended substitute in an API-facing payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub available_stock: i32,
}

/// Structured shortage payload: a fixed explanation plus up to three
/// substitutes. Never persisted and never partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMessage {
    pub detail: String,
    pub recommendations: Vec<RecommendedProduct>,
}

/// Formats a list of substitute products into a response payload.
pub fn prepare_recommendation_message(products: &[Product]) -> RecommendationMessage {
    RecommendationMessage {
        detail: INSUFFICIENT_STOCK_DETAIL.to_string(),
        recommendations: products
            .iter()
            .map(|p| RecommendedProduct {
                id: p.id,
                name: p.name.clone(),
                price: p.price,
                available_stock: p.stock,
            })
            .collect(),
    }
}

/// Ranks substitutes for `reference` out of a catalog listing.
///
/// `catalog` must be in the store's deterministic listing order; ties in
/// the shared-ingredient ranking and the backfill both keep that order.
/// The result never contains the reference product, an excluded product
/// or anything out of stock, and never exceeds [`MAX_RECOMMENDATIONS`].
pub fn rank_alternatives(
    reference: &Product,
    catalog: Vec<Product>,
    excluded_ids: &[ProductId],
) -> Vec<Product> {
    let excluded: HashSet<ProductId> = excluded_ids.iter().copied().collect();
    let reference_ingredients: HashSet<&str> =
        reference.ingredients.iter().map(String::as_str).collect();

    let (same_category, rest): (Vec<Product>, Vec<Product>) = catalog
        .into_iter()
        .filter(|p| p.id != reference.id && p.stock > 0 && !excluded.contains(&p.id))
        .partition(|p| p.category == reference.category);

    let mut scored: Vec<(usize, Product)> = same_category
        .into_iter()
        .map(|p| {
            let shared = p
                .ingredients
                .iter()
                .filter(|i| reference_ingredients.contains(i.as_str()))
                .count();
            (shared, p)
        })
        .collect();
    // Stable sort: equal scores keep catalog listing order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result: Vec<Product> = scored
        .into_iter()
        .map(|(_, p)| p)
        .take(MAX_RECOMMENDATIONS)
        .collect();

    // Backfill from the rest of the catalog. Backfill can only trigger
    // when every same-category candidate was already selected, so the
    // two pools never overlap.
    for product in rest {
        if result.len() == MAX_RECOMMENDATIONS {
            break;
        }
        result.push(product);
    }

    result
}

/// Recommendation engine over a shop store.
///
/// Read-only: no call here mutates any persisted state.
pub struct RecommendationEngine<S> {
    store: S,
}

impl<S: ShopStore> RecommendationEngine<S> {
    /// Creates a new engine reading from the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Finds up to [`MAX_RECOMMENDATIONS`] substitutes for a product.
    ///
    /// An unknown product yields an empty list rather than an error.
    #[tracing::instrument(skip(self))]
    pub async fn find_alternatives(
        &self,
        product_id: ProductId,
        excluded_ids: &[ProductId],
    ) -> Result<Vec<Product>, DomainError> {
        let start = Instant::now();

        let Some(reference) = self.store.get_product(product_id).await? else {
            return Ok(Vec::new());
        };
        let catalog = self.store.list_products().await?;
        let alternatives = rank_alternatives(&reference, catalog, excluded_ids);

        metrics::histogram!("recommendation_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        Ok(alternatives)
    }

    /// Analyzes a whole order for shortages.
    ///
    /// For every line item whose product's current stock is below the
    /// requested quantity, computes alternatives for that product.
    /// Dry-run only; not wired into any mutation path.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn find_alternatives_for_order(
        &self,
        order: &Order,
    ) -> Result<HashMap<ProductId, Vec<Product>>, DomainError> {
        let mut recommendations = HashMap::new();

        for item in &order.items {
            let Some(product) = self.store.get_product(item.product_id).await? else {
                continue;
            };
            if product.stock < item.quantity {
                let alternatives = self.find_alternatives(item.product_id, &[]).await?;
                recommendations.insert(item.product_id, alternatives);
            }
        }

        Ok(recommendations)
    }
}
