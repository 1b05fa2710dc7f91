//! Validated product catalog CRUD.
//!
//! Admin edits of the catalog sit outside the stock-aware mutation path;
//! they never consult orders.

use common::ProductId;
use store::{NewProduct, Product, ProductPatch, ShopStore};

use crate::error::DomainError;

/// Ingredient lists carry between 3 and 4 names.
const MIN_INGREDIENTS: usize = 3;
const MAX_INGREDIENTS: usize = 4;

/// Service for managing the product catalog.
pub struct CatalogService<S> {
    store: S,
}

impl<S: ShopStore> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a product after validating its fields.
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        validate_new_product(&product)?;
        Ok(self.store.insert_product(product).await?)
    }

    /// Retrieves a product by id.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, DomainError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(DomainError::ProductNotFound(id))
    }

    /// Lists the whole catalog.
    pub async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.list_products().await?)
    }

    /// Applies a validated partial update.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, DomainError> {
        validate_patch(&patch)?;
        Ok(self.store.update_product(id, patch).await?)
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), DomainError> {
        Ok(self.store.delete_product(id).await?)
    }
}

fn validate_new_product(product: &NewProduct) -> Result<(), DomainError> {
    if product.name.trim().is_empty() {
        return Err(DomainError::Validation("name must not be empty".into()));
    }
    if !product.price.is_positive() {
        return Err(DomainError::Validation(
            "price must be greater than 0".into(),
        ));
    }
    validate_ingredients(&product.ingredients)?;
    if product.stock < 0 {
        return Err(DomainError::Validation("stock must not be negative".into()));
    }
    Ok(())
}

fn validate_patch(patch: &ProductPatch) -> Result<(), DomainError> {
    if let Some(ref name) = patch.name
        && name.trim().is_empty()
    {
        return Err(DomainError::Validation("name must not be empty".into()));
    }
    if let Some(price) = patch.price
        && !price.is_positive()
    {
        return Err(DomainError::Validation(
            "price must be greater than 0".into(),
        ));
    }
    if let Some(ref ingredients) = patch.ingredients {
        validate_ingredients(ingredients)?;
    }
    if let Some(stock) = patch.stock
        && stock < 0
    {
        return Err(DomainError::Validation("stock must not be negative".into()));
    }
    Ok(())
}

fn validate_ingredients(ingredients: &[String]) -> Result<(), DomainError> {
    if !(MIN_INGREDIENTS..=MAX_INGREDIENTS).contains(&ingredients.len()) {
        return Err(DomainError::Validation(format!(
            "ingredients must list between {MIN_INGREDIENTS} and {MAX_INGREDIENTS} names"
        )));
    }
    Ok(())
}
