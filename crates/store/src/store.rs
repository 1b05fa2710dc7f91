use async_trait::async_trait;

use common::{OrderId, OrderItemId, ProductId, UserId};

use crate::Result;
use crate::model::{NewProduct, NewUser, Order, Product, ProductPatch, User};

/// Core trait for shop store implementations.
///
/// The store owns all persisted state: users, the product catalog, orders
/// and their line items. All implementations must be thread-safe
/// (Send + Sync) and must serialize each item mutation against any other
/// concurrent mutation of the same product's stock, so that the
/// check-then-adjust sequence can never interleave.
#[async_trait]
pub trait ShopStore: Send + Sync {
    // -- Users --

    /// Inserts a new user.
    ///
    /// Fails with `DuplicateEmail` if the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    /// Retrieves a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Retrieves a user by email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // -- Catalog --

    /// Inserts a new product.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Retrieves a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists the whole catalog, ordered by name ascending.
    ///
    /// The listing order is the stable tie-break order used by the
    /// recommendation ranking, so it must be deterministic.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Applies a partial update to a product.
    ///
    /// Fails with `ProductNotFound` if the product does not exist.
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product>;

    /// Deletes a product.
    ///
    /// Fails with `ProductNotFound` if the product does not exist.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    // -- Orders --

    /// Creates a new empty order owned by the given user.
    async fn create_order(&self, user_id: UserId) -> Result<Order>;

    /// Retrieves an order with its line items, each carrying the current
    /// product name and price.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>>;

    // -- Atomic item mutations --
    //
    // Each of these runs as a single transaction: the stock check, the
    // stock adjustment and the item change commit together or not at all.

    /// Adds a line item to an order and decrements the product's stock by
    /// `quantity`.
    ///
    /// Fails with `OrderNotFound`, `ProductNotFound`, `InsufficientStock`
    /// (stock below the requested quantity) or `DuplicateItem` (the order
    /// already has a line for this product). On failure nothing is
    /// persisted. Returns the refreshed order on success.
    async fn add_item(&self, order_id: OrderId, product_id: ProductId, quantity: i32)
    -> Result<Order>;

    /// Sets a line item's quantity and applies the equal-and-opposite
    /// stock delta (`stock -= new - current`; a decrease returns
    /// inventory).
    ///
    /// Fails with `OrderNotFound`, `ItemNotFound` or `InsufficientStock`
    /// when the stock cannot cover an increase. Returns the refreshed
    /// order on success.
    async fn update_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        new_quantity: i32,
    ) -> Result<Order>;

    /// Deletes a line item, returning its full quantity to the product's
    /// stock.
    ///
    /// Fails with `OrderNotFound` or `ItemNotFound`. Returns the
    /// refreshed order on success.
    async fn remove_item(&self, order_id: OrderId, item_id: OrderItemId) -> Result<Order>;
}
