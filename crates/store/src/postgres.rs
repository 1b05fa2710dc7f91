use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{Money, OrderId, OrderItemId, ProductId, UserId};

use crate::error::{Result, StoreError};
use crate::model::{NewProduct, NewUser, Order, OrderItem, Product, ProductPatch, User};
use crate::store::ShopStore;

use async_trait::async_trait;

/// PostgreSQL-backed shop store implementation.
///
/// Item mutations lock the product row with `SELECT ... FOR UPDATE` so
/// that two concurrent mutations against the same product serialize on
/// the stock check.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL shop store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_user(row: &PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        let ingredients_json: serde_json::Value = row.try_get("ingredients")?;
        let ingredients: Vec<String> = serde_json::from_value(ingredients_json)?;

        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            category: row.try_get("category")?,
            ingredients,
            stock: row.try_get("stock")?,
        })
    }

    /// Loads an order with its items, joining current product name and
    /// price, from the pool (outside any mutation transaction).
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>> {
        let order_row = sqlx::query(
            "SELECT id, user_id, status, created_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(order_row) = order_row else {
            return Ok(None);
        };

        let items = self.fetch_items(id).await?;

        Ok(Some(Order {
            id: OrderId::from_uuid(order_row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(order_row.try_get::<Uuid, _>("user_id")?),
            status: order_row.try_get("status")?,
            created_at: order_row.try_get("created_at")?,
            items,
        }))
    }

    async fn fetch_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
                   p.name AS product_name, p.price_cents
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderItem {
                    id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    quantity: row.try_get("quantity")?,
                    product_name: row.try_get("product_name")?,
                    price: Money::from_cents(row.try_get("price_cents")?),
                })
            })
            .collect()
    }

    /// Re-reads an order that is known to exist after a committed mutation.
    async fn refreshed_order(&self, id: OrderId) -> Result<Order> {
        self.fetch_order(id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))
    }
}

/// Verifies inside a transaction that the order exists.
async fn order_exists(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: OrderId,
) -> Result<()> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1")
        .bind(order_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;

    if found.is_none() {
        return Err(StoreError::OrderNotFound(order_id));
    }
    Ok(())
}

/// Locks an order item row for the remainder of the transaction and
/// returns it. Taking this lock before the product lock keeps the item's
/// quantity consistent with what the stock adjustment will use; a
/// concurrent transaction that deleted or rewrote the item is observed
/// after its commit, never alongside it.
async fn lock_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: OrderId,
    item_id: OrderItemId,
) -> Result<PgRow> {
    sqlx::query(
        "SELECT product_id, quantity FROM order_items WHERE id = $1 AND order_id = $2 FOR UPDATE",
    )
    .bind(item_id.as_uuid())
    .bind(order_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::ItemNotFound(item_id))
}

/// Locks the product row for the remainder of the transaction and returns
/// its current stock.
async fn lock_product_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: ProductId,
) -> Result<i32> {
    let stock: Option<i32> =
        sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;

    stock.ok_or(StoreError::ProductNotFound(product_id))
}

#[async_trait]
impl ShopStore for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let id = UserId::new();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("users_email_key")
            {
                return StoreError::DuplicateEmail(user.email.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, password_hash FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row =
            sqlx::query("SELECT id, username, email, password_hash FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let id = ProductId::new();
        let ingredients_json = serde_json::to_value(&product.ingredients)?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, category, ingredients, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(ingredients_json)
        .bind(product.stock)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            ingredients: product.ingredients,
            stock: product.stock,
        })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, category, ingredients, stock
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, category, ingredients, stock
            FROM products
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, category, ingredients, stock
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let current = row
            .as_ref()
            .map(Self::row_to_product)
            .transpose()?
            .ok_or(StoreError::ProductNotFound(id))?;

        let updated = Product {
            id,
            name: patch.name.unwrap_or(current.name),
            description: patch.description.or(current.description),
            price: patch.price.unwrap_or(current.price),
            category: patch.category.unwrap_or(current.category),
            ingredients: patch.ingredients.unwrap_or(current.ingredients),
            stock: patch.stock.unwrap_or(current.stock),
        };

        let ingredients_json = serde_json::to_value(&updated.ingredients)?;

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price_cents = $4,
                category = $5, ingredients = $6, stock = $7
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&updated.name)
        .bind(&updated.description)
        .bind(updated.price.cents())
        .bind(&updated.category)
        .bind(ingredients_json)
        .bind(updated.stock)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("order_items_product_id_fkey")
                {
                    return StoreError::ProductInUse(id);
                }
                StoreError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id));
        }
        Ok(())
    }

    async fn create_order(&self, user_id: UserId) -> Result<Order> {
        let id = OrderId::new();

        let row = sqlx::query(
            r#"
            INSERT INTO orders (id, user_id)
            VALUES ($1, $2)
            RETURNING status, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(Order {
            id,
            user_id,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            items: Vec::new(),
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        self.fetch_order(id).await
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
            orders.push(self.refreshed_order(id).await?);
        }
        Ok(orders)
    }

    #[tracing::instrument(skip(self))]
    async fn add_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        order_exists(&mut tx, order_id).await?;
        let stock = lock_product_stock(&mut tx, product_id).await?;

        if stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id,
                available: stock,
                requested: quantity,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(OrderItemId::new().as_uuid())
        .bind(order_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("order_items_order_product_key")
            {
                return StoreError::DuplicateItem {
                    order_id,
                    product_id,
                };
            }
            StoreError::Database(e)
        })?;

        sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.refreshed_order(order_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn update_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        new_quantity: i32,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        order_exists(&mut tx, order_id).await?;

        // Lock the item row first: a concurrent mutation of the same item
        // blocks here and re-reads the committed quantity, so the delta is
        // never computed from a stale value.
        let item_row = lock_item(&mut tx, order_id, item_id).await?;
        let product_id = ProductId::from_uuid(item_row.try_get::<Uuid, _>("product_id")?);
        let current_quantity: i32 = item_row.try_get("quantity")?;

        let stock = lock_product_stock(&mut tx, product_id).await?;
        let delta = new_quantity - current_quantity;

        if stock < delta {
            return Err(StoreError::InsufficientStock {
                product_id,
                available: stock,
                requested: delta,
            });
        }

        sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(delta)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query("UPDATE order_items SET quantity = $2 WHERE id = $1")
            .bind(item_id.as_uuid())
            .bind(new_quantity)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item_id));
        }

        tx.commit().await?;
        self.refreshed_order(order_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_item(&self, order_id: OrderId, item_id: OrderItemId) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        order_exists(&mut tx, order_id).await?;

        // Item row lock first; a concurrent remove of the same item blocks
        // here and then finds the row gone instead of restoring stock twice.
        let item_row = lock_item(&mut tx, order_id, item_id).await?;
        let product_id = ProductId::from_uuid(item_row.try_get::<Uuid, _>("product_id")?);
        let quantity: i32 = item_row.try_get("quantity")?;

        // Lock before the stock adjustment so concurrent mutations of the
        // same product serialize here as well.
        lock_product_stock(&mut tx, product_id).await?;

        sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::ItemNotFound(item_id));
        }

        tx.commit().await?;
        self.refreshed_order(order_id).await
    }
}
