use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use common::{OrderId, OrderItemId, ProductId, UserId};

use crate::error::{Result, StoreError};
use crate::model::{
    NewProduct, NewUser, ORDER_STATUS_CREATED, Order, OrderItem, Product, ProductPatch, User,
};
use crate::store::ShopStore;

/// In-memory shop store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation. Every
/// item mutation holds the single write lock for the whole
/// check-then-adjust sequence, which gives the same serialization
/// guarantee the PostgreSQL store gets from row locking.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<ShopState>>,
}

#[derive(Default)]
struct ShopState {
    users: Vec<User>,
    products: Vec<Product>,
    orders: Vec<OrderRow>,
    items: Vec<ItemRow>,
}

#[derive(Clone)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
struct ItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of live order items.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.items.len()
    }
}

impl ShopState {
    fn build_order(&self, row: &OrderRow) -> Result<Order> {
        let mut items = Vec::new();
        for item in self.items.iter().filter(|i| i.order_id == row.id) {
            let product = self
                .products
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or(StoreError::ProductNotFound(item.product_id))?;
            items.push(OrderItem {
                id: item.id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                product_name: product.name.clone(),
                price: product.price,
            });
        }

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            status: row.status.clone(),
            created_at: row.created_at,
            items,
        })
    }

    fn order_row(&self, id: OrderId) -> Result<&OrderRow> {
        self.orders
            .iter()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound(id))
    }

    fn product_index(&self, id: ProductId) -> Result<usize> {
        self.products
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::ProductNotFound(id))
    }

    fn item_index(&self, order_id: OrderId, item_id: OrderItemId) -> Result<usize> {
        self.items
            .iter()
            .position(|i| i.id == item_id && i.order_id == order_id)
            .ok_or(StoreError::ItemNotFound(item_id))
    }

    fn refreshed_order(&self, id: OrderId) -> Result<Order> {
        let row = self.order_row(id)?.clone();
        self.build_order(&row)
    }
}

#[async_trait]
impl ShopStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let user = User {
            id: UserId::new(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;

        let product = Product {
            id: ProductId::new(),
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            ingredients: product.ingredients,
            stock: product.stock,
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products = state.products.clone();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> Result<Product> {
        let mut state = self.state.write().await;
        let index = state.product_index(id)?;

        let current = &mut state.products[index];
        if let Some(name) = patch.name {
            current.name = name;
        }
        if let Some(description) = patch.description {
            current.description = Some(description);
        }
        if let Some(price) = patch.price {
            current.price = price;
        }
        if let Some(category) = patch.category {
            current.category = category;
        }
        if let Some(ingredients) = patch.ingredients {
            current.ingredients = ingredients;
        }
        if let Some(stock) = patch.stock {
            current.stock = stock;
        }

        Ok(current.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        let index = state.product_index(id)?;

        // Mirror the database foreign key: a referenced product cannot go.
        if state.items.iter().any(|i| i.product_id == id) {
            return Err(StoreError::ProductInUse(id));
        }

        state.products.remove(index);
        Ok(())
    }

    async fn create_order(&self, user_id: UserId) -> Result<Order> {
        let mut state = self.state.write().await;

        let row = OrderRow {
            id: OrderId::new(),
            user_id,
            status: ORDER_STATUS_CREATED.to_string(),
            created_at: Utc::now(),
        };
        state.orders.push(row.clone());
        state.build_order(&row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        match state.orders.iter().find(|o| o.id == id) {
            Some(row) => Ok(Some(state.build_order(row)?)),
            None => Ok(None),
        }
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;

        let mut rows: Vec<&OrderRow> = state
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        rows.into_iter().map(|row| state.build_order(row)).collect()
    }

    async fn add_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Order> {
        let mut state = self.state.write().await;

        state.order_row(order_id)?;
        let product_index = state.product_index(product_id)?;

        let stock = state.products[product_index].stock;
        if stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id,
                available: stock,
                requested: quantity,
            });
        }

        if state
            .items
            .iter()
            .any(|i| i.order_id == order_id && i.product_id == product_id)
        {
            return Err(StoreError::DuplicateItem {
                order_id,
                product_id,
            });
        }

        state.items.push(ItemRow {
            id: OrderItemId::new(),
            order_id,
            product_id,
            quantity,
        });
        state.products[product_index].stock -= quantity;

        state.refreshed_order(order_id)
    }

    async fn update_item(
        &self,
        order_id: OrderId,
        item_id: OrderItemId,
        new_quantity: i32,
    ) -> Result<Order> {
        let mut state = self.state.write().await;

        state.order_row(order_id)?;
        let item_index = state.item_index(order_id, item_id)?;
        let product_id = state.items[item_index].product_id;
        let product_index = state.product_index(product_id)?;

        let stock = state.products[product_index].stock;
        let delta = new_quantity - state.items[item_index].quantity;

        if stock < delta {
            return Err(StoreError::InsufficientStock {
                product_id,
                available: stock,
                requested: delta,
            });
        }

        state.products[product_index].stock -= delta;
        state.items[item_index].quantity = new_quantity;

        state.refreshed_order(order_id)
    }

    async fn remove_item(&self, order_id: OrderId, item_id: OrderItemId) -> Result<Order> {
        let mut state = self.state.write().await;

        state.order_row(order_id)?;
        let item_index = state.item_index(order_id, item_id)?;

        let removed = state.items.remove(item_index);
        let product_index = state.product_index(removed.product_id)?;
        state.products[product_index].stock += removed.quantity;

        state.refreshed_order(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn product(name: &str, category: &str, ingredients: &[&str], stock: i32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(500),
            category: category.to_string(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            stock,
        }
    }

    async fn seeded_order(store: &InMemoryStore) -> Order {
        let user = store
            .insert_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        store.create_order(user.id).await.unwrap()
    }

    #[tokio::test]
    async fn add_item_decrements_stock() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store).await;
        let cake = store
            .insert_product(product("Cake", "cakes", &["flour", "sugar", "cocoa"], 10))
            .await
            .unwrap();

        let refreshed = store.add_item(order.id, cake.id, 3).await.unwrap();

        assert_eq!(refreshed.items.len(), 1);
        assert_eq!(refreshed.items[0].quantity, 3);
        assert_eq!(refreshed.items[0].product_name, "Cake");
        assert_eq!(store.get_product(cake.id).await.unwrap().unwrap().stock, 7);
    }

    #[tokio::test]
    async fn add_item_rejects_insufficient_stock_without_side_effects() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store).await;
        let cake = store
            .insert_product(product("Cake", "cakes", &["flour", "sugar", "cocoa"], 2))
            .await
            .unwrap();

        let err = store.add_item(order.id, cake.id, 5).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                available: 2,
                requested: 5,
                ..
            }
        ));
        assert_eq!(store.get_product(cake.id).await.unwrap().unwrap().stock, 2);
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_add_leaves_first_item_and_stock_unchanged() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store).await;
        let cake = store
            .insert_product(product("Cake", "cakes", &["flour", "sugar", "cocoa"], 10))
            .await
            .unwrap();

        store.add_item(order.id, cake.id, 2).await.unwrap();
        let err = store.add_item(order.id, cake.id, 1).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateItem { .. }));
        let refreshed = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(refreshed.items.len(), 1);
        assert_eq!(refreshed.items[0].quantity, 2);
        assert_eq!(store.get_product(cake.id).await.unwrap().unwrap().stock, 8);
    }

    #[tokio::test]
    async fn update_item_applies_delta_in_both_directions() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store).await;
        let cake = store
            .insert_product(product("Cake", "cakes", &["flour", "sugar", "cocoa"], 10))
            .await
            .unwrap();

        let order = store.add_item(order.id, cake.id, 4).await.unwrap();
        let item_id = order.items[0].id;

        // Increase by 3
        store.update_item(order.id, item_id, 7).await.unwrap();
        assert_eq!(store.get_product(cake.id).await.unwrap().unwrap().stock, 3);

        // Decrease back down, releasing inventory
        store.update_item(order.id, item_id, 1).await.unwrap();
        assert_eq!(store.get_product(cake.id).await.unwrap().unwrap().stock, 9);
    }

    #[tokio::test]
    async fn remove_item_restores_full_quantity() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store).await;
        let cake = store
            .insert_product(product("Cake", "cakes", &["flour", "sugar", "cocoa"], 10))
            .await
            .unwrap();

        let order = store.add_item(order.id, cake.id, 6).await.unwrap();
        let refreshed = store.remove_item(order.id, order.items[0].id).await.unwrap();

        assert!(refreshed.items.is_empty());
        assert_eq!(store.get_product(cake.id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn concurrent_adds_admit_exactly_one_winner() {
        let store = InMemoryStore::new();
        let order_a = seeded_order(&store).await;
        let user_b = store
            .insert_user(NewUser {
                username: "bob".into(),
                email: "bob@example.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let order_b = store.create_order(user_b.id).await.unwrap();
        let cake = store
            .insert_product(product("Cake", "cakes", &["flour", "sugar", "cocoa"], 1))
            .await
            .unwrap();

        let s1 = store.clone();
        let s2 = store.clone();
        let t1 = tokio::spawn(async move { s1.add_item(order_a.id, cake.id, 1).await });
        let t2 = tokio::spawn(async move { s2.add_item(order_b.id, cake.id, 1).await });

        let results = [t1.await.unwrap(), t2.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let shortages = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::InsufficientStock { .. })))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(shortages, 1);
        assert_eq!(store.get_product(cake.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn list_products_orders_by_name() {
        let store = InMemoryStore::new();
        store
            .insert_product(product("Zefir", "sweets", &["sugar", "apple", "egg white"], 5))
            .await
            .unwrap();
        store
            .insert_product(product("Eclair", "pastry", &["flour", "butter", "cream"], 5))
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Eclair".to_string(), "Zefir".to_string()]);
    }

    #[tokio::test]
    async fn referenced_product_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let order = seeded_order(&store).await;
        let cake = store
            .insert_product(product("Cake", "cakes", &["flour", "sugar", "cocoa"], 10))
            .await
            .unwrap();
        store.add_item(order.id, cake.id, 1).await.unwrap();

        let err = store.delete_product(cake.id).await.unwrap_err();
        assert!(matches!(err, StoreError::ProductInUse(id) if id == cake.id));

        // Once the item is gone, deletion goes through.
        let order = store.get_order(order.id).await.unwrap().unwrap();
        store.remove_item(order.id, order.items[0].id).await.unwrap();
        store.delete_product(cake.id).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        let user = NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "hash".into(),
        };
        store.insert_user(user.clone()).await.unwrap();
        let err = store.insert_user(user).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
    }
}
