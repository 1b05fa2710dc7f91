//! Integration tests for the order mutation service over the in-memory
//! store, covering the stock invariant and the recommendation fallback.

use common::{Money, OrderId, UserId};
use domain::{DomainError, OrderMutationService};
use store::{InMemoryStore, NewProduct, NewUser, Product, ShopStore};

async fn register(store: &InMemoryStore, email: &str) -> UserId {
    store
        .insert_user(NewUser {
            username: email.split('@').next().unwrap().to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
        .id
}

async fn seed_product(
    store: &InMemoryStore,
    name: &str,
    category: &str,
    ingredients: &[&str],
    stock: i32,
) -> Product {
    store
        .insert_product(NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(1000),
            category: category.to_string(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            stock,
        })
        .await
        .unwrap()
}

async fn stock_of(store: &InMemoryStore, product: &Product) -> i32 {
    store.get_product(product.id).await.unwrap().unwrap().stock
}

#[tokio::test]
async fn stock_is_conserved_across_mutation_sequences() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let user = register(&store, "alice@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 20).await;
    let order = service.create_order(user).await.unwrap();

    let order = service.add_item(user, order.id, cake.id, 5).await.unwrap();
    let item = order.items[0].id;
    service.update_item(user, order.id, item, 12).await.unwrap();
    service.update_item(user, order.id, item, 2).await.unwrap();
    let order = service.get_order(user, order.id).await.unwrap();

    // stock + live quantities == provisioned stock
    let live: i32 = order.items.iter().map(|i| i.quantity).sum();
    assert_eq!(stock_of(&store, &cake).await + live, 20);

    service.remove_item(user, order.id, item).await.unwrap();
    assert_eq!(stock_of(&store, &cake).await, 20);
}

#[tokio::test]
async fn failed_add_mutates_nothing_and_carries_recommendations() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let user = register(&store, "alice@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 2).await;
    let close = seed_product(&store, "Brownie", "cakes", &["flour", "sugar", "nuts"], 5).await;
    let far = seed_product(&store, "Tart", "cakes", &["flour", "berries", "cream"], 3).await;
    let sold_out = seed_product(&store, "Eclair", "cakes", &["flour", "butter", "cream"], 0).await;

    let order = service.create_order(user).await.unwrap();
    let err = service.add_item(user, order.id, cake.id, 5).await.unwrap_err();

    let DomainError::InsufficientStock { recommendations } = err else {
        panic!("expected InsufficientStock, got {err:?}");
    };

    // No state changed.
    assert_eq!(stock_of(&store, &cake).await, 2);
    assert!(service.get_order(user, order.id).await.unwrap().items.is_empty());

    // At most 3 in-stock substitutes, ranked by shared ingredients,
    // never the reference product and never anything sold out.
    assert!(recommendations.recommendations.len() <= 3);
    assert!(
        recommendations
            .recommendations
            .iter()
            .all(|r| r.available_stock > 0)
    );
    assert!(
        recommendations
            .recommendations
            .iter()
            .all(|r| r.id != cake.id && r.id != sold_out.id)
    );
    assert_eq!(recommendations.recommendations[0].id, close.id);
    assert_eq!(recommendations.recommendations[1].id, far.id);
}

#[tokio::test]
async fn duplicate_add_fails_and_leaves_state_unchanged() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let user = register(&store, "alice@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 10).await;
    let order = service.create_order(user).await.unwrap();

    service.add_item(user, order.id, cake.id, 2).await.unwrap();
    let err = service.add_item(user, order.id, cake.id, 3).await.unwrap_err();

    assert!(matches!(err, DomainError::DuplicateItem));
    let order = service.get_order(user, order.id).await.unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(stock_of(&store, &cake).await, 8);
}

#[tokio::test]
async fn downward_update_always_succeeds_and_releases_stock() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let user = register(&store, "alice@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 5).await;
    let order = service.create_order(user).await.unwrap();
    let order = service.add_item(user, order.id, cake.id, 5).await.unwrap();
    let item = order.items[0].id;

    // Stock is now 0; a decrease must still succeed.
    assert_eq!(stock_of(&store, &cake).await, 0);
    service.update_item(user, order.id, item, 1).await.unwrap();
    assert_eq!(stock_of(&store, &cake).await, 4);
}

#[tokio::test]
async fn update_beyond_stock_fails_with_recommendations() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let user = register(&store, "alice@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 5).await;
    let order = service.create_order(user).await.unwrap();
    let order = service.add_item(user, order.id, cake.id, 3).await.unwrap();
    let item = order.items[0].id;

    // delta = 10 - 3 = 7 > 2 remaining
    let err = service.update_item(user, order.id, item, 10).await.unwrap_err();
    assert!(matches!(err, DomainError::InsufficientStock { .. }));

    let order = service.get_order(user, order.id).await.unwrap();
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(stock_of(&store, &cake).await, 2);
}

#[tokio::test]
async fn foreign_order_is_indistinguishable_from_absent() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let alice = register(&store, "alice@example.com").await;
    let bob = register(&store, "bob@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 10).await;
    let order = service.create_order(alice).await.unwrap();

    let foreign = service.add_item(bob, order.id, cake.id, 1).await.unwrap_err();
    assert!(matches!(foreign, DomainError::OrderNotFound(_)));

    let absent = service.get_order(bob, OrderId::new()).await.unwrap_err();
    assert!(matches!(absent, DomainError::OrderNotFound(_)));
}

#[tokio::test]
async fn rejects_non_positive_quantity() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let user = register(&store, "alice@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 10).await;
    let order = service.create_order(user).await.unwrap();

    let err = service.add_item(user, order.id, cake.id, 0).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidQuantity { quantity: 0 }));
}

#[tokio::test]
async fn concurrent_adds_against_stock_one_admit_one_winner() {
    let store = InMemoryStore::new();
    let service = std::sync::Arc::new(OrderMutationService::new(store.clone()));
    let alice = register(&store, "alice@example.com").await;
    let bob = register(&store, "bob@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 1).await;
    let order_a = service.create_order(alice).await.unwrap();
    let order_b = service.create_order(bob).await.unwrap();

    let s1 = service.clone();
    let s2 = service.clone();
    let t1 = tokio::spawn(async move { s1.add_item(alice, order_a.id, cake.id, 1).await });
    let t2 = tokio::spawn(async move { s2.add_item(bob, order_b.id, cake.id, 1).await });

    let results = [t1.await.unwrap(), t2.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::InsufficientStock { .. })))
            .count(),
        1
    );
    assert_eq!(stock_of(&store, &cake).await, 0);
}

#[tokio::test]
async fn order_shortages_reports_only_deficient_items() {
    let store = InMemoryStore::new();
    let service = OrderMutationService::new(store.clone());
    let user = register(&store, "alice@example.com").await;

    let cake = seed_product(&store, "Cake", "cakes", &["flour", "sugar", "cocoa"], 10).await;
    let tart = seed_product(&store, "Tart", "cakes", &["flour", "berries", "cream"], 10).await;
    seed_product(&store, "Brownie", "cakes", &["flour", "sugar", "nuts"], 5).await;

    let order = service.create_order(user).await.unwrap();
    service.add_item(user, order.id, cake.id, 4).await.unwrap();
    service.add_item(user, order.id, tart.id, 2).await.unwrap();

    // Drain cake's remaining stock below the ordered quantity.
    store
        .update_product(
            cake.id,
            store::ProductPatch {
                stock: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let report = service.order_shortages(user, order.id).await.unwrap();
    assert_eq!(report.len(), 1);
    let alternatives = &report[&cake.id];
    assert!(!alternatives.is_empty());
    assert!(alternatives.iter().all(|p| p.id != cake.id && p.stock > 0));
}
