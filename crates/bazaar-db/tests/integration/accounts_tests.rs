use bazaar_core::models::{NewAddress, NewUserRecord, NewUserWishlist};
use bazaar_core::{AppError, CrudService, CrudStore, PageRequest, UserDirectory, UserScoped};

use crate::integration::common::{seed_product, seed_user, setup_test_db};

fn address_for(user_id: i64, line1: &str) -> NewAddress {
    NewAddress {
        user_id,
        line1: line1.to_string(),
        line2: None,
        city: "Lyon".into(),
        region: None,
        postal_code: "69001".into(),
        country: "FR".into(),
        is_default: false,
    }
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn create_with_role_grants_the_role() {
    let (db, _container) = setup_test_db().await;
    let user = seed_user(&db, "ada@example.com").await;

    let roles = db.users().role_names(user.id).await.unwrap();
    assert_eq!(roles, vec!["USER".to_string()]);

    db.user_roles().grant(user.id, "ADMIN").await.unwrap();
    db.user_roles().grant(user.id, "ADMIN").await.unwrap();
    let roles = db.users().role_names(user.id).await.unwrap();
    assert_eq!(roles, vec!["ADMIN".to_string(), "USER".to_string()]);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn create_with_unknown_role_rolls_back() {
    let (db, _container) = setup_test_db().await;
    let record = NewUserRecord {
        email: "ghost@example.com".into(),
        password_hash: "x".into(),
        full_name: "Ghost".into(),
        phone: None,
        active: true,
    };

    let err = db
        .users()
        .create_with_role(&record, "WIZARD")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConfigError(_)));
    assert!(db.users().find_by_email("ghost@example.com").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn addresses_are_scoped_to_their_owner() {
    let (db, _container) = setup_test_db().await;
    let ada = seed_user(&db, "ada@example.com").await;
    let bob = seed_user(&db, "bob@example.com").await;

    db.addresses().insert(&address_for(ada.id, "1 Rue A")).await.unwrap();
    db.addresses().insert(&address_for(ada.id, "2 Rue A")).await.unwrap();
    db.addresses().insert(&address_for(bob.id, "1 Rue B")).await.unwrap();

    let page = db
        .addresses()
        .list_for_user(ada.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|a| a.user_id == ada.id));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn wishlist_rejects_duplicates_and_removes_by_product() {
    let (db, _container) = setup_test_db().await;
    let user = seed_user(&db, "ada@example.com").await;
    let product = seed_product(&db, "SKU-1", 100).await;
    let service = CrudService::new(db.wishlists());

    let entry = NewUserWishlist {
        user_id: user.id,
        product_id: product.id,
    };
    service.create(entry.clone()).await.unwrap();
    let err = service.create(entry).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert!(db.wishlists().remove(user.id, product.id).await.unwrap());
    assert!(!db.wishlists().remove(user.id, product.id).await.unwrap());
}
