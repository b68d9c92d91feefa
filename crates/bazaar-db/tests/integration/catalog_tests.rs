use bazaar_core::models::{CategoryPatch, NewCategory, NewProductImage, ProductPatch};
use bazaar_core::{AppError, CrudService, CrudStore, PageRequest};
use rust_decimal::Decimal;

use crate::integration::common::{new_product, seed_product, setup_test_db};

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn product_crud_round_trip() {
    let (db, _container) = setup_test_db().await;
    let service = CrudService::new(db.products());

    let created = service.create(new_product("SKU-1", 1999)).await.unwrap();
    assert_eq!(created.price, Decimal::new(1999, 2));
    assert!(created.active);

    let patched = service
        .update(
            created.id,
            ProductPatch {
                price: Some(Decimal::new(2499, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.price, Decimal::new(2499, 2));
    assert_eq!(patched.name, created.name);
    assert!(patched.updated_at >= created.updated_at);

    assert!(service.delete(created.id).await.unwrap());
    let err = service.get(created.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn duplicate_sku_is_conflict() {
    let (db, _container) = setup_test_db().await;
    let service = CrudService::new(db.products());

    service.create(new_product("SKU-1", 100)).await.unwrap();
    let err = service.create(new_product("SKU-1", 200)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn list_pages_and_counts() {
    let (db, _container) = setup_test_db().await;
    for i in 0..5 {
        seed_product(&db, &format!("SKU-{i}"), 100 + i).await;
    }

    let page = db.products().list(PageRequest::new(1, 2)).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items[0].sku, "SKU-2");
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn search_matches_name_or_sku_case_insensitively() {
    let (db, _container) = setup_test_db().await;
    seed_product(&db, "MUG-RED", 900).await;
    seed_product(&db, "MUG-BLUE", 900).await;
    seed_product(&db, "TEE-RED", 1500).await;

    let page = db
        .products()
        .search("mug", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let page = db
        .products()
        .search("100%", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn category_cannot_be_its_own_parent() {
    let (db, _container) = setup_test_db().await;
    let service = CrudService::new(db.categories());

    let category = service
        .create(NewCategory {
            name: "Kitchen".into(),
            description: None,
            parent_id: None,
        })
        .await
        .unwrap();

    let err = service
        .update(
            category.id,
            CategoryPatch {
                parent_id: Some(category.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn missing_foreign_key_is_validation_error() {
    let (db, _container) = setup_test_db().await;

    let mut input = new_product("SKU-1", 100);
    input.category_id = Some(9999);
    let err = db.products().insert(&input).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
#[ignore = "requires a Docker daemon for testcontainers"]
async fn image_batch_insert_is_all_or_nothing() {
    let (db, _container) = setup_test_db().await;
    let product = seed_product(&db, "SKU-1", 100).await;

    let image = |product_id: i64, position: i32| NewProductImage {
        product_id,
        url: format!("/uploads/products/{position}.png"),
        alt_text: None,
        position,
    };

    let err = db
        .product_images()
        .insert_all(&[image(product.id, 0), image(9999, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(db.product_images().for_product(product.id).await.unwrap().is_empty());

    let saved = db
        .product_images()
        .insert_all(&[image(product.id, 0), image(product.id, 1)])
        .await
        .unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(db.product_images().for_product(product.id).await.unwrap().len(), 2);
}
