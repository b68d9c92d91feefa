use bazaar_core::models::{NewProduct, NewUserRecord, Product, User};
use bazaar_core::{CrudStore, UserDirectory};
use bazaar_db::Database;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Spins up a PostgreSQL container, connects and runs the migrations.
///
/// The `ContainerAsync` must be kept in scope for the test duration;
/// dropping it stops the container.
pub async fn setup_test_db() -> (Database, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "bazaar_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let connection_string = format!("postgresql://postgres:postgres@{host}:{port}/bazaar_test");

    // Retry connection until container is fully ready
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!("Failed to connect to database after {MAX_RETRIES} retries: {e}");
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    let db = Database::from_pool(pool);
    db.migrate().await.expect("Failed to run migrations");
    (db, container)
}

pub fn new_product(sku: &str, cents: i64) -> NewProduct {
    NewProduct {
        name: format!("Product {sku}"),
        sku: sku.to_string(),
        description: None,
        price: Decimal::new(cents, 2),
        category_id: None,
        label_id: None,
        active: true,
    }
}

pub async fn seed_product(db: &Database, sku: &str, cents: i64) -> Product {
    db.products()
        .insert(&new_product(sku, cents))
        .await
        .expect("Failed to insert product")
}

pub async fn seed_user(db: &Database, email: &str) -> User {
    let record = NewUserRecord {
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        full_name: "Test Shopper".to_string(),
        phone: None,
        active: true,
    };
    db.users()
        .create_with_role(&record, "USER")
        .await
        .expect("Failed to insert user")
}
