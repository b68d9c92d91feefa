use bazaar_core::models::{
    Category, CategoryPatch, Inventory, InventoryPatch, Label, LabelPatch, NewCategory,
    NewInventory, NewLabel, NewProduct, NewProductImage, NewProductUnit, NewUnit, Product,
    ProductImage, ProductImagePatch, ProductPatch, ProductUnit, ProductUnitPatch, Unit, UnitPatch,
};
use bazaar_core::{AppError, CrudStore, Page, PageRequest};

use crate::support::{self, map_db_error, repository};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

repository!(
    /// Category persistence; categories form a tree through `parent_id`.
    CategoryRepository => "categories"
);

impl CategoryRepository {
    /// Every category, for building the tree.
    pub async fn all(&self) -> Result<Vec<Category>, AppError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }
}

impl CrudStore for CategoryRepository {
    type Entity = Category;
    type Create = NewCategory;
    type Update = CategoryPatch;

    const RESOURCE: &'static str = "category";

    async fn list(&self, page: PageRequest) -> Result<Page<Category>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Category>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewCategory) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, parent_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &CategoryPatch) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                parent_id = COALESCE($4, parent_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.parent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Category>, AppError> {
        support::search_page(&self.pool, Self::TABLE, &["name", "description"], query, page).await
    }

    async fn find_conflict(&self, input: &NewCategory) -> Result<Option<String>, AppError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE name = $1)")
                .bind(&input.name)
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_error)?;
        Ok(taken.then(|| format!("category {} already exists", input.name)))
    }

    fn validate_update(id: i64, patch: &CategoryPatch) -> Result<(), AppError> {
        if patch.parent_id == Some(id) {
            return Err(AppError::invalid("parent_id", "a category cannot be its own parent"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

repository!(LabelRepository => "labels");

impl CrudStore for LabelRepository {
    type Entity = Label;
    type Create = NewLabel;
    type Update = LabelPatch;

    const RESOURCE: &'static str = "label";

    async fn list(&self, page: PageRequest) -> Result<Page<Label>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Label>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewLabel) -> Result<Label, AppError> {
        sqlx::query_as::<_, Label>(
            "INSERT INTO labels (name, color) VALUES ($1, $2) RETURNING *",
        )
        .bind(&input.name)
        .bind(&input.color)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &LabelPatch) -> Result<Option<Label>, AppError> {
        sqlx::query_as::<_, Label>(
            r#"
            UPDATE labels
            SET name = COALESCE($2, name),
                color = COALESCE($3, color),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.color)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewLabel) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM labels WHERE name = $1)")
            .bind(&input.name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(taken.then(|| format!("label {} already exists", input.name)))
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

repository!(UnitRepository => "units");

impl CrudStore for UnitRepository {
    type Entity = Unit;
    type Create = NewUnit;
    type Update = UnitPatch;

    const RESOURCE: &'static str = "unit";

    async fn list(&self, page: PageRequest) -> Result<Page<Unit>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Unit>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewUnit) -> Result<Unit, AppError> {
        sqlx::query_as::<_, Unit>("INSERT INTO units (name, symbol) VALUES ($1, $2) RETURNING *")
            .bind(&input.name)
            .bind(&input.symbol)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &UnitPatch) -> Result<Option<Unit>, AppError> {
        sqlx::query_as::<_, Unit>(
            r#"
            UPDATE units
            SET name = COALESCE($2, name),
                symbol = COALESCE($3, symbol),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewUnit) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM units WHERE name = $1)")
            .bind(&input.name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(taken.then(|| format!("unit {} already exists", input.name)))
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

repository!(ProductRepository => "products");

impl CrudStore for ProductRepository {
    type Entity = Product;
    type Create = NewProduct;
    type Update = ProductPatch;

    const RESOURCE: &'static str = "product";

    async fn list(&self, page: PageRequest) -> Result<Page<Product>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Product>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewProduct) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, sku, description, price, category_id, label_id, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.sku)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.category_id)
        .bind(input.label_id)
        .bind(input.active)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &ProductPatch) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                sku = COALESCE($3, sku),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                category_id = COALESCE($6, category_id),
                label_id = COALESCE($7, label_id),
                active = COALESCE($8, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.sku)
        .bind(&patch.description)
        .bind(patch.price)
        .bind(patch.category_id)
        .bind(patch.label_id)
        .bind(patch.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Product>, AppError> {
        support::search_page(&self.pool, Self::TABLE, &["name", "sku"], query, page).await
    }

    async fn find_conflict(&self, input: &NewProduct) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
            .bind(&input.sku)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(taken.then(|| format!("product sku {} already exists", input.sku)))
    }
}

// ---------------------------------------------------------------------------
// ProductImage
// ---------------------------------------------------------------------------

repository!(ProductImageRepository => "product_images");

impl ProductImageRepository {
    /// Position following the product's last image.
    pub async fn next_position(&self, product_id: i64) -> Result<i32, AppError> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM product_images WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    /// Insert several images in one transaction; either all rows land or none.
    pub async fn insert_all(
        &self,
        inputs: &[NewProductImage],
    ) -> Result<Vec<ProductImage>, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut images = Vec::with_capacity(inputs.len());
        for input in inputs {
            let image = sqlx::query_as::<_, ProductImage>(
                r#"
                INSERT INTO product_images (product_id, url, alt_text, position)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(input.product_id)
            .bind(&input.url)
            .bind(&input.alt_text)
            .bind(input.position)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
            images.push(image);
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(images)
    }

    pub async fn for_product(&self, product_id: i64) -> Result<Vec<ProductImage>, AppError> {
        sqlx::query_as::<_, ProductImage>(
            "SELECT * FROM product_images WHERE product_id = $1 ORDER BY position, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

impl CrudStore for ProductImageRepository {
    type Entity = ProductImage;
    type Create = NewProductImage;
    type Update = ProductImagePatch;

    const RESOURCE: &'static str = "product image";

    async fn list(&self, page: PageRequest) -> Result<Page<ProductImage>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<ProductImage>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewProductImage) -> Result<ProductImage, AppError> {
        sqlx::query_as::<_, ProductImage>(
            r#"
            INSERT INTO product_images (product_id, url, alt_text, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.product_id)
        .bind(&input.url)
        .bind(&input.alt_text)
        .bind(input.position)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(
        &self,
        id: i64,
        patch: &ProductImagePatch,
    ) -> Result<Option<ProductImage>, AppError> {
        sqlx::query_as::<_, ProductImage>(
            r#"
            UPDATE product_images
            SET url = COALESCE($2, url),
                alt_text = COALESCE($3, alt_text),
                position = COALESCE($4, position),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.url)
        .bind(&patch.alt_text)
        .bind(patch.position)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }
}

// ---------------------------------------------------------------------------
// ProductUnit
// ---------------------------------------------------------------------------

repository!(ProductUnitRepository => "product_units");

impl CrudStore for ProductUnitRepository {
    type Entity = ProductUnit;
    type Create = NewProductUnit;
    type Update = ProductUnitPatch;

    const RESOURCE: &'static str = "product unit";

    async fn list(&self, page: PageRequest) -> Result<Page<ProductUnit>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<ProductUnit>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewProductUnit) -> Result<ProductUnit, AppError> {
        sqlx::query_as::<_, ProductUnit>(
            r#"
            INSERT INTO product_units (product_id, unit_id, quantity_per_unit, price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.product_id)
        .bind(input.unit_id)
        .bind(input.quantity_per_unit)
        .bind(input.price)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(
        &self,
        id: i64,
        patch: &ProductUnitPatch,
    ) -> Result<Option<ProductUnit>, AppError> {
        sqlx::query_as::<_, ProductUnit>(
            r#"
            UPDATE product_units
            SET quantity_per_unit = COALESCE($2, quantity_per_unit),
                price = COALESCE($3, price),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.quantity_per_unit)
        .bind(patch.price)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewProductUnit) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM product_units WHERE product_id = $1 AND unit_id = $2)",
        )
        .bind(input.product_id)
        .bind(input.unit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| {
            format!(
                "product {} already has unit {}",
                input.product_id, input.unit_id
            )
        }))
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

repository!(InventoryRepository => "inventories");

impl CrudStore for InventoryRepository {
    type Entity = Inventory;
    type Create = NewInventory;
    type Update = InventoryPatch;

    const RESOURCE: &'static str = "inventory";

    async fn list(&self, page: PageRequest) -> Result<Page<Inventory>, AppError> {
        support::fetch_page(&self.pool, Self::TABLE, page).await
    }

    async fn get(&self, id: i64) -> Result<Option<Inventory>, AppError> {
        support::fetch_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn insert(&self, input: &NewInventory) -> Result<Inventory, AppError> {
        sqlx::query_as::<_, Inventory>(
            r#"
            INSERT INTO inventories (product_id, location, quantity)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(input.product_id)
        .bind(&input.location)
        .bind(input.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn update(&self, id: i64, patch: &InventoryPatch) -> Result<Option<Inventory>, AppError> {
        sqlx::query_as::<_, Inventory>(
            r#"
            UPDATE inventories
            SET location = COALESCE($2, location),
                quantity = COALESCE($3, quantity),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.location)
        .bind(patch.quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        support::delete_by_id(&self.pool, Self::TABLE, id).await
    }

    async fn find_conflict(&self, input: &NewInventory) -> Result<Option<String>, AppError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM inventories WHERE product_id = $1 AND location = $2)",
        )
        .bind(input.product_id)
        .bind(&input.location)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(taken.then(|| {
            format!(
                "product {} already has stock at {}",
                input.product_id, input.location
            )
        }))
    }
}
