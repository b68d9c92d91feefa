use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::validation::{self, Validate};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Product category. Categories form a tree through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

impl Validate for NewCategory {
    fn validate(&self) -> Result<(), AppError> {
        validation::text("name", &self.name, 100)?;
        validation::opt_text("description", self.description.as_deref(), 2000)
    }
}

impl Validate for CategoryPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("name", self.name.as_deref(), 100)?;
        validation::opt_text("description", self.description.as_deref(), 2000)
    }
}

/// A category with its descendants, as served by the tree endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Arrange a flat category list into a forest.
///
/// Roots are categories without a parent or whose parent is not in the list.
/// Siblings keep the input order. Categories caught in a parent cycle are
/// unreachable from any root and are left out.
pub fn build_category_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let known: HashSet<i64> = categories.iter().map(|c| c.id).collect();

    let mut children: HashMap<Option<i64>, Vec<Category>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|p| known.contains(p));
        children.entry(parent).or_default().push(category);
    }

    fn attach(
        parent: Option<i64>,
        children: &mut HashMap<Option<i64>, Vec<Category>>,
    ) -> Vec<CategoryNode> {
        let Some(level) = children.remove(&parent) else {
            return Vec::new();
        };
        level
            .into_iter()
            .map(|category| {
                let id = category.id;
                CategoryNode {
                    category,
                    children: attach(Some(id), children),
                }
            })
            .collect()
    }

    attach(None, &mut children)
}

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// Merchandising label such as "new" or "sale".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewLabel {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct LabelPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Validate for NewLabel {
    fn validate(&self) -> Result<(), AppError> {
        validation::text("name", &self.name, 50)?;
        validation::opt_text("color", self.color.as_deref(), 20)
    }
}

impl Validate for LabelPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("name", self.name.as_deref(), 50)?;
        validation::opt_text("color", self.color.as_deref(), 20)
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// Unit of sale, e.g. "kilogram" / "kg".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub symbol: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewUnit {
    pub name: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub symbol: Option<String>,
}

impl Validate for NewUnit {
    fn validate(&self) -> Result<(), AppError> {
        validation::text("name", &self.name, 50)?;
        validation::opt_text("symbol", self.symbol.as_deref(), 10)
    }
}

impl Validate for UnitPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("name", self.name.as_deref(), 50)?;
        validation::opt_text("symbol", self.symbol.as_deref(), 10)
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Stock keeping unit, unique across the catalog.
    pub sku: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub label_id: Option<i64>,
    /// Inactive products stay visible to admins but cannot be added to carts.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub label_id: Option<i64>,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub category_id: Option<i64>,
    pub label_id: Option<i64>,
    pub active: Option<bool>,
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), AppError> {
        validation::text("name", &self.name, 200)?;
        validation::text("sku", &self.sku, 64)?;
        validation::opt_text("description", self.description.as_deref(), 10_000)?;
        validation::non_negative("price", self.price)
    }
}

impl Validate for ProductPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("name", self.name.as_deref(), 200)?;
        validation::opt_text("sku", self.sku.as_deref(), 64)?;
        validation::opt_text("description", self.description.as_deref(), 10_000)?;
        if let Some(price) = self.price {
            validation::non_negative("price", price)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProductImage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
    pub alt_text: Option<String>,
    /// Display order, ascending.
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewProductImage {
    pub product_id: i64,
    pub url: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ProductImagePatch {
    pub url: Option<String>,
    pub alt_text: Option<String>,
    pub position: Option<i32>,
}

impl Validate for NewProductImage {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("product_id", self.product_id)?;
        validation::text("url", &self.url, 500)?;
        validation::opt_text("alt_text", self.alt_text.as_deref(), 200)?;
        validation::in_range("position", i64::from(self.position), 0, 10_000)
    }
}

impl Validate for ProductImagePatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("url", self.url.as_deref(), 500)?;
        validation::opt_text("alt_text", self.alt_text.as_deref(), 200)?;
        if let Some(position) = self.position {
            validation::in_range("position", i64::from(position), 0, 10_000)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProductUnit
// ---------------------------------------------------------------------------

/// Price of a product when sold in a given unit (a pack of 6, a kilogram...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductUnit {
    pub id: i64,
    pub product_id: i64,
    pub unit_id: i64,
    pub quantity_per_unit: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewProductUnit {
    pub product_id: i64,
    pub unit_id: i64,
    pub quantity_per_unit: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct ProductUnitPatch {
    pub quantity_per_unit: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
}

impl Validate for NewProductUnit {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("product_id", self.product_id)?;
        validation::positive("unit_id", self.unit_id)?;
        validation::positive("quantity_per_unit", i64::from(self.quantity_per_unit))?;
        validation::non_negative("price", self.price)
    }
}

impl Validate for ProductUnitPatch {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(q) = self.quantity_per_unit {
            validation::positive("quantity_per_unit", i64::from(q))?;
        }
        if let Some(price) = self.price {
            validation::non_negative("price", price)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Stock level of a product at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Inventory {
    pub id: i64,
    pub product_id: i64,
    pub location: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewInventory {
    pub product_id: i64,
    #[serde(default = "default_location")]
    pub location: String,
    pub quantity: i32,
}

fn default_location() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct InventoryPatch {
    pub location: Option<String>,
    pub quantity: Option<i32>,
}

impl Validate for NewInventory {
    fn validate(&self) -> Result<(), AppError> {
        validation::positive("product_id", self.product_id)?;
        validation::text("location", &self.location, 100)?;
        validation::in_range("quantity", i64::from(self.quantity), 0, i64::from(i32::MAX))
    }
}

impl Validate for InventoryPatch {
    fn validate(&self) -> Result<(), AppError> {
        validation::opt_text("location", self.location.as_deref(), 100)?;
        if let Some(q) = self.quantity {
            validation::in_range("quantity", i64::from(q), 0, i64::from(i32::MAX))?;
        }
        Ok(())
    }
}
