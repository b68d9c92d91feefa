use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bazaar API",
        version = "0.1.0",
        description = "Storefront and back-office API: catalog, accounts, carts, orders and content."
    ),
    paths(
        crate::routes::public::register,
        crate::routes::public::login,
        crate::routes::account::me,
        crate::routes::account::view_cart,
        crate::routes::account::add_item,
        crate::routes::account::set_quantity,
        crate::routes::account::remove_item,
        crate::routes::account::apply_coupon,
        crate::routes::account::clear_coupon,
        crate::routes::account::checkout,
        crate::routes::account::list_orders,
        crate::routes::account::get_order,
        crate::routes::account::cancel_order,
        crate::routes::uploads::upload_product_images,
        crate::routes::system::health,
    ),
    components(schemas(
        bazaar_core::models::NewUser,
        bazaar_core::models::ProductImage,
        bazaar_core::models::Order,
        bazaar_core::models::OrderDetail,
        bazaar_core::cart::CartView,
        bazaar_core::cart::CheckoutRequest,
        bazaar_core::cart::OrderView,
        crate::dto::UserModel,
        crate::dto::LoginRequest,
        crate::dto::LoginResponse,
        crate::dto::AddItemRequest,
        crate::dto::SetQuantityRequest,
        crate::dto::ApplyCouponRequest,
        crate::dto::BatchDeleteRequest,
        crate::dto::BatchDeleteResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "account", description = "The signed-in user"),
        (name = "cart", description = "Shopping cart and checkout"),
        (name = "orders", description = "The signed-in user's orders"),
        (name = "catalog", description = "Product administration"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the JWT bearer security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("HS512 token from /api/v1/public/auth/login."))
                        .build(),
                ),
            );
        }
    }
}
