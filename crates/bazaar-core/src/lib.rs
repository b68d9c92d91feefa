pub mod auth;
pub mod cart;
pub mod crud;
pub mod error;
pub mod models;
pub mod page;
pub mod services;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub mod testutil;

pub use auth::{AuthService, Claims, CurrentUser, JwtKeys, Session};
pub use crud::CrudService;
pub use error::AppError;
pub use page::{Page, PageRequest};
pub use traits::{
    CartStore, CouponCodes, CrudStore, HasId, OrderLines, OrderTransitions, UserDirectory,
    UserScoped,
};
pub use validation::Validate;
