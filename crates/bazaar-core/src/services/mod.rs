//! Services with behavior beyond the uniform [`CrudService`](crate::crud::CrudService).

mod cart;
mod orders;
mod users;

pub use cart::CartService;
pub use orders::OrderService;
pub use users::UserAccounts;
