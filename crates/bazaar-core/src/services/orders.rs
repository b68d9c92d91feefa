use crate::cart::OrderView;
use crate::error::AppError;
use crate::models::{Order, OrderPatch, OrderStatus};
use crate::page::{Page, PageRequest};
use crate::traits::{OrderLines, OrderTransitions, UserScoped};

/// A customer's view of their own orders.
#[derive(Clone)]
pub struct OrderService<O, L> {
    orders: O,
    lines: L,
}

impl<O, L> OrderService<O, L>
where
    O: UserScoped<Entity = Order, Update = OrderPatch> + OrderTransitions,
    L: OrderLines,
{
    pub fn new(orders: O, lines: L) -> Self {
        Self { orders, lines }
    }

    pub async fn list_own(&self, user_id: i64, page: PageRequest) -> Result<Page<Order>, AppError> {
        self.orders.list_for_user(user_id, page.normalized()).await
    }

    /// Orders belonging to someone else are reported as missing.
    pub async fn get_own(&self, user_id: i64, order_id: i64) -> Result<OrderView, AppError> {
        let order = self.owned(user_id, order_id).await?;
        self.view_of(order).await
    }

    pub async fn cancel_own(&self, user_id: i64, order_id: i64) -> Result<OrderView, AppError> {
        let order = self.owned(user_id, order_id).await?;
        if !order.status.is_cancellable() {
            return Err(AppError::ValidationError(format!(
                "order {order_id} is {} and can no longer be cancelled",
                order.status
            )));
        }

        let order = self
            .orders
            .transition(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "order {order_id} changed status before it could be cancelled"
                ))
            })?;

        tracing::info!(user_id, order_id, "order cancelled");
        self.view_of(order).await
    }

    async fn owned(&self, user_id: i64, order_id: i64) -> Result<Order, AppError> {
        self.orders
            .get(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| AppError::not_found("order", order_id))
    }

    async fn view_of(&self, order: Order) -> Result<OrderView, AppError> {
        let details = self.lines.details_for_order(order.id).await?;
        Ok(OrderView { order, details })
    }
}
