//! Order API port
//!
//! Defines the REST calls against the order, payment and course services.

use crate::ports::chat_api::ApiError;
use async_trait::async_trait;
use horo_domain::{CourseId, OrderId, OrderSummary, PaymentId, Review, RoomId, UserId};

/// Order, payment and review operations.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// The room's order, or `None` when the room has none yet.
    async fn fetch_by_room(&self, room_id: &RoomId) -> Result<Option<OrderSummary>, ApiError>;

    /// Create an order for `course_id` in `room_id`.
    async fn create(&self, course_id: &CourseId, room_id: &RoomId)
    -> Result<OrderSummary, ApiError>;

    /// Look up the payment bound to an order, if any.
    async fn find_payment_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentId>, ApiError>;

    /// Submit payment completion.
    async fn complete_payment(&self, payment_id: &PaymentId) -> Result<(), ApiError>;

    async fn mark_customer_completed(&self, order_id: &OrderId) -> Result<(), ApiError>;

    async fn mark_prophet_completed(&self, order_id: &OrderId) -> Result<(), ApiError>;

    /// Post a review of `course_id` on behalf of `customer_id`.
    async fn submit_review(
        &self,
        course_id: &CourseId,
        customer_id: &UserId,
        review: &Review,
    ) -> Result<(), ApiError>;
}
