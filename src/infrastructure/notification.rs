use crate::domain::order::Order;
use crate::domain::ports::NotificationSink;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Notification sink that records order confirmations in the log instead of
/// delivering them.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LoggingNotifier {
    async fn order_placed(&self, order: &Order) -> Result<()> {
        info!(
            order_id = %order.id,
            email = %order.customer.email,
            total_gross = %order.total_gross,
            "order confirmation queued"
        );
        Ok(())
    }
}
