//! Alert sinks

use std::sync::Arc;
use tracing::{info, warn};

use arb_core::{DeliveryResult, Opportunity};
use crate::format::alert_message;

/// Outbound channel for formatted alerts
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, message: &str) -> DeliveryResult<()>;
}

/// Writes alerts to the log; used when no push channel is configured
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, message: &str) -> DeliveryResult<()> {
        info!("Alert:\n{}", message);
        Ok(())
    }
}

/// Formats opportunities and pushes them through a sink
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn AlertSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub async fn emit(&self, opp: &Opportunity) -> DeliveryResult<()> {
        let message = alert_message(opp);

        match self.sink.deliver(&message).await {
            Ok(()) => {
                info!("Alert for {} sent via {}", opp.symbol, self.sink.name());
                Ok(())
            }
            Err(e) => {
                warn!("Alert for {} via {} failed: {}", opp.symbol, self.sink.name(), e);
                Err(e)
            }
        }
    }
}
