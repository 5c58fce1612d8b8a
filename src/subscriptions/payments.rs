use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// key: payment-processor -> provider integration seam
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Attempts a charge; `false` means the payment was declined.
    async fn charge(&self) -> bool;
}

/// Stub processor approving a fixed fraction of charges.
#[derive(Debug)]
pub struct SimulatedPaymentProcessor {
    success_rate: f64,
}

impl SimulatedPaymentProcessor {
    pub fn new(success_rate: f64) -> Self {
        Self { success_rate }
    }
}

impl Default for SimulatedPaymentProcessor {
    fn default() -> Self {
        Self::new(0.9)
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedPaymentProcessor {
    async fn charge(&self) -> bool {
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        rand::thread_rng().gen_bool(self.success_rate)
    }
}
