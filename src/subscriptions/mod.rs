pub mod api;
pub mod models;
pub mod payments;
pub mod scheduler;
pub mod service;

pub use models::{BillingCycle, NewBundle, SubscriptionBundle, Tier};
pub use payments::{PaymentProcessor, SimulatedPaymentProcessor};
pub use scheduler::{spawn as spawn_renewal_scheduler, SweepHandle};
pub use service::SubscriptionService;
