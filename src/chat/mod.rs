pub mod api;
pub mod generator;
pub mod models;
pub mod service;

pub use generator::{AnswerGenerator, Completion, SimulatedAnswerGenerator};
pub use models::{Chat, ChatOutcome, NewChat, RemainingQuota};
pub use service::{ChatService, FREE_TIER_MONTHLY_LIMIT};
