use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct Completion {
    pub answer: String,
    pub tokens: i32,
}

/// key: answer-generator -> model integration seam
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> AppResult<Completion>;
}

const OPENERS: [&str; 5] = [
    "I understand your question. Here's a comprehensive answer based on the latest information available.",
    "That's an interesting question! Let me provide you with a detailed response.",
    "Based on my knowledge, here's what I can tell you about this topic.",
    "Great question! I'll break this down for you in a clear and helpful way.",
    "I'd be happy to help you with that. Here's my analysis of your question.",
];

/// Stub standing in for a real model backend. Random latency and canned text.
#[derive(Debug, Default)]
pub struct SimulatedAnswerGenerator;

#[async_trait]
impl AnswerGenerator for SimulatedAnswerGenerator {
    async fn generate(&self, question: &str) -> AppResult<Completion> {
        let (delay_ms, opener, tokens) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(500..=2000),
                OPENERS[rng.gen_range(0..OPENERS.len())],
                rng.gen_range(50..150),
            )
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let excerpt: String = question.chars().take(50).collect();
        let ellipsis = if question.chars().count() > 50 { "..." } else { "" };
        let answer = format!(
            "{opener} Regarding \"{excerpt}{ellipsis}\", this is a simulated response; \
             a production deployment would call out to a real model here."
        );

        Ok(Completion { answer, tokens })
    }
}
