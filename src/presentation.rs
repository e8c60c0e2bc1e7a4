//! Presentation adapter
//!
//! Consumes the finished itinerary read-only and produces user-facing
//! narration. Narration never feeds back into planning: a failure here
//! degrades to the plain rendering and leaves the itinerary untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Itinerary, StopKind};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::prompts;

/// External narration capability over a finished itinerary
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, itinerary: &Itinerary) -> Result<String, LlmError>;
}

/// LLM-backed narrator with a friendly-companion register
pub struct LlmNarrator {
    llm: Arc<dyn LlmClient>,
}

impl LlmNarrator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Narrator for LlmNarrator {
    async fn narrate(&self, itinerary: &Itinerary) -> Result<String, LlmError> {
        let stops: Vec<serde_json::Value> = itinerary
            .stops
            .iter()
            .map(|s| {
                serde_json::json!({
                    "start": s.start.format("%H:%M").to_string(),
                    "end": s.end.format("%H:%M").to_string(),
                    "label": s.label,
                    "role": s.role,
                })
            })
            .collect();

        let user = prompts::render(prompts::NARRATION_USER, &serde_json::json!({ "stops": stops }))
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        debug!(stop_count = itinerary.stops.len(), "narrate: requesting narration");
        let response = self
            .llm
            .complete(CompletionRequest {
                system_prompt: prompts::NARRATION_SYSTEM.to_string(),
                messages: vec![Message::user(user)],
                tools: vec![],
                force_tool: None,
                max_tokens: 2048,
            })
            .await?;

        response
            .content
            .ok_or_else(|| LlmError::InvalidResponse("empty narration response".to_string()))
    }
}

/// Plain-text rendering of an itinerary, one line per stop
///
/// Always available; the CLI prints this whether or not narration runs.
pub fn render_plain(itinerary: &Itinerary) -> String {
    itinerary
        .stops
        .iter()
        .map(|s| {
            let mut line = format!("{} - {}  {}", s.start.format("%H:%M"), s.end.format("%H:%M"), s.label);
            if let Some(role) = s.role {
                line.push_str(&format!(" ({})", role));
            }
            if s.kind == StopKind::Commitment && s.coordinate.is_none() {
                line.push_str(" [location unresolved]");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, ItineraryStop, MealRole};
    use crate::llm::client::mock::MockLlmClient;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn sample_itinerary() -> Itinerary {
        Itinerary::new(vec![
            ItineraryStop {
                kind: StopKind::Commitment,
                start: t(9, 0),
                end: t(10, 0),
                coordinate: None,
                label: "Standup".to_string(),
                source_id: "c-1".to_string(),
                role: None,
            },
            ItineraryStop {
                kind: StopKind::Meal,
                start: t(12, 10),
                end: t(13, 25),
                coordinate: Some(Coordinate::new(52.2, 0.12)),
                label: "The Eagle".to_string(),
                source_id: "osm-1".to_string(),
                role: Some(MealRole::Lunch),
            },
        ])
    }

    #[test]
    fn test_render_plain() {
        let text = render_plain(&sample_itinerary());
        assert!(text.contains("09:00 - 10:00  Standup [location unresolved]"));
        assert!(text.contains("12:10 - 13:25  The Eagle (lunch)"));
    }

    #[tokio::test]
    async fn test_llm_narrator_returns_content() {
        let narrator = LlmNarrator::new(Arc::new(MockLlmClient::with_text("What a lovely day ahead!")));
        let narration = narrator.narrate(&sample_itinerary()).await.unwrap();
        assert_eq!(narration, "What a lovely day ahead!");
    }

    #[tokio::test]
    async fn test_llm_narrator_empty_response_is_error() {
        use crate::llm::{CompletionResponse, StopReason, TokenUsage};

        let narrator = LlmNarrator::new(Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: None,
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }])));

        assert!(narrator.narrate(&sample_itinerary()).await.is_err());
    }
}
