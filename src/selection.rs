//! Selection stage
//!
//! Delegates the judgment call - which venues fit which meals - to the
//! decision capability, then refuses to trust the answer until it passes
//! schema validation against the current context.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::calendar::render_line;
use crate::config::SelectionConfig;
use crate::domain::{MealRole, PlanningContext, Selection};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, ToolDefinition};
use crate::prompts;

/// Errors from the selection stage
///
/// Validation-class errors are worth one re-attempt with the original
/// input; transport errors are not.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Prompt rendering failed: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Malformed selection response: {0}")]
    Malformed(String),

    #[error("Selection references unknown candidate '{id}'")]
    UnknownCandidate { id: String },

    #[error("Candidate '{id}' selected more than once")]
    DuplicateCandidate { id: String },

    #[error("Selection for unrequested role '{role}'")]
    UnexpectedRole { role: MealRole },

    #[error("No selection for requested role '{role}'")]
    MissingRole { role: MealRole },

    #[error("Too many selections for '{role}': {count} (max {max})")]
    TooManyForRole { role: MealRole, count: usize, max: usize },
}

impl SelectionError {
    /// Whether a fresh attempt with the same input could fix this
    pub fn is_validation(&self) -> bool {
        !matches!(self, SelectionError::Llm(_) | SelectionError::Template(_))
    }
}

/// Raw selection list as the model submits it
#[derive(Debug, Deserialize)]
struct SelectionOutput {
    selections: Vec<SelectionItem>,
}

#[derive(Debug, Deserialize)]
struct SelectionItem {
    candidate_id: String,
    role: MealRole,
    rank: u32,
    #[serde(default)]
    reason: Option<String>,
}

/// The selection stage: one bounded call to the decision capability
pub struct SelectionStage {
    llm: Arc<dyn LlmClient>,
    config: SelectionConfig,
}

impl SelectionStage {
    pub fn new(llm: Arc<dyn LlmClient>, config: SelectionConfig) -> Self {
        Self { llm, config }
    }

    /// Ask the decision capability for selections and validate the answer
    pub async fn select(&self, ctx: &PlanningContext) -> Result<Vec<Selection>, SelectionError> {
        let request = self.build_request(ctx)?;
        info!(
            candidates = ctx.candidates.len(),
            roles = self.config.roles.len(),
            "select: requesting selections"
        );

        let response = self.llm.complete(request).await?;
        let output = self.parse_response(response)?;
        self.validate(ctx, output)
    }

    /// Build the completion request from the context slice
    fn build_request(&self, ctx: &PlanningContext) -> Result<CompletionRequest, SelectionError> {
        let schedule: Vec<String> = ctx.commitments.iter().map(render_line).collect();
        let candidates: Vec<serde_json::Value> = ctx
            .candidates
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "name": c.name,
                    "category": c.category,
                    "score": format!("{:.2}", c.score),
                    "price": c.price,
                })
            })
            .collect();

        let data = serde_json::json!({
            "preferences": self.config.preferences,
            "per_role": self.config.per_role,
            "roles": self.config.roles,
            "schedule": schedule,
            "candidates": candidates,
        });

        let user = prompts::render(prompts::SELECTION_USER, &data)?;

        Ok(CompletionRequest {
            system_prompt: prompts::SELECTION_SYSTEM.to_string(),
            messages: vec![Message::user(user)],
            tools: vec![Self::submit_selection_tool()],
            force_tool: Some("submit_selection".to_string()),
            max_tokens: 4096,
        })
    }

    /// Tool schema for the structured selection answer
    fn submit_selection_tool() -> ToolDefinition {
        ToolDefinition::new(
            "submit_selection",
            "Submit the chosen venues. Call this once with every selection.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "selections": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "candidate_id": {
                                    "type": "string",
                                    "description": "Id of the chosen candidate, exactly as listed"
                                },
                                "role": {
                                    "type": "string",
                                    "enum": ["breakfast", "lunch", "dinner"],
                                    "description": "Meal slot this venue is chosen for"
                                },
                                "rank": {
                                    "type": "integer",
                                    "description": "Preference order within the role, 0 is best"
                                },
                                "reason": {
                                    "type": "string",
                                    "description": "One-line justification"
                                }
                            },
                            "required": ["candidate_id", "role", "rank"]
                        }
                    }
                },
                "required": ["selections"]
            }),
        )
    }

    /// Pull the structured output from the response
    fn parse_response(&self, response: CompletionResponse) -> Result<SelectionOutput, SelectionError> {
        if let Some(tool_call) = response.tool_call("submit_selection") {
            debug!("parse_response: got submit_selection tool call");
            return serde_json::from_value(tool_call.input.clone())
                .map_err(|e| SelectionError::Malformed(e.to_string()));
        }

        // Fallback: some responses put the JSON in the text content
        if let Some(content) = &response.content {
            if let Ok(output) = serde_json::from_str::<SelectionOutput>(content) {
                debug!("parse_response: parsed selections from text content");
                return Ok(output);
            }
        }

        Err(SelectionError::Malformed(
            "no submit_selection tool call in response".to_string(),
        ))
    }

    /// Validate the raw output against the context and config bounds
    fn validate(&self, ctx: &PlanningContext, output: SelectionOutput) -> Result<Vec<Selection>, SelectionError> {
        let mut seen: HashSet<&str> = HashSet::new();

        for item in &output.selections {
            if ctx.candidate(&item.candidate_id).is_none() {
                return Err(SelectionError::UnknownCandidate {
                    id: item.candidate_id.clone(),
                });
            }
            if !seen.insert(&item.candidate_id) {
                return Err(SelectionError::DuplicateCandidate {
                    id: item.candidate_id.clone(),
                });
            }
            if !self.config.roles.contains(&item.role) {
                return Err(SelectionError::UnexpectedRole { role: item.role });
            }
        }

        for role in &self.config.roles {
            let count = output.selections.iter().filter(|s| s.role == *role).count();
            if count == 0 {
                return Err(SelectionError::MissingRole { role: *role });
            }
            if count > self.config.max_per_role as usize {
                return Err(SelectionError::TooManyForRole {
                    role: *role,
                    count,
                    max: self.config.max_per_role as usize,
                });
            }
        }

        info!(count = output.selections.len(), "validate: selections accepted");
        Ok(output
            .selections
            .into_iter()
            .map(|item| Selection {
                candidate_id: item.candidate_id,
                role: item.role,
                rank: item.rank,
                reason: item.reason,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, Coordinate};
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{StopReason, TokenUsage, ToolCall};

    fn ctx_with_candidates(ids: &[&str]) -> PlanningContext {
        let mut ctx = PlanningContext::new();
        for id in ids {
            ctx.candidates.push(Candidate {
                id: id.to_string(),
                name: format!("Venue {}", id),
                coordinate: Coordinate::new(52.2, 0.12),
                category: "cafe".to_string(),
                score: 0.5,
                price: None,
            });
        }
        ctx
    }

    fn tool_response(input: serde_json::Value) -> CompletionResponse {
        CompletionResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "tc_1".to_string(),
                name: "submit_selection".to_string(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    fn stage(responses: Vec<CompletionResponse>) -> SelectionStage {
        SelectionStage::new(Arc::new(MockLlmClient::new(responses)), SelectionConfig::default())
    }

    #[tokio::test]
    async fn test_select_happy_path() {
        let input = serde_json::json!({
            "selections": [
                { "candidate_id": "osm-1", "role": "breakfast", "rank": 0 },
                { "candidate_id": "osm-2", "role": "lunch", "rank": 0, "reason": "close by" },
                { "candidate_id": "osm-3", "role": "dinner", "rank": 0 },
            ]
        });
        let stage = stage(vec![tool_response(input)]);
        let ctx = ctx_with_candidates(&["osm-1", "osm-2", "osm-3"]);

        let selections = stage.select(&ctx).await.unwrap();
        assert_eq!(selections.len(), 3);
        assert_eq!(selections[1].reason.as_deref(), Some("close by"));
    }

    #[tokio::test]
    async fn test_select_rejects_unknown_candidate() {
        let input = serde_json::json!({
            "selections": [
                { "candidate_id": "osm-999", "role": "breakfast", "rank": 0 },
            ]
        });
        let stage = stage(vec![tool_response(input)]);
        let ctx = ctx_with_candidates(&["osm-1"]);

        let err = stage.select(&ctx).await.unwrap_err();
        assert!(matches!(err, SelectionError::UnknownCandidate { .. }));
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_select_rejects_duplicate_candidate() {
        let input = serde_json::json!({
            "selections": [
                { "candidate_id": "osm-1", "role": "breakfast", "rank": 0 },
                { "candidate_id": "osm-1", "role": "lunch", "rank": 0 },
            ]
        });
        let stage = stage(vec![tool_response(input)]);
        let ctx = ctx_with_candidates(&["osm-1", "osm-2"]);

        let err = stage.select(&ctx).await.unwrap_err();
        assert!(matches!(err, SelectionError::DuplicateCandidate { .. }));
    }

    #[tokio::test]
    async fn test_select_rejects_missing_role() {
        let input = serde_json::json!({
            "selections": [
                { "candidate_id": "osm-1", "role": "breakfast", "rank": 0 },
                { "candidate_id": "osm-2", "role": "lunch", "rank": 0 },
            ]
        });
        let stage = stage(vec![tool_response(input)]);
        let ctx = ctx_with_candidates(&["osm-1", "osm-2"]);

        let err = stage.select(&ctx).await.unwrap_err();
        assert!(matches!(err, SelectionError::MissingRole { role: MealRole::Dinner }));
    }

    #[tokio::test]
    async fn test_select_malformed_response_is_validation_class() {
        let response = CompletionResponse {
            content: Some("I think The Eagle would be lovely".to_string()),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        };
        let stage = stage(vec![response]);
        let ctx = ctx_with_candidates(&["osm-1"]);

        let err = stage.select(&ctx).await.unwrap_err();
        assert!(matches!(err, SelectionError::Malformed(_)));
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_select_parses_json_from_text_fallback() {
        let content = serde_json::json!({
            "selections": [
                { "candidate_id": "osm-1", "role": "breakfast", "rank": 0 },
                { "candidate_id": "osm-2", "role": "lunch", "rank": 0 },
                { "candidate_id": "osm-3", "role": "dinner", "rank": 0 },
            ]
        })
        .to_string();
        let response = CompletionResponse {
            content: Some(content),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        };
        let stage = stage(vec![response]);
        let ctx = ctx_with_candidates(&["osm-1", "osm-2", "osm-3"]);

        let selections = stage.select(&ctx).await.unwrap();
        assert_eq!(selections.len(), 3);
    }

    #[tokio::test]
    async fn test_llm_error_is_not_validation_class() {
        let stage = stage(vec![]);
        let ctx = ctx_with_candidates(&["osm-1"]);

        let err = stage.select(&ctx).await.unwrap_err();
        assert!(!err.is_validation());
    }
}
