//! Embedded prompt templates
//!
//! Handlebars templates compiled into the binary; the stages render them
//! with their serialized context slice.

use handlebars::Handlebars;
use serde::Serialize;

/// System prompt for the selection stage
pub const SELECTION_SYSTEM: &str = r#"You are a restaurant selector. Your task is to choose dining venues for the requested meal slots from the candidate list, honoring the user's food preferences.

Selection guidance:
- Match the user's stated preferences
- Use the venue category and score
- Prefer variety across the day's meals
- Consider the user's fixed schedule: venues close to where the user already has to be are better

Call submit_selection exactly once with every choice. Only use candidate ids from the list. Never select the same venue twice."#;

/// User message template for the selection stage
pub const SELECTION_USER: &str = r#"Food preferences: {{preferences}}

Requested meals ({{per_role}} choice(s) each, best first): {{#each roles}}{{this}} {{/each}}

Fixed schedule for the day:
{{#if schedule}}{{#each schedule}}- {{this}}
{{/each}}{{else}}(no fixed commitments)
{{/if}}
Candidate venues:
{{#each candidates}}- id={{id}} "{{name}}" category={{category}} score={{score}}{{#if price}} price={{price}}{{/if}}
{{/each}}"#;

/// System prompt for the narration stage
pub const NARRATION_SYSTEM: &str = r#"You are a friendly local companion presenting a finished day plan. You will be given an ordered itinerary of fixed commitments and dining stops.

Present it so that it:
- Reads warmly and conversationally
- Walks through the day in order
- Highlights each dining stop briefly
- Mentions rough walking legs between stops where useful

Do not invent stops, times, or venues that are not in the itinerary."#;

/// User message template for the narration stage
pub const NARRATION_USER: &str = r#"Here is the day plan:
{{#each stops}}- {{start}}-{{end}} {{label}}{{#if role}} ({{role}}){{/if}}
{{/each}}"#;

/// Render a template against serializable data
///
/// Prompts are plain text, so HTML escaping is turned off (venue names
/// with apostrophes would otherwise arrive mangled).
pub fn render<T: Serialize>(template: &str, data: &T) -> Result<String, handlebars::RenderError> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.render_template(template, data)
}
