use std::collections::HashMap;

use crate::agents::AgentDescriptor;
use crate::session::Phase;

/// Builds the mode-specific prompts handed to the assistant CLI
pub struct PromptSynthesizer {
    builtin_templates: HashMap<&'static str, &'static str>,
}

impl PromptSynthesizer {
    pub fn new() -> Self {
        let mut builtin_templates = HashMap::new();

        builtin_templates.insert("delegation", r#"You are coordinating a team of {{agent_count}} specialist agents working together on one request.
Respond AS EACH of the following agents, in the order listed.

{{roster}}

Formatting rules:
- Start every agent's contribution on a new line with its marker exactly as shown, e.g. **[{{first_marker}}]:**
- Each agent writes 2-3 sentences from its own perspective.
- Do not repeat content another agent already covered.
- Do not add any text outside the agent contributions.

Request: {{task}}
"#);

        builtin_templates.insert("refinement", r#"Here is the output of the previous iteration ({{previous_iteration}} of {{max_iterations}}):

{{previous_output}}

Original request: {{task}}

Improve upon this. Fix anything incorrect or incomplete, tighten the solution, and return the complete improved result rather than a list of changes.
"#);

        builtin_templates.insert("handoff", r#"Previous phase output:

{{previous_output}}

Now, as the {{phase}}, {{phase_instruction}}

Original request: {{task}}
"#);

        Self { builtin_templates }
    }

    /// Prompt asking one subprocess to answer as every persona in the roster
    pub fn delegation_prompt(&self, task: &str, roster: &[AgentDescriptor]) -> String {
        let roster_block = roster
            .iter()
            .map(|agent| {
                format!(
                    "**[{}]:** {} {} (focus: {})",
                    agent.marker_name(),
                    agent.emoji_tag,
                    agent.personality_template,
                    agent.focus_description
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let first_marker = roster
            .first()
            .map(|agent| agent.marker_name())
            .unwrap_or_else(|| "AGENT-NAME".to_string());

        self.render(
            "delegation",
            &[
                ("agent_count", roster.len().to_string()),
                ("roster", roster_block),
                ("first_marker", first_marker),
                ("task", task.to_string()),
            ],
        )
    }

    /// Prompt for a refinement iteration. The first iteration uses the raw request.
    pub fn refinement_prompt(
        &self,
        task: &str,
        iteration: u32,
        max_iterations: u32,
        previous_output: &str,
    ) -> String {
        if iteration <= 1 {
            return task.to_string();
        }

        self.render(
            "refinement",
            &[
                ("previous_iteration", (iteration - 1).to_string()),
                ("max_iterations", max_iterations.to_string()),
                ("previous_output", previous_output.to_string()),
                ("task", task.to_string()),
            ],
        )
    }

    /// Prompt for a hivemind phase. Without prior context the raw request is used.
    pub fn handoff_prompt(&self, task: &str, phase: Phase, previous_output: &str) -> String {
        if previous_output.is_empty() {
            return task.to_string();
        }

        self.render(
            "handoff",
            &[
                ("previous_output", previous_output.to_string()),
                ("phase", phase.as_str().to_string()),
                ("phase_instruction", phase.instruction().to_string()),
                ("task", task.to_string()),
            ],
        )
    }

    /// Single pass over the template, so substituted text is never re-scanned
    fn render(&self, name: &str, values: &[(&str, String)]) -> String {
        let template = self.builtin_templates.get(name).copied().unwrap_or_default();
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                rendered.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let key = &after[..end];
            match values.iter().find(|(k, _)| *k == key) {
                Some((_, value)) => rendered.push_str(value),
                None => rendered.push_str(&rest[start..start + end + 4]),
            }
            rest = &after[end + 2..];
        }
        rendered.push_str(rest);

        rendered
    }
}

impl Default for PromptSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}
