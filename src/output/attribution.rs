//! Persona attribution for delegation output.
//!
//! The subprocess is asked to prefix each persona's contribution with a marker.
//! Recognised marker forms, tried in this order:
//!
//! | form                  | example                              |
//! |-----------------------|--------------------------------------|
//! | bracket prefix        | `**[ARCHITECT]:** text`, `[Optimizer] text` |
//! | bold colon prefix     | `**Debugger:** text`, `**Debugger**: text`  |
//! | capitalised word colon| `Frontend Specialist: text`          |
//!
//! A marker only switches the current persona when its token fuzzy-matches a
//! roster member (case-insensitive substring in either direction, ignoring
//! punctuation). Lines before the first recognised marker belong to the
//! synthetic Coordinator; afterwards a persona stays current until the next
//! recognised marker.

use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::agents::AgentDescriptor;
use crate::output::strip_ansi;

static BRACKET_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\*\*)?\[([^\]]{1,40})\](?:\*\*)?\s*:?\s*(?:\*\*)?\s*(.*)$")
        .expect("Invalid bracket marker regex")
});

static BOLD_COLON_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\*\*([^*\[\]:]{1,40}?)\s*(?::\*\*|\*\*\s*:)\s*(.*)$")
        .expect("Invalid bold colon marker regex")
});

static CAPITALIZED_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Z][A-Za-z]*(?:[ -][A-Z][A-Za-z]*)?)\s*:\s*(.*)$")
        .expect("Invalid capitalized marker regex")
});

const COORDINATOR_NAME: &str = "Coordinator";
const COORDINATOR_EMOJI: &str = "🎯";

/// A syntactic marker found at the start of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerMatch {
    pub token: String,
    /// Text following the marker
    pub rest: String,
}

/// Finds persona markers in a line. Swap implementations to change the heuristic
/// without touching the delegation state machine.
pub trait MarkerGrammar: Send + Sync {
    fn detect(&self, line: &str) -> Option<MarkerMatch>;
}

/// The bracket / bold-colon / capitalised-colon grammar described above
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMarkerGrammar;

impl MarkerGrammar for DefaultMarkerGrammar {
    fn detect(&self, line: &str) -> Option<MarkerMatch> {
        [&*BRACKET_MARKER, &*BOLD_COLON_MARKER, &*CAPITALIZED_MARKER]
            .iter()
            .find_map(|pattern| {
                pattern.captures(line).map(|caps| MarkerMatch {
                    token: caps[1].trim().to_string(),
                    rest: caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
                })
            })
    }
}

/// Who a line is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Coordinator,
    /// Index into the roster
    Agent(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub speaker: Speaker,
    pub text: String,
    /// The line carried a marker that switched the current persona
    pub switched: bool,
}

/// Tracks the current persona across a stream of delegation output
pub struct PersonaAttributor<G: MarkerGrammar = DefaultMarkerGrammar> {
    grammar: G,
    roster: Vec<AgentDescriptor>,
    current: Option<usize>,
    contributions: Vec<usize>,
    coordinator_lines: usize,
}

impl PersonaAttributor<DefaultMarkerGrammar> {
    pub fn new(roster: Vec<AgentDescriptor>) -> Self {
        Self::with_grammar(roster, DefaultMarkerGrammar)
    }
}

impl<G: MarkerGrammar> PersonaAttributor<G> {
    pub fn with_grammar(roster: Vec<AgentDescriptor>, grammar: G) -> Self {
        let contributions = vec![0; roster.len()];
        Self {
            grammar,
            roster,
            current: None,
            contributions,
            coordinator_lines: 0,
        }
    }

    /// True once any marker has been matched against the roster
    pub fn recognized_any(&self) -> bool {
        self.current.is_some()
    }

    /// Attribute one line. Blank lines yield nothing.
    pub fn attribute(&mut self, raw_line: &str) -> Option<Attribution> {
        let line = strip_ansi(raw_line);
        if line.trim().is_empty() {
            return None;
        }

        let mut switched = false;
        let mut text = line.trim().to_string();

        if let Some(marker) = self.grammar.detect(&line) {
            if let Some(index) = self.match_roster(&marker.token) {
                if self.current != Some(index) {
                    tracing::debug!("Attribution switched to {}", self.roster[index].display_name);
                }
                self.current = Some(index);
                switched = true;
                text = marker.rest;
            }
        }

        let speaker = match self.current {
            Some(index) => Speaker::Agent(index),
            None => Speaker::Coordinator,
        };

        if !text.is_empty() {
            match speaker {
                Speaker::Agent(index) => self.contributions[index] += 1,
                Speaker::Coordinator => self.coordinator_lines += 1,
            }
        }

        Some(Attribution { speaker, text, switched })
    }

    /// Bidirectional substring match of a marker token against roster names
    fn match_roster(&self, token: &str) -> Option<usize> {
        let token = normalize(token);
        if token.len() < 3 {
            return None;
        }

        self.roster.iter().position(|agent| {
            [normalize(&agent.display_name), normalize(agent.agent_type.as_str())]
                .iter()
                .any(|name| name.contains(&token) || token.contains(name.as_str()))
        })
    }

    /// Render an attribution with the speaker's emoji and color
    pub fn format(&self, attribution: &Attribution) -> String {
        match attribution.speaker {
            Speaker::Coordinator => {
                let text = format!("{} [{}] {}", COORDINATOR_EMOJI, COORDINATOR_NAME, attribution.text);
                format!("{}\n", text.white())
            }
            Speaker::Agent(index) => {
                let agent = &self.roster[index];
                let label = format!("{} [{}]", agent.emoji_tag, agent.display_name);
                if attribution.text.is_empty() {
                    format!("{}\n", label.color(agent.color_tag).bold())
                } else {
                    format!(
                        "{} {}\n",
                        label.color(agent.color_tag).bold(),
                        attribution.text.as_str().color(agent.color_tag)
                    )
                }
            }
        }
    }

    /// Lines attributed to each roster member, in roster order
    pub fn contributions(&self) -> Vec<(&AgentDescriptor, usize)> {
        self.roster.iter().zip(self.contributions.iter().copied()).collect()
    }

    pub fn coordinator_lines(&self) -> usize {
        self.coordinator_lines
    }

    /// Closing contribution summary, or a generic notice when no marker was recognised
    pub fn summary(&self) -> String {
        if !self.recognized_any() {
            return format!("{}\n", "✅ Parallel agents completed".green());
        }

        let mut summary = format!("{}\n", "📊 Agent contributions:".bold());
        for (agent, lines) in self.contributions() {
            summary.push_str(&format!(
                "   {} {}: {} lines\n",
                agent.emoji_tag,
                agent.display_name.as_str().color(agent.color_tag),
                lines
            ));
        }
        summary
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
