use std::fmt;
use std::str::FromStr;

use colored::Color;
use serde::{Deserialize, Serialize};

/// Kind of simulated specialist persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    Architect,
    Implementer,
    Optimizer,
    FrontendSpecialist,
    BackendSpecialist,
    Debugger,
}

impl AgentType {
    pub const ALL: [AgentType; 6] = [
        AgentType::Architect,
        AgentType::Implementer,
        AgentType::Optimizer,
        AgentType::FrontendSpecialist,
        AgentType::BackendSpecialist,
        AgentType::Debugger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Architect => "architect",
            AgentType::Implementer => "implementer",
            AgentType::Optimizer => "optimizer",
            AgentType::FrontendSpecialist => "frontend-specialist",
            AgentType::BackendSpecialist => "backend-specialist",
            AgentType::Debugger => "debugger",
        }
    }

    /// Full descriptor for this persona
    pub fn descriptor(&self) -> AgentDescriptor {
        match self {
            AgentType::Architect => AgentDescriptor {
                agent_type: *self,
                display_name: "Architect".to_string(),
                focus_description: "System design, structure and long-term maintainability".to_string(),
                personality_template: "You are a senior software architect. Think in terms of components, boundaries and data flow. Call out structural risks and propose a clear shape for the solution.".to_string(),
                color_tag: Color::Blue,
                emoji_tag: "🏗️".to_string(),
            },
            AgentType::Implementer => AgentDescriptor {
                agent_type: *self,
                display_name: "Implementer".to_string(),
                focus_description: "Writing working code quickly and correctly".to_string(),
                personality_template: "You are a pragmatic implementer. Focus on concrete code changes, name the files and functions involved, and keep the solution simple.".to_string(),
                color_tag: Color::Green,
                emoji_tag: "🔨".to_string(),
            },
            AgentType::Optimizer => AgentDescriptor {
                agent_type: *self,
                display_name: "Optimizer".to_string(),
                focus_description: "Performance, resource usage and efficiency".to_string(),
                personality_template: "You are a performance optimizer. Look for hot paths, wasted work and memory pressure, and suggest measurable improvements.".to_string(),
                color_tag: Color::Yellow,
                emoji_tag: "⚡".to_string(),
            },
            AgentType::FrontendSpecialist => AgentDescriptor {
                agent_type: *self,
                display_name: "Frontend Specialist".to_string(),
                focus_description: "UI components, rendering and user experience".to_string(),
                personality_template: "You are a frontend specialist. Reason about components, state, rendering cost and accessibility from the user's point of view.".to_string(),
                color_tag: Color::Magenta,
                emoji_tag: "🎨".to_string(),
            },
            AgentType::BackendSpecialist => AgentDescriptor {
                agent_type: *self,
                display_name: "Backend Specialist".to_string(),
                focus_description: "APIs, data storage and server-side logic".to_string(),
                personality_template: "You are a backend specialist. Focus on API contracts, persistence, authentication and failure handling on the server.".to_string(),
                color_tag: Color::Cyan,
                emoji_tag: "🗄️".to_string(),
            },
            AgentType::Debugger => AgentDescriptor {
                agent_type: *self,
                display_name: "Debugger".to_string(),
                focus_description: "Root-cause analysis of failures and defects".to_string(),
                personality_template: "You are a meticulous debugger. Form hypotheses about the root cause, name what evidence would confirm each one, and propose the smallest fix.".to_string(),
                color_tag: Color::Red,
                emoji_tag: "🐛".to_string(),
            },
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_'], "-");
        AgentType::ALL
            .iter()
            .find(|t| t.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("Unknown agent type: {}", s))
    }
}

/// Metadata for a simulated specialist persona
#[derive(Debug, Clone, Serialize)]
pub struct AgentDescriptor {
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub display_name: String,
    pub focus_description: String,
    /// Injected verbatim into delegation prompts
    pub personality_template: String,
    #[serde(serialize_with = "serialize_color")]
    pub color_tag: Color,
    pub emoji_tag: String,
}

impl AgentDescriptor {
    /// Marker token the subprocess is asked to prefix this persona's lines with
    pub fn marker_name(&self) -> String {
        self.display_name.to_uppercase().replace(' ', "-")
    }
}

fn serialize_color<S: serde::Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:?}", color).to_lowercase())
}

/// Named roster presets, each exactly three personas in a fixed order
pub const PRESETS: &[(&str, [AgentType; 3])] = &[
    (
        "frontend-trio",
        [AgentType::FrontendSpecialist, AgentType::Architect, AgentType::Optimizer],
    ),
    (
        "backend-squad",
        [AgentType::BackendSpecialist, AgentType::Architect, AgentType::Debugger],
    ),
    (
        "full-stack",
        [AgentType::FrontendSpecialist, AgentType::BackendSpecialist, AgentType::Architect],
    ),
    (
        "debug-force",
        [AgentType::Debugger, AgentType::Optimizer, AgentType::Implementer],
    ),
];

/// Roster used when nothing in the prompt matches a topic
pub const DEFAULT_ROSTER: [AgentType; 3] =
    [AgentType::Architect, AgentType::Implementer, AgentType::Optimizer];

/// Topic lexicons in classification order. An entry matches a prompt word when the
/// word equals it, or, for entries of four or more characters, starts with it.
const TOPIC_LEXICONS: &[(AgentType, &[&str])] = &[
    (
        AgentType::Architect,
        &["architecture", "architect", "design", "structure", "pattern", "scalab", "system", "refactor"],
    ),
    (
        AgentType::Implementer,
        &["implement", "build", "create", "code", "write", "develop", "feature", "add"],
    ),
    (
        AgentType::Optimizer,
        &["optimiz", "optimis", "performance", "slow", "fast", "speed", "efficien", "memory", "latency"],
    ),
    (
        AgentType::FrontendSpecialist,
        &["react", "vue", "svelte", "component", "ui", "ux", "css", "html", "frontend", "layout", "button"],
    ),
    (
        AgentType::BackendSpecialist,
        &["api", "server", "database", "backend", "endpoint", "sql", "auth", "query"],
    ),
    (
        AgentType::Debugger,
        &["bug", "debug", "error", "fix", "crash", "issue", "broken", "fail"],
    ),
];

/// Look up a preset by name
pub fn preset(name: &str) -> Option<Vec<AgentDescriptor>> {
    PRESETS
        .iter()
        .find(|(preset_name, _)| *preset_name == name)
        .map(|(_, types)| types.iter().map(AgentType::descriptor).collect())
}

/// Names of every preset in table order
pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|(name, _)| *name).collect()
}

/// Pick personas from the prompt's vocabulary.
///
/// Every topic whose lexicon intersects the prompt contributes its persona once;
/// with no match the default architect/implementer/optimizer trio is returned.
pub fn classify_prompt(prompt: &str) -> Vec<AgentDescriptor> {
    let lowered = prompt.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mut selected: Vec<AgentType> = Vec::new();
    for (agent_type, lexicon) in TOPIC_LEXICONS {
        let hit = lexicon.iter().any(|stem| {
            words
                .iter()
                .any(|word| *word == *stem || (stem.len() >= 4 && word.starts_with(stem)))
        });
        if hit && !selected.contains(agent_type) {
            selected.push(*agent_type);
        }
    }

    if selected.is_empty() {
        selected.extend(DEFAULT_ROSTER);
    }

    selected.iter().map(AgentType::descriptor).collect()
}

/// Resolve the delegation roster.
///
/// Priority: a known preset, then an explicit agent list, then the keyword classifier.
pub fn select_roster(prompt: &str, preset_name: Option<&str>, agents: &[String]) -> Vec<AgentDescriptor> {
    if let Some(name) = preset_name {
        match preset(name) {
            Some(roster) => return roster,
            None => tracing::warn!("Unknown preset '{}', falling back", name),
        }
    }

    let mut explicit: Vec<AgentType> = Vec::new();
    for raw in agents {
        match raw.parse::<AgentType>() {
            Ok(agent_type) if !explicit.contains(&agent_type) => explicit.push(agent_type),
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring requested agent: {}", e),
        }
    }
    if !explicit.is_empty() {
        return explicit.iter().map(AgentType::descriptor).collect();
    }

    classify_prompt(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn types(roster: &[AgentDescriptor]) -> Vec<AgentType> {
        roster.iter().map(|d| d.agent_type).collect()
    }

    #[test]
    fn test_frontend_trio_preset() {
        let roster = preset("frontend-trio").unwrap();
        assert_eq!(
            types(&roster),
            vec![AgentType::FrontendSpecialist, AgentType::Architect, AgentType::Optimizer]
        );
    }

    #[test]
    fn test_every_preset_has_three_distinct_agents() {
        for name in preset_names() {
            let roster = preset(name).unwrap();
            assert_eq!(roster.len(), 3, "preset {}", name);
            let seen: HashSet<AgentType> = types(&roster).into_iter().collect();
            assert_eq!(seen.len(), 3, "preset {}", name);
        }
        assert!(preset("no-such-preset").is_none());
    }

    #[test]
    fn test_classify_slow_react_component() {
        let roster = classify_prompt("optimize this slow React component");
        let found = types(&roster);
        assert!(found.contains(&AgentType::Optimizer));
        assert!(found.contains(&AgentType::FrontendSpecialist));

        let mut unique = found.clone();
        unique.sort_by_key(|t| t.as_str());
        unique.dedup();
        assert_eq!(unique.len(), found.len());
    }

    #[test]
    fn test_classify_falls_back_to_default_trio() {
        let roster = classify_prompt("hello there");
        assert_eq!(types(&roster), DEFAULT_ROSTER.to_vec());
    }

    #[test]
    fn test_short_stems_need_exact_words() {
        // "ui" must not fire on "build" or "quick"
        let roster = classify_prompt("quick build");
        assert!(!types(&roster).contains(&AgentType::FrontendSpecialist));
    }

    #[test]
    fn test_select_roster_priority() {
        let by_preset = select_roster("fix the database", Some("debug-force"), &["architect".to_string()]);
        assert_eq!(types(&by_preset)[0], AgentType::Debugger);

        let explicit = select_roster(
            "fix the database",
            Some("unknown"),
            &["Backend Specialist".to_string(), "bogus".to_string(), "backend_specialist".to_string()],
        );
        assert_eq!(types(&explicit), vec![AgentType::BackendSpecialist]);

        let classified = select_roster("fix the database", None, &[]);
        assert!(types(&classified).contains(&AgentType::Debugger));
        assert!(types(&classified).contains(&AgentType::BackendSpecialist));
    }

    #[test]
    fn test_agent_type_parsing() {
        assert_eq!("frontend-specialist".parse::<AgentType>().unwrap(), AgentType::FrontendSpecialist);
        assert_eq!("DEBUGGER".parse::<AgentType>().unwrap(), AgentType::Debugger);
        assert!("wizard".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_marker_name() {
        assert_eq!(AgentType::FrontendSpecialist.descriptor().marker_name(), "FRONTEND-SPECIALIST");
    }
}
