use colored::Colorize;
use serde::Serialize;

/// Category of a supervision output line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    ToolInvocation,
    ErrorReport,
    SuccessReport,
    Verbose,
    /// Anything the CLI writes on stderr
    Trace,
}

const TOOL_MARKERS: &[&str] = &[
    "tool:",
    "tool_use",
    "using tool",
    "calling tool",
    "executing",
    "running command",
    "$ ",
];

const ERROR_MARKERS: &[&str] = &["error", "failed", "failure", "exception", "panic", "✗", "❌"];

const SUCCESS_MARKERS: &[&str] = &["success", "completed", "passed", "done", "✓", "✅"];

/// Classify one stdout line. Tool markers win over error markers, which win over success.
pub fn classify_stdout(line: &str) -> LineKind {
    let lowered = line.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));

    if has(TOOL_MARKERS) {
        LineKind::ToolInvocation
    } else if has(ERROR_MARKERS) {
        LineKind::ErrorReport
    } else if has(SUCCESS_MARKERS) {
        LineKind::SuccessReport
    } else {
        LineKind::Verbose
    }
}

pub fn classify_stderr(_line: &str) -> LineKind {
    LineKind::Trace
}

impl LineKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            LineKind::ToolInvocation => "🔧 [TOOL]",
            LineKind::ErrorReport => "❌ [ERROR]",
            LineKind::SuccessReport => "✅ [OK]",
            LineKind::Verbose => "💬",
            LineKind::Trace => "🔍 [TRACE]",
        }
    }

    /// Render a line with this category's prefix and color
    pub fn format(&self, line: &str) -> String {
        let text = format!("{} {}", self.prefix(), line);
        let colored = match self {
            LineKind::ToolInvocation => text.cyan(),
            LineKind::ErrorReport => text.red(),
            LineKind::SuccessReport => text.green(),
            LineKind::Verbose => text.normal(),
            LineKind::Trace => text.dimmed(),
        };
        format!("{}\n", colored)
    }
}
