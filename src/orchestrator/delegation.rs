use super::step::exit_banner;
use super::{banner, roster_line, Orchestrator, StepOutcome};
use crate::agents::AgentDescriptor;
use crate::cli::BuiltCommand;
use crate::output::{classify_stderr, PersonaAttributor};
use crate::process::ProcessEvent;

/// A single subprocess speaks for the whole roster. Its stdout is attributed
/// to personas line by line; there is no per-persona fallback.
pub(super) async fn run(
    orchestrator: Orchestrator,
    session_id: String,
    roster: Vec<AgentDescriptor>,
    command: BuiltCommand,
) {
    let Some(emitter) = orchestrator.emitter(&session_id) else {
        return;
    };
    emitter.output(banner(&format!("🤝 Parallel agents: {}", roster_line(&roster))));

    let mut attributor = PersonaAttributor::new(roster);
    let outcome = orchestrator
        .run_step(&session_id, "delegator", &command, |event| match event {
            ProcessEvent::Stdout(line) => {
                if let Some(attribution) = attributor.attribute(line) {
                    if attribution.switched || !attribution.text.is_empty() {
                        emitter.output(attributor.format(&attribution));
                    }
                }
            }
            ProcessEvent::Stderr(line) if !line.trim().is_empty() => {
                emitter.output(classify_stderr(line).format(line));
            }
            _ => {}
        })
        .await;

    match outcome {
        StepOutcome::Cancelled => return,
        StepOutcome::SpawnFailed => {}
        StepOutcome::Exited(Some(0)) => emitter.output(attributor.summary()),
        StepOutcome::Exited(code) => {
            emitter.output(exit_banner("Delegation", code));
            emitter.output(attributor.summary());
        }
        StepOutcome::TimedOut => {
            emitter.output(exit_banner("Delegation", None));
            emitter.output(attributor.summary());
        }
    }

    orchestrator.finish(&session_id);
}
