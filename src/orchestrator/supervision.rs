use super::step::exit_banner;
use super::{banner, Orchestrator, StepOutcome};
use crate::cli::BuiltCommand;
use crate::output::{classify_stderr, classify_stdout};
use crate::process::ProcessEvent;

/// Idle -> Running -> Completed. No retries; a non-zero exit is only reported.
pub(super) async fn run(orchestrator: Orchestrator, session_id: String, command: BuiltCommand) {
    let Some(emitter) = orchestrator.emitter(&session_id) else {
        return;
    };
    emitter.output(banner("🎯 Supervision started"));

    let outcome = orchestrator
        .run_step(&session_id, "supervisor", &command, |event| match event {
            ProcessEvent::Stdout(line) if !line.trim().is_empty() => {
                emitter.output(classify_stdout(line).format(line));
            }
            ProcessEvent::Stderr(line) if !line.trim().is_empty() => {
                emitter.output(classify_stderr(line).format(line));
            }
            _ => {}
        })
        .await;

    match outcome {
        StepOutcome::Cancelled => return,
        StepOutcome::Exited(code) => emitter.output(exit_banner("Supervised agent", code)),
        StepOutcome::TimedOut => emitter.output(exit_banner("Supervised agent", None)),
        StepOutcome::SpawnFailed => {}
    }

    orchestrator.finish(&session_id);
}
