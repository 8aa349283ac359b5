use colored::Colorize;

use super::step::exit_banner;
use super::{banner, Orchestrator, StepOutcome};
use crate::output::classify_stderr;
use crate::process::ProcessEvent;
use crate::session::{ModeState, Phase};

/// phase[0] -> ... -> phase[n-1] -> Completed.
///
/// Each phase is handed only the previous phase's output.
pub(super) async fn run(orchestrator: Orchestrator, session_id: String, task: String) {
    let Some(emitter) = orchestrator.emitter(&session_id) else {
        return;
    };
    emitter.output(banner("🐝 Hivemind started: architect → implementer → reviewer"));

    loop {
        if !orchestrator.is_active(&session_id) {
            tracing::debug!("Hivemind session {} stopped, not scheduling another phase", session_id);
            return;
        }

        let next: Option<(usize, usize, Phase, String)> = orchestrator
            .update_mode_state(&session_id, |state| match state {
                ModeState::Hivemind(phases) => phases.current_phase().map(|phase| {
                    (
                        phases.current_phase_index,
                        phases.phases.len(),
                        phase,
                        phases.accumulated_context.clone(),
                    )
                }),
                _ => None,
            })
            .flatten();
        let Some((index, total, phase, context)) = next else {
            return;
        };

        emitter.output(banner(&format!(
            "{} Phase {}/{}: {}",
            phase.emoji(),
            index + 1,
            total,
            phase.as_str()
        )));
        let prompt = orchestrator.prompts.handoff_prompt(&task, phase, &context);
        let command = match orchestrator.clis.build_default(&prompt, false) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!("Cannot build {} command for {}: {}", phase.as_str(), session_id, e);
                emitter.output(format!("{}\n", format!("❌ [ERROR] {}", e).red()));
                orchestrator.finish(&session_id);
                return;
            }
        };

        let mut buffer = String::new();
        let outcome = orchestrator
            .run_step(&session_id, phase.as_str(), &command, |event| match event {
                ProcessEvent::Stdout(line) => {
                    buffer.push_str(line);
                    buffer.push('\n');
                    emitter.output(format!("{}\n", line));
                }
                ProcessEvent::Stderr(line) if !line.trim().is_empty() => {
                    emitter.output(classify_stderr(line).format(line));
                }
                _ => {}
            })
            .await;

        match outcome {
            StepOutcome::Cancelled => return,
            StepOutcome::SpawnFailed => {
                orchestrator.finish(&session_id);
                return;
            }
            StepOutcome::Exited(Some(0)) => {}
            StepOutcome::Exited(code) => emitter.output(exit_banner(phase.as_str(), code)),
            StepOutcome::TimedOut => emitter.output(exit_banner(phase.as_str(), None)),
        }

        let complete = orchestrator
            .update_mode_state(&session_id, |state| match state {
                ModeState::Hivemind(phases) => {
                    phases.advance(buffer);
                    Some(phases.is_complete())
                }
                _ => None,
            })
            .flatten();

        match complete {
            None => return,
            Some(true) => {
                emitter.output(banner("🎉 Hivemind complete"));
                orchestrator.finish(&session_id);
                return;
            }
            Some(false) => orchestrator.step_delay().await,
        }
    }
}
