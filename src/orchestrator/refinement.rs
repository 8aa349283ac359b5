use colored::Colorize;

use super::step::exit_banner;
use super::{banner, Orchestrator, StepOutcome};
use crate::output::classify_stderr;
use crate::process::ProcessEvent;
use crate::session::ModeState;

/// Judges a refinement iteration's output on a 0.0..=1.0 scale
pub trait QualityScorer: Send + Sync {
    fn score(&self, iteration: u32, output: &str) -> f64;
}

/// Deterministic stand-in: `0.7 + 0.1 × iteration`, ignoring the output
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderScorer;

impl QualityScorer for PlaceholderScorer {
    fn score(&self, iteration: u32, _output: &str) -> f64 {
        0.7 + 0.1 * f64::from(iteration)
    }
}

struct Iteration {
    number: u32,
    max: u32,
    previous_output: String,
}

/// Iterate -> Evaluate -> Repeat | Stop
pub(super) async fn run(orchestrator: Orchestrator, session_id: String, task: String) {
    let Some(emitter) = orchestrator.emitter(&session_id) else {
        return;
    };
    emitter.output(banner("🔄 Refinement loop started"));

    loop {
        if !orchestrator.is_active(&session_id) {
            tracing::debug!("Loop session {} stopped, not scheduling another iteration", session_id);
            return;
        }

        let next = orchestrator
            .update_mode_state(&session_id, |state| match state {
                ModeState::InfiniteLoop(state) => {
                    state.iteration += 1;
                    Some(Iteration {
                        number: state.iteration,
                        max: state.max_iterations,
                        previous_output: state.last_output.clone(),
                    })
                }
                _ => None,
            })
            .flatten();
        let Some(iteration) = next else {
            return;
        };

        emitter.output(banner(&format!("🔁 Iteration {}/{}", iteration.number, iteration.max)));
        let prompt = orchestrator.prompts.refinement_prompt(
            &task,
            iteration.number,
            iteration.max,
            &iteration.previous_output,
        );
        let command = match orchestrator.clis.build_default(&prompt, false) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!("Cannot build loop command for {}: {}", session_id, e);
                emitter.output(format!("{}\n", format!("❌ [ERROR] {}", e).red()));
                orchestrator.finish(&session_id);
                return;
            }
        };

        let mut buffer = String::new();
        let outcome = orchestrator
            .run_step(&session_id, "iteration", &command, |event| match event {
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
            StepOutcome::Exited(code) => emitter.output(exit_banner(&format!("Iteration {}", iteration.number), code)),
            StepOutcome::TimedOut => emitter.output(exit_banner(&format!("Iteration {}", iteration.number), None)),
        }

        let quality = orchestrator.scorer.score(iteration.number, &buffer);
        let converged = orchestrator
            .update_mode_state(&session_id, |state| match state {
                ModeState::InfiniteLoop(state) => {
                    state.last_output = buffer;
                    state.last_quality = Some(quality);
                    Some(state.converged(quality))
                }
                _ => None,
            })
            .flatten();

        match converged {
            // stopped while the subprocess was running
            None => return,
            Some(true) => {
                emitter.output(banner(&format!(
                    "✨ Converged after {} iteration(s), quality {:.2}",
                    iteration.number, quality
                )));
                orchestrator.finish(&session_id);
                return;
            }
            Some(false) => {
                emitter.output(format!(
                    "{}\n",
                    format!("📈 Quality {:.2} below threshold, refining", quality).dimmed()
                ));
                orchestrator.step_delay().await;
            }
        }
    }
}
