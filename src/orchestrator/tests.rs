use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::agents::AgentType;
use crate::process::testing::{ScriptedLauncher, ScriptedRun};

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.orchestration.step_delay_ms = 0;
    config
}

fn setup(runs: Vec<ScriptedRun>) -> (Orchestrator, Arc<ScriptedLauncher>) {
    setup_with(test_config(), runs)
}

fn setup_with(config: AppConfig, runs: Vec<ScriptedRun>) -> (Orchestrator, Arc<ScriptedLauncher>) {
    let launcher = ScriptedLauncher::new(runs);
    (Orchestrator::new(&config, launcher.clone()), launcher)
}

/// Read events up to and including the completion notice, plus anything that
/// (wrongly) follows it.
async fn collect(handle: &mut SessionHandle) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), handle.events.recv())
            .await
            .expect("session did not complete in time")
            .expect("event channel closed before completion");
        let done = matches!(event, SessionEvent::SessionComplete { .. });
        events.push(event);
        if done {
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    while let Ok(extra) = handle.events.try_recv() {
        events.push(extra);
    }
    events
}

fn output_text(events: &[SessionEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Output { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn completions(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SessionEvent::SessionComplete { .. }))
        .count()
}

async fn wait_for_launches(launcher: &ScriptedLauncher, count: usize) {
    for _ in 0..400 {
        if launcher.launch_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {} launches, saw {}", count, launcher.launch_count());
}

struct ZeroScorer;

impl QualityScorer for ZeroScorer {
    fn score(&self, _iteration: u32, _output: &str) -> f64 {
        0.0
    }
}

#[tokio::test]
async fn test_supervision_end_to_end() {
    let (orchestrator, launcher) = setup(vec![ScriptedRun::lines(&[
        "Using tool: Read src/lib.rs",
        "Error: missing semicolon",
        "All tests passed",
    ])
    .with_stderr(&["token usage 1200"])]);

    let mut handle = orchestrator.start_supervision("fix the bug", Some("s1".into())).unwrap();
    assert_eq!(handle.id, "s1");

    let active = orchestrator.list_active_sessions();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "s1");
    assert_eq!(active[0].mode, SessionMode::Supervision);
    assert!(active[0].duration_ms >= 0);

    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    assert!(matches!(events.last(), Some(SessionEvent::SessionComplete { session_id, .. }) if session_id == "s1"));

    let text = output_text(&events);
    assert!(text.contains("[TOOL]"));
    assert!(text.contains("[ERROR]"));
    assert!(text.contains("[OK]"));
    assert!(text.contains("[TRACE]"));
    assert!(text.contains("exit code 0"));

    assert!(orchestrator.list_active_sessions().is_empty());
    let launched = launcher.launched();
    assert_eq!(launched.len(), 1);
    assert!(launched[0].args.contains(&"--verbose".to_string()));
    assert_eq!(launched[0].prompt(), Some("fix the bug"));
}

#[tokio::test]
async fn test_supervision_reports_nonzero_exit() {
    let (orchestrator, _) = setup(vec![ScriptedRun::lines(&["working"]).exit_code(2)]);
    let mut handle = orchestrator.start_supervision("fix the bug", None).unwrap();

    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    assert!(output_text(&events).contains("exit code 2"));
}

#[tokio::test]
async fn test_events_are_broadcast() {
    let (orchestrator, _) = setup(vec![ScriptedRun::lines(&["hello"])]);
    let mut bus = orchestrator.subscribe();
    let mut handle = orchestrator.start_supervision("say hello", Some("b1".into())).unwrap();
    collect(&mut handle).await;

    let mut saw_complete = false;
    while let Ok(event) = bus.try_recv() {
        assert_eq!(event.session_id(), "b1");
        saw_complete |= matches!(event, SessionEvent::SessionComplete { .. });
    }
    assert!(saw_complete);
}

#[tokio::test]
async fn test_parallel_frontend_trio() {
    let (orchestrator, launcher) = setup(vec![ScriptedRun::lines(&[
        "Let me bring in the team.",
        "**[FRONTEND-SPECIALIST]:** Use a CSS grid for the layout.",
        "**[ARCHITECT]:** Split the page into three components.",
        "Keep their props narrow.",
        "**[OPTIMIZER]:** Memoize the list rows.",
    ])]);

    let options = ParallelOptions {
        preset: Some("frontend-trio".into()),
        agents: vec![],
    };
    let mut handle = orchestrator
        .start_parallel_agents("build the settings page", Some("p1".into()), options)
        .unwrap();

    let detail = orchestrator.get_session("p1").unwrap();
    assert_eq!(detail.mode, SessionMode::ParallelDelegation);
    match detail.state {
        ModeState::ParallelDelegation { roster, preset } => {
            let types: Vec<AgentType> = roster.iter().map(|a| a.agent_type).collect();
            assert_eq!(
                types,
                vec![AgentType::FrontendSpecialist, AgentType::Architect, AgentType::Optimizer]
            );
            assert_eq!(preset.as_deref(), Some("frontend-trio"));
        }
        other => panic!("unexpected state {:?}", other),
    }

    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    let text = output_text(&events);
    assert!(text.contains("[Coordinator] Let me bring in the team."));
    assert!(text.contains("[Architect]"));
    assert!(text.contains("Keep their props narrow."));
    assert!(text.contains("Agent contributions"));
    assert!(text.contains("2 lines"));

    assert_eq!(launcher.launch_count(), 1);
    let prompt = &launcher.prompts()[0];
    assert!(prompt.contains("**[FRONTEND-SPECIALIST]:**"));
    assert!(prompt.contains("build the settings page"));
}

#[tokio::test]
async fn test_parallel_classifies_prompt_without_preset() {
    let (orchestrator, _) = setup(vec![ScriptedRun::lines(&["Just one plain answer."])]);
    let mut handle = orchestrator
        .start_parallel_agents("optimize this slow React component", None, ParallelOptions::default())
        .unwrap();

    let Some(ModeState::ParallelDelegation { roster, preset }) =
        orchestrator.get_session(&handle.id).map(|d| d.state)
    else {
        panic!("session should be active");
    };
    assert!(preset.is_none());
    assert!(roster.iter().any(|a| a.agent_type == AgentType::Optimizer));
    assert!(roster.iter().any(|a| a.agent_type == AgentType::FrontendSpecialist));

    let events = collect(&mut handle).await;
    assert!(output_text(&events).contains("Parallel agents completed"));
}

#[tokio::test]
async fn test_infinite_loop_spawns_exactly_two() {
    let (orchestrator, launcher) = setup(vec![
        ScriptedRun::lines(&["first draft"]),
        ScriptedRun::lines(&["second draft"]),
    ]);
    let mut handle = orchestrator.start_infinite_loop("write a parser", Some("l1".into())).unwrap();

    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    assert_eq!(launcher.launch_count(), 2);

    let prompts = launcher.prompts();
    assert_eq!(prompts[0], "write a parser");
    assert!(prompts[1].contains("first draft"));
    assert!(prompts[1].contains("write a parser"));
    assert!(output_text(&events).contains("Converged after 2 iteration(s)"));
    assert!(orchestrator.list_active_sessions().is_empty());
}

#[tokio::test]
async fn test_infinite_loop_stops_at_iteration_budget() {
    let mut config = test_config();
    config.orchestration.max_iterations = 3;
    let (orchestrator, launcher) = setup_with(config, vec![]);
    let orchestrator = orchestrator.with_scorer(Arc::new(ZeroScorer));

    let mut handle = orchestrator.start_infinite_loop("never good enough", None).unwrap();
    let events = collect(&mut handle).await;

    assert_eq!(completions(&events), 1);
    assert_eq!(launcher.launch_count(), 3);
}

#[tokio::test]
async fn test_stop_during_loop_delay_prevents_next_iteration() {
    let mut config = test_config();
    config.orchestration.step_delay_ms = 200;
    let (orchestrator, launcher) = setup_with(config, vec![ScriptedRun::lines(&["draft"])]);
    let orchestrator = orchestrator.with_scorer(Arc::new(ZeroScorer));

    let mut handle = orchestrator.start_infinite_loop("keep going", Some("l2".into())).unwrap();
    wait_for_launches(&launcher, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    orchestrator.stop_session("l2").unwrap();
    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(launcher.launch_count(), 1);
}

#[tokio::test]
async fn test_hivemind_three_phases_in_order() {
    let (orchestrator, launcher) = setup(vec![
        ScriptedRun::lines(&["DESIGN-OUTPUT"]),
        ScriptedRun::lines(&["CODE-OUTPUT"]),
        ScriptedRun::lines(&["REVIEW-OUTPUT"]),
    ]);
    let mut handle = orchestrator.start_hivemind("add a cache layer", Some("h1".into())).unwrap();

    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    assert_eq!(launcher.launch_count(), 3);

    let prompts = launcher.prompts();
    assert_eq!(prompts[0], "add a cache layer");
    assert!(prompts[1].contains("DESIGN-OUTPUT"));
    assert!(prompts[1].contains("as the implementer"));
    assert!(prompts[2].contains("CODE-OUTPUT"));
    assert!(prompts[2].contains("as the reviewer"));
    assert!(!prompts[2].contains("DESIGN-OUTPUT"));

    let text = output_text(&events);
    let architect = text.find("Phase 1/3: architect").unwrap();
    let implementer = text.find("Phase 2/3: implementer").unwrap();
    let reviewer = text.find("Phase 3/3: reviewer").unwrap();
    assert!(architect < implementer && implementer < reviewer);
    assert!(orchestrator.process_owner("h1-architect-1").is_none());
}

#[tokio::test]
async fn test_spawn_failure_cleans_up_session() {
    let (orchestrator, launcher) = setup(vec![ScriptedRun::spawn_failure("claude: not installed")]);
    let mut handle = orchestrator.start_hivemind("add a cache layer", None).unwrap();

    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    assert!(output_text(&events).contains("[SPAWN-ERROR]"));
    assert_eq!(launcher.launch_count(), 1);
    assert!(orchestrator.list_active_sessions().is_empty());
}

#[tokio::test]
async fn test_stop_terminates_running_process() {
    let (orchestrator, launcher) = setup(vec![ScriptedRun::hanging()]);
    let mut handle = orchestrator.start_supervision("long task", Some("s1".into())).unwrap();
    wait_for_launches(&launcher, 1).await;

    let owner = orchestrator.process_owner("s1-supervisor-1").unwrap();
    assert_eq!(owner.session_id, "s1");
    assert_eq!(owner.role, "supervisor");
    assert_eq!(orchestrator.get_session("s1").unwrap().processes.len(), 1);

    orchestrator.stop_session("s1").unwrap();
    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    assert!(orchestrator.process_owner("s1-supervisor-1").is_none());
    assert!(orchestrator.list_active_sessions().is_empty());

    assert_eq!(
        orchestrator.stop_session("s1"),
        Err(OrchestratorError::NotFound("s1".into()))
    );
}

#[tokio::test]
async fn test_stop_unknown_session() {
    let (orchestrator, _) = setup(vec![]);
    assert_eq!(
        orchestrator.stop_session("ghost"),
        Err(OrchestratorError::NotFound("ghost".into()))
    );
}

#[tokio::test]
async fn test_duplicate_session_id_is_rejected() {
    let (orchestrator, launcher) = setup(vec![ScriptedRun::hanging()]);
    let _handle = orchestrator.start_supervision("first", Some("dup".into())).unwrap();

    let result = orchestrator.start_hivemind("second", Some("dup".into()));
    assert!(matches!(result, Err(OrchestratorError::SessionExists(id)) if id == "dup"));
    assert_eq!(orchestrator.get_session("dup").unwrap().mode, SessionMode::Supervision);

    wait_for_launches(&launcher, 1).await;
    orchestrator.stop_session("dup").unwrap();
}

#[tokio::test]
async fn test_session_limit_and_shutdown() {
    let mut config = test_config();
    config.orchestration.max_sessions = 1;
    let (orchestrator, _) = setup_with(config, vec![ScriptedRun::hanging()]);

    let mut handle = orchestrator.start_supervision("first", None).unwrap();
    assert!(matches!(
        orchestrator.start_supervision("second", None),
        Err(OrchestratorError::TooManySessions(1))
    ));

    assert_eq!(orchestrator.shutdown(), 1);
    let events = collect(&mut handle).await;
    assert_eq!(completions(&events), 1);
    assert!(orchestrator.list_active_sessions().is_empty());
}

#[tokio::test]
async fn test_step_timeout_kills_hung_process() {
    let mut config = test_config();
    config.orchestration.step_timeout_secs = Some(1);
    let (orchestrator, _) = setup_with(config, vec![ScriptedRun::hanging()]);

    let mut handle = orchestrator.start_supervision("long task", None).unwrap();
    let events = collect(&mut handle).await;

    assert_eq!(completions(&events), 1);
    let text = output_text(&events);
    assert!(text.contains("[TIMEOUT]"));
    assert!(text.contains("terminated by signal"));
}

#[tokio::test]
async fn test_unknown_default_cli_is_rejected_up_front() {
    let mut config = test_config();
    config.default_cli = "missing".into();
    let (orchestrator, launcher) = setup_with(config, vec![]);

    assert_eq!(
        orchestrator.start_hivemind("anything", None).err(),
        Some(OrchestratorError::UnknownCli("missing".into()))
    );
    assert!(orchestrator.list_active_sessions().is_empty());
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn test_malformed_session_id() {
    let (orchestrator, _) = setup(vec![]);
    assert!(matches!(
        orchestrator.start_supervision("x", Some("../etc".into())),
        Err(OrchestratorError::MalformedSession(_))
    ));
}
