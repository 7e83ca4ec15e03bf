//! CLI command implementations

use crate::output::{format_rows, to_json, OutputFormat};
use anyhow::{ensure, Context};
use cueplay_core::{
    drive, PlayerAdapter, PlayerConfig, PlayerEvent, PlayerHost, PlayerState, SharedAdapter,
    SimulatedPlayer,
};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tabled::Tabled;
use tracing::{debug, info};

/// One scripted action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Deliver the readiness notification
    Ready,
    /// The player reports a new state
    State { state: PlayerState },
    /// The player reports an error code
    Error { code: i32 },
    /// Set byte counters answered by the player
    Bytes { loaded: f64, total: f64 },
    /// Set playback position and duration answered by the player
    Time { current: f64, duration: f64 },
    /// Move the clock forward
    Advance { ms: u64 },
    Play { start_seconds: Option<f64> },
    PlayVideo { video_id: String, start_seconds: Option<f64> },
    LoadVideo { video_id: String, start_seconds: Option<f64> },
    Pause,
    Stop,
    Cue { start_seconds: Option<f64> },
}

/// Scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: PlayerConfig,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.config.validate()?;
        Ok(scenario)
    }
}

/// Event observed while a step ran
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioEvent {
    pub step: usize,
    pub event: PlayerEvent,
}

/// Outcome of a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub player_id: String,
    pub final_state: PlayerState,
    pub clock_ms: u64,
    pub events: Vec<ScenarioEvent>,
    pub commands: Vec<String>,
}

/// Simulated player mounted on its own host
pub struct Driver {
    host: PlayerHost,
    sim: SimulatedPlayer,
    player: SharedAdapter,
    step: Rc<Cell<usize>>,
    log: Rc<RefCell<Vec<ScenarioEvent>>>,
}

impl Driver {
    pub fn new(target: &str, config: PlayerConfig) -> anyhow::Result<Self> {
        let mut host = PlayerHost::new();
        let sim = SimulatedPlayer::new();
        let player = host.mount(target, config, sim.clone())?;

        let step = Rc::new(Cell::new(0));
        let log = Rc::new(RefCell::new(Vec::new()));
        let (current, sink) = (step.clone(), log.clone());
        player.borrow_mut().on_any(move |event| {
            sink.borrow_mut().push(ScenarioEvent {
                step: current.get(),
                event: event.clone(),
            })
        });

        Ok(Self {
            host,
            sim,
            player,
            step,
            log,
        })
    }

    /// Run one step. `Advance` jumps the clock.
    pub fn apply(&mut self, index: usize, step: &Step) -> anyhow::Result<()> {
        self.step.set(index);
        debug!(index = index, step = ?step, "Scenario step");

        match step {
            Step::Ready => {
                let id = self.player.borrow().player_id();
                ensure!(self.host.player_ready(&id), "no adapter registered for {}", id);
            }
            Step::State { state } => {
                ensure!(
                    self.sim.emit_state(&mut self.host, *state),
                    "step {}: player is not listening for state changes yet",
                    index
                );
            }
            Step::Error { code } => {
                ensure!(
                    self.sim.emit_error(&mut self.host, *code),
                    "step {}: player is not listening for errors yet",
                    index
                );
            }
            Step::Bytes { loaded, total } => self.sim.set_bytes(*loaded, *total),
            Step::Time { current, duration } => {
                self.sim.set_current_time(*current);
                self.sim.set_duration(*duration);
            }
            Step::Advance { ms } => self.command(|p| p.advance(Duration::from_millis(*ms))),
            Step::Play { start_seconds } => self.command(|p| p.play(*start_seconds)),
            Step::PlayVideo { video_id, start_seconds } => {
                self.command(|p| p.play_video(video_id, *start_seconds))
            }
            Step::LoadVideo { video_id, start_seconds } => {
                self.command(|p| p.load_video(video_id, *start_seconds))
            }
            Step::Pause => self.command(PlayerAdapter::pause),
            Step::Stop => self.command(PlayerAdapter::stop),
            Step::Cue { start_seconds } => self.command(|p| p.cue(*start_seconds)),
        }
        Ok(())
    }

    fn command(&self, f: impl FnOnce(&mut PlayerAdapter)) {
        drive(&self.player, f)
    }

    /// Run one step, sleeping through `Advance` before the clock moves
    pub async fn apply_realtime(&mut self, index: usize, step: &Step) -> anyhow::Result<()> {
        if let Step::Advance { ms } = step {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.apply(index, step)
    }

    pub fn report(&self) -> ScenarioReport {
        let player = self.player.borrow();
        ScenarioReport {
            player_id: player.player_id(),
            final_state: player.state(),
            clock_ms: player.now().as_millis() as u64,
            events: self.log.borrow().clone(),
            commands: self.sim.actions().iter().map(ToString::to_string).collect(),
        }
    }
}

/// Run every step of `scenario`
pub async fn replay(
    scenario: &Scenario,
    config: PlayerConfig,
    target: &str,
    realtime: bool,
) -> anyhow::Result<ScenarioReport> {
    let mut driver = Driver::new(target, config)?;
    for (index, step) in scenario.steps.iter().enumerate() {
        if realtime {
            driver.apply_realtime(index, step).await?;
        } else {
            driver.apply(index, step)?;
        }
    }
    Ok(driver.report())
}

/// Replay a scenario file
pub async fn run(
    scenario_path: &Path,
    config_path: Option<&Path>,
    realtime: bool,
    target: &str,
    format: &str,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(scenario_path)
        .with_context(|| format!("reading scenario {}", scenario_path.display()))?;
    let scenario = Scenario::from_json(&text)
        .with_context(|| format!("parsing scenario {}", scenario_path.display()))?;

    let config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            PlayerConfig::from_json(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => scenario.config.clone(),
    };

    info!(
        scenario = %scenario_path.display(),
        steps = scenario.steps.len(),
        realtime = realtime,
        "Replaying scenario"
    );
    let report = replay(&scenario, config, target, realtime).await?;

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&report)),
        OutputFormat::Text | OutputFormat::Table => print_report(&report, scenario_path),
    }
    Ok(())
}

fn print_report(report: &ScenarioReport, scenario_path: &Path) {
    println!("Scenario: {}", scenario_path.display());
    println!("  Player: {}", report.player_id);

    println!("\nEvents:");
    for ScenarioEvent { step, event } in &report.events {
        println!("  [step {:>3}] {}", step, event);
    }

    println!("\nCommands:");
    for command in &report.commands {
        println!("  {}", command);
    }

    println!("\nFinal state: {} after {}ms", report.final_state, report.clock_ms);
}

#[derive(Serialize, Tabled)]
struct StateRow {
    id: i32,
    name: &'static str,
    native: bool,
    event: String,
}

fn state_rows() -> Vec<StateRow> {
    PlayerState::ALL
        .into_iter()
        .map(|state| StateRow {
            id: state.id(),
            name: state.name(),
            native: state.is_native(),
            event: PlayerEvent::for_state(state)
                .map(|event| event.to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

/// Print the state table
pub fn states(format: &str) {
    println!("{}", format_rows(&state_rows(), format));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const SCENARIO: &str = r#"{
        "config": { "videoId": "abc", "playback_time_check_interval": 500 },
        "steps": [
            { "step": "ready" },
            { "step": "state", "state": "Cueing" },
            { "step": "play" },
            { "step": "time", "current": 30, "duration": 120 },
            { "step": "state", "state": "Playing" },
            { "step": "advance", "ms": 1000 },
            { "step": "error", "code": 150 }
        ]
    }"#;

    #[test]
    fn test_scenario_parsing() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.config.video_id.as_deref(), Some("abc"));
        assert_eq!(scenario.steps.len(), 7);
        assert_eq!(scenario.steps[1], Step::State { state: PlayerState::Cueing });
        assert_eq!(scenario.steps[2], Step::Play { start_seconds: None });
    }

    #[test]
    fn test_invalid_scenario_config_rejected() {
        let json = r#"{ "config": { "loading_check_interval": 0 }, "steps": [] }"#;
        assert!(Scenario::from_json(json).is_err());
        assert!(Scenario::from_json(r#"{ "steps": [{ "step": "seek" }] }"#).is_err());
    }

    #[tokio::test]
    async fn test_replay_virtual_clock() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let report = replay(&scenario, scenario.config.clone(), "box", false)
            .await
            .unwrap();

        assert_eq!(report.player_id, "cueplay_box_player");
        assert_eq!(report.final_state, PlayerState::Playing);
        assert_eq!(report.clock_ms, 1000);

        let progress: Vec<_> = report
            .events
            .iter()
            .filter(|e| matches!(e.event, PlayerEvent::Progress { .. }))
            .collect();
        assert_eq!(progress.len(), 2);
        assert!(progress.iter().all(|e| e.step == 5));
        assert_eq!(
            report.events.last().map(|e| &e.event),
            Some(&PlayerEvent::Error { code: 150 })
        );
        assert_eq!(
            report.commands.last().map(String::as_str),
            Some("cueVideoById(abc)")
        );
        assert!(report.commands.contains(&"playVideo()".to_string()));
    }

    #[tokio::test]
    async fn test_replay_realtime_sleeps() {
        let scenario = Scenario {
            config: PlayerConfig::default(),
            steps: vec![Step::Ready, Step::Advance { ms: 30 }],
        };

        let started = Instant::now();
        let report = replay(&scenario, PlayerConfig::default(), "box", true)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(report.clock_ms, 30);
    }

    #[tokio::test]
    async fn test_state_before_ready_fails() {
        let scenario = Scenario {
            config: PlayerConfig::default(),
            steps: vec![Step::State { state: PlayerState::Playing }],
        };
        let err = replay(&scenario, PlayerConfig::default(), "box", false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not listening"));
    }

    #[test]
    fn test_state_rows() {
        let rows = state_rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].name, "NotLoaded");
        assert!(!rows[0].native);
        assert_eq!(rows[0].event, "-");
        assert_eq!(rows[7].id, 5);
        assert_eq!(rows[7].event, "Cueing");
    }
}
