//! Scripted replays – drive an [`ArrowNockContext`] against the simulated
//! world from a TOML file.
//!
//! ```toml
//! name = "grip nock"
//! frame_ms = 11
//!
//! [settings]
//! frames_between_attempts = 2
//!
//! [[step]]
//! action = "press"
//! button = "grip"
//!
//! [[step]]
//! action = "equip"
//! item = "arrow"
//!
//! [[step]]
//! action = "hands"
//! distance = 0.0
//!
//! [[step]]
//! action = "tick"
//! count = 3
//! ```
//!
//! Hands start 50 units apart with no relative rotation; the bow is
//! equipped in the bow hand for the configured hand mode.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use nockvr_hal::sim::{SimFeedbackSink, SimInputBackend};
use nockvr_perception::{Quaternion, Transform3D, Vec3};
use nockvr_runtime::sim::{HUNTING_BOW, IRON_ARROW, IRON_SWORD, PLAYER_ID, STEEL_BOLT, SimWorld};
use nockvr_runtime::{ArrowNockContext, Command, NockState, SettingsSource, Transition};
use nockvr_types::{
    ActionChannel, ButtonEvent, ButtonId, ButtonState, Clock, EquipEvent, Hand, ManualClock,
    MenuEvent, NockError, NockSettings, ResourceValue, WeaponKind,
};
use serde::Deserialize;
use tracing::info;

const START_DISTANCE: f32 = 50.0;

fn default_frame_ms() -> u64 {
    11
}

fn default_count() -> u32 {
    1
}

/// A whole replay file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Clock advance per tick.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
    /// Replaces the loaded configuration when present.
    #[serde(default)]
    pub settings: Option<NockSettings>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// One scripted step, optionally delayed.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Clock advance before the action runs.
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// Items a scenario can equip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Arrow,
    Bolt,
    Bow,
    Sword,
}

impl Item {
    fn form_id(self) -> u32 {
        match self {
            Item::Arrow => IRON_ARROW,
            Item::Bolt => STEEL_BOLT,
            Item::Bow => HUNTING_BOW,
            Item::Sword => IRON_SWORD,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Equip { item: Item },
    Unequip { item: Item },
    /// Physically press a button on the arrow hand.
    Press { button: ButtonId },
    Release { button: ButtonId },
    /// Place the arrow hand relative to the bow: offset along x and pitch in
    /// radians.
    Hands {
        distance: f32,
        #[serde(default)]
        pitch: f32,
    },
    Stamina { current: f32, max: f32 },
    /// Put a weapon in a hand, or empty it.
    Wield {
        hand: Hand,
        #[serde(default)]
        weapon: Option<WeaponKind>,
    },
    Pause { paused: bool },
    Menu { name: String, opening: bool },
    Load,
    Tick {
        #[serde(default = "default_count")]
        count: u32,
    },
}

impl Action {
    fn label(&self) -> String {
        match self {
            Action::Equip { item } => format!("equip {item:?}"),
            Action::Unequip { item } => format!("unequip {item:?}"),
            Action::Press { button } => format!("press {button:?}"),
            Action::Release { button } => format!("release {button:?}"),
            Action::Hands { distance, pitch } => format!("hands d={distance} pitch={pitch}"),
            Action::Stamina { current, max } => format!("stamina {current}/{max}"),
            Action::Wield { hand, weapon } => format!("wield {hand} {weapon:?}"),
            Action::Pause { paused } => format!("pause {paused}"),
            Action::Menu { name, opening } => {
                format!("menu {name} {}", if *opening { "open" } else { "close" })
            }
            Action::Load => "load".to_string(),
            Action::Tick { .. } => "tick".to_string(),
        }
    }
}

/// Parse a scenario file.
pub fn load(path: &Path) -> Result<Scenario, NockError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| NockError::Config(format!("failed to read {}: {e}", path.display())))?;
    parse(&raw)
}

pub fn parse(raw: &str) -> Result<Scenario, NockError> {
    toml::from_str(raw).map_err(|e| NockError::Config(format!("invalid scenario: {e}")))
}

/// Something observable that happened during a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayEntry {
    pub at: Duration,
    pub label: String,
    pub from: NockState,
    pub to: NockState,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub entries: Vec<ReplayEntry>,
    pub final_state: NockState,
    /// Synthetic states still asserted when the script ended.
    pub asserted: usize,
    pub feedback_events: usize,
}

/// Run `scenario` against a fresh simulated world.
pub fn replay(
    scenario: &Scenario,
    settings: NockSettings,
    source: Option<Box<dyn SettingsSource>>,
) -> ReplayReport {
    let settings = scenario.settings.clone().unwrap_or(settings);

    let world = SimWorld::new();
    world.set_equipped(settings.bow_hand(), Some(WeaponKind::Bow));
    world.set_arrow_hand_pose(hand_pose(START_DISTANCE, 0.0));
    let input = SimInputBackend::new();
    let mut fx = SimFeedbackSink::new();
    if let Some(sound) = settings.blocked_sound_id() {
        fx = fx.with_sound(sound);
    }
    let clock = ManualClock::new();

    let mut ctx = ArrowNockContext::new(
        settings,
        Box::new(world.clone()),
        Box::new(input.clone()),
        Box::new(fx.clone()),
        Arc::new(clock.clone()),
    );
    if let Some(source) = source {
        ctx = ctx.with_settings_source(source);
    }

    info!(name = %scenario.name, steps = scenario.steps.len(), "replay started");
    let mut entries = Vec::new();
    let frame = Duration::from_millis(scenario.frame_ms);

    for step in &scenario.steps {
        clock.advance(Duration::from_millis(step.after_ms));
        let label = step.action.label();
        // Steps that neither moved the machine nor issued commands are noise.
        let mut record = |t: Option<Transition>| {
            if let Some(t) = t
                && (t.changed() || !t.commands.is_empty())
            {
                entries.push(ReplayEntry {
                    at: clock.now(),
                    label: label.clone(),
                    from: t.from,
                    to: t.to(),
                    commands: t.commands,
                });
            }
        };

        match &step.action {
            Action::Equip { item } | Action::Unequip { item } => {
                let equipped = matches!(step.action, Action::Equip { .. });
                record(ctx.on_equip(&EquipEvent {
                    actor_id: PLAYER_ID,
                    item_form_id: item.form_id(),
                    equipped,
                }));
            }
            Action::Press { button } | Action::Release { button } => {
                let down = matches!(step.action, Action::Press { .. });
                let hand = ctx.settings().arrow_hand();
                input.set_pressed(hand, *button, down);
                record(ctx.on_button(&ButtonEvent {
                    hand,
                    button: *button,
                    channel: ActionChannel::Press,
                    state: if down { ButtonState::Down } else { ButtonState::Up },
                }));
            }
            Action::Hands { distance, pitch } => {
                world.set_arrow_hand_pose(hand_pose(*distance, *pitch));
            }
            Action::Stamina { current, max } => {
                world.set_stamina(Some(ResourceValue {
                    current: *current,
                    max: *max,
                }));
            }
            Action::Wield { hand, weapon } => world.set_equipped(*hand, *weapon),
            Action::Pause { paused } => world.set_paused(*paused),
            Action::Menu { name, opening } => record(ctx.on_menu(&MenuEvent {
                menu_name: name.clone(),
                opening: *opening,
            })),
            Action::Load => record(Some(ctx.on_game_load())),
            Action::Tick { count } => {
                for _ in 0..*count {
                    clock.advance(frame);
                    record(Some(ctx.tick()));
                }
            }
        }
    }

    ReplayReport {
        entries,
        final_state: ctx.state(),
        asserted: ctx.asserted_count(),
        feedback_events: fx.records().len(),
    }
}

fn hand_pose(distance: f32, pitch: f32) -> Transform3D {
    Transform3D::new(
        Vec3::new(distance, 0.0, 0.0),
        Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), pitch),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRIP_NOCK: &str = r#"
name = "grip nock"
frame_ms = 10

[settings]
frames_between_attempts = 2

[[step]]
action = "press"
button = "grip"

[[step]]
action = "equip"
item = "arrow"

[[step]]
action = "hands"
distance = 0.0

[[step]]
action = "tick"
count = 3

[[step]]
action = "hands"
distance = 0.0
pitch = 0.6

[[step]]
action = "tick"

[[step]]
action = "release"
button = "grip"
"#;

    #[test]
    fn parses_steps_and_defaults() {
        let s = parse(GRIP_NOCK).expect("valid scenario");
        assert_eq!(s.name, "grip nock");
        assert_eq!(s.steps.len(), 7);
        assert!(matches!(s.steps[3].action, Action::Tick { count: 3 }));
        assert!(matches!(s.steps[5].action, Action::Tick { count: 1 }));
        assert_eq!(s.settings.map(|s| s.frames_between_attempts), Some(2));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let raw = "[[step]]\naction = \"teleport\"\n";
        assert!(matches!(parse(raw), Err(NockError::Config(_))));
    }

    #[test]
    fn grip_nock_replays_to_idle_with_nothing_asserted() {
        let s = parse(GRIP_NOCK).expect("valid scenario");
        let report = replay(&s, NockSettings::default(), None);

        let states: Vec<NockState> = report.entries.iter().map(|e| e.to).collect();
        assert_eq!(states.first(), Some(&NockState::ArrowHeld));
        assert!(states.contains(&NockState::TryingToNock));
        assert!(states.contains(&NockState::ArrowNocked));
        assert_eq!(report.final_state, NockState::Idle);
        assert_eq!(report.asserted, 0);
    }

    #[test]
    fn exhausted_replay_reports_feedback() {
        let raw = r#"
[settings]
stamina_threshold = 0.5

[[step]]
action = "stamina"
current = 10.0
max = 100.0

[[step]]
action = "press"
button = "trigger"

[[step]]
action = "equip"
item = "arrow"

[[step]]
action = "hands"
distance = 1.0

[[step]]
action = "tick"
count = 5
"#;
        let report = replay(&parse(raw).expect("valid"), NockSettings::default(), None);
        assert_eq!(report.final_state, NockState::ArrowHeld);
        assert!(report.feedback_events >= 1);
        assert!(
            report
                .entries
                .iter()
                .any(|e| e.commands.contains(&Command::TriggerFeedback))
        );
    }

    #[test]
    fn bolts_are_ignored() {
        let raw = r#"
[[step]]
action = "press"
button = "trigger"

[[step]]
action = "equip"
item = "bolt"
"#;
        let report = replay(&parse(raw).expect("valid"), NockSettings::default(), None);
        assert!(report.entries.is_empty());
        assert_eq!(report.final_state, NockState::Idle);
    }

    #[test]
    fn menu_reload_that_rebinds_is_recorded() {
        struct Rebind;
        impl SettingsSource for Rebind {
            fn poll(&mut self) -> Option<NockSettings> {
                None
            }
            fn reload(&mut self) -> Option<NockSettings> {
                Some(NockSettings {
                    fire_button: ButtonId::A,
                    ..NockSettings::default()
                })
            }
        }

        let raw = r#"
[[step]]
action = "press"
button = "grip"

[[step]]
action = "equip"
item = "arrow"

[[step]]
action = "menu"
name = "Mod Configuration Menu"
opening = false
"#;
        let report = replay(
            &parse(raw).expect("valid"),
            NockSettings::default(),
            Some(Box::new(Rebind)),
        );
        let last = report.entries.last().expect("menu reset recorded");
        assert_eq!(last.label, "menu Mod Configuration Menu close");
        assert_eq!((last.from, last.to), (NockState::ArrowHeld, NockState::Idle));
        assert_eq!(last.commands, vec![Command::ClearAll]);
    }
}
