//! The arrow-nock state machine as a pure transition function.
//!
//! [`transition`] maps the current [`Machine`] plus one [`Input`] to the next
//! [`Machine`] and the side effects ([`Command`]s) the caller must perform.
//! Nothing here touches the input layer, the clock, or the scene: sensor
//! readings arrive pre-sampled inside the input, and time arrives as `now`.
//!
//! | From | Input | Condition | To |
//! |---|---|---|---|
//! | Idle | `ArrowEquipped` | enabled, a candidate button held | ArrowHeld |
//! | Idle | `ButtonDown(tracked)` | within grace period | ArrowHeld |
//! | Idle | `ButtonDown(tracked)` | grace expired | Idle (tracked cleared) |
//! | any | `Unequipped` | – | Idle |
//! | ArrowHeld / TryingToNock | `ButtonUp(tracked)` | – | Idle (release recorded) |
//! | ArrowNocked | `ButtonUp(tracked)` | – | Idle (tracked cleared) |
//! | ArrowHeld | `Tick` | overlap, stamina ok, not latched | TryingToNock |
//! | ArrowHeld | `Tick` | overlap, stamina low | ArrowHeld + feedback |
//! | TryingToNock | `Tick` | angle past threshold | ArrowNocked |
//! | TryingToNock | `Tick` | no overlap | ArrowHeld |
//! | TryingToNock | `Tick` | pacing interval reached | TryingToNock (toggle) |
//!
//! Every entry into Idle carries [`Command::ClearAll`].

use std::time::Duration;

use nockvr_perception::{Vec3, is_nocked};
use nockvr_types::{ButtonId, InputAddress, NockError, NockSettings};
use tracing::warn;

/// The four phases of a nock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NockState {
    #[default]
    Idle,
    ArrowHeld,
    TryingToNock,
    ArrowNocked,
}

impl NockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NockState::Idle => "idle",
            NockState::ArrowHeld => "arrow_held",
            NockState::TryingToNock => "trying_to_nock",
            NockState::ArrowNocked => "arrow_nocked",
        }
    }
}

impl std::fmt::Display for NockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the machine remembers between inputs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Machine {
    pub state: NockState,
    /// The button holding the current arrow.
    pub tracked_button: Option<ButtonId>,
    /// Bow/hand Euler angles captured at equip.
    pub baseline_angle: Vec3,
    /// When the tracked button was last released without a nocked arrow.
    pub last_release: Option<Duration>,
    /// Whether the toggling retry currently holds the fire button down.
    pub fake_button_down: bool,
    /// Ticks since the attempt started or last toggled.
    pub attempt_frames: u32,
    /// Stamina veto latched until the hands separate.
    pub stamina_blocked: bool,
}

/// Pre-sampled sensor values for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReading {
    pub overlapping: bool,
    pub has_stamina: bool,
    /// Current bow/hand angle; only sampled while an attempt is running.
    pub angle: Option<Vec3>,
}

/// One thing that happened to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    /// An arrow was equipped with a bow in the other hand.  `held_button` is
    /// the first candidate found pressed, `angle` the bow/hand angle sampled
    /// at that instant.
    ArrowEquipped {
        held_button: Option<ButtonId>,
        angle: Vec3,
    },
    /// The arrow or the bow was unequipped.
    Unequipped,
    ButtonDown(ButtonId),
    ButtonUp(ButtonId),
    Tick(TickReading),
    /// A save was loaded; all state is discontinuous.
    GameLoaded,
    /// Hand mode, button mapping, or the master switch changed.
    Reconfigured,
}

/// A side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetDown(InputAddress),
    ClearDown(InputAddress),
    ClearAll,
    SendMomentary(InputAddress),
    TriggerFeedback,
}

/// Result of one [`transition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: NockState,
    pub next: Machine,
    pub commands: Vec<Command>,
}

impl Transition {
    pub fn to(&self) -> NockState {
        self.next.state
    }

    pub fn changed(&self) -> bool {
        self.from != self.next.state
    }
}

/// Compute the successor of `machine` for `input` at time `now`.
pub fn transition(
    machine: &Machine,
    input: &Input,
    settings: &NockSettings,
    now: Duration,
) -> Transition {
    let mut next = machine.clone();
    let mut commands = Vec::new();

    if machine.state != NockState::Idle && machine.tracked_button.is_none() {
        let violation = NockError::InvariantViolation(format!(
            "{} without a tracked button",
            machine.state
        ));
        warn!(error = %violation, "state desync, forcing idle");
        reset(&mut next, &mut commands);
        return Transition {
            from: machine.state,
            next,
            commands,
        };
    }

    let fire = InputAddress::press(settings.arrow_hand(), settings.fire_button);
    let holds_fire = machine.tracked_button != Some(settings.fire_button);

    match (machine.state, *input) {
        (_, Input::GameLoaded | Input::Reconfigured) => reset(&mut next, &mut commands),

        (NockState::Idle, Input::ArrowEquipped { held_button, angle }) => {
            match held_button {
                Some(button) if settings.enabled => {
                    next = Machine {
                        state: NockState::ArrowHeld,
                        tracked_button: Some(button),
                        baseline_angle: angle,
                        ..Machine::default()
                    };
                }
                _ => {
                    next.tracked_button = None;
                    next.last_release = None;
                }
            }
        }
        (_, Input::ArrowEquipped { .. }) => {}

        (NockState::Idle, Input::Unequipped) => {
            next.tracked_button = None;
            next.last_release = None;
        }
        (_, Input::Unequipped) => reset(&mut next, &mut commands),

        (NockState::Idle, Input::ButtonDown(b)) if machine.tracked_button == Some(b) => {
            let within_grace = machine
                .last_release
                .is_some_and(|t| now.saturating_sub(t) < settings.grace_period());
            if within_grace && settings.enabled {
                next.state = NockState::ArrowHeld;
                next.last_release = None;
                next.stamina_blocked = false;
            } else {
                next.tracked_button = None;
                next.last_release = None;
            }
        }

        (
            NockState::ArrowHeld | NockState::TryingToNock,
            Input::ButtonUp(b),
        ) if machine.tracked_button == Some(b) => {
            to_idle(&mut next, &mut commands);
            next.last_release = Some(now);
        }
        (NockState::ArrowNocked, Input::ButtonUp(b)) if machine.tracked_button == Some(b) => {
            reset(&mut next, &mut commands);
        }

        (NockState::Idle, Input::Tick(_)) => {
            let expired = machine
                .last_release
                .is_none_or(|t| now.saturating_sub(t) >= settings.grace_period());
            if machine.tracked_button.is_some() && expired {
                next.tracked_button = None;
                next.last_release = None;
            }
        }

        (NockState::ArrowHeld, Input::Tick(reading)) => {
            if !reading.overlapping {
                next.stamina_blocked = false;
            } else if !reading.has_stamina {
                commands.push(Command::TriggerFeedback);
                if !settings.stamina_auto_recover {
                    next.stamina_blocked = true;
                }
            } else if machine.stamina_blocked && !settings.stamina_auto_recover {
                // waiting for the hands to separate
            } else {
                next.state = NockState::TryingToNock;
                next.stamina_blocked = false;
                next.attempt_frames = 0;
                if holds_fire {
                    commands.push(Command::SetDown(fire));
                    next.fake_button_down = true;
                } else {
                    commands.push(Command::SendMomentary(fire));
                    next.fake_button_down = false;
                }
            }
        }

        (NockState::TryingToNock, Input::Tick(reading)) => {
            let nocked = reading.angle.is_some_and(|angle| {
                is_nocked(
                    machine.baseline_angle,
                    angle,
                    settings.nock_angle_threshold_rad,
                )
            });
            if nocked {
                next.state = NockState::ArrowNocked;
                next.attempt_frames = 0;
                if holds_fire && !machine.fake_button_down {
                    commands.push(Command::SetDown(fire));
                    next.fake_button_down = true;
                }
            } else if !reading.overlapping {
                next.state = NockState::ArrowHeld;
                next.attempt_frames = 0;
                if machine.fake_button_down {
                    commands.push(Command::ClearDown(fire));
                }
                next.fake_button_down = false;
            } else if holds_fire {
                next.attempt_frames = machine.attempt_frames.saturating_add(1);
                if next.attempt_frames >= settings.frames_between_attempts {
                    next.attempt_frames = 0;
                    next.fake_button_down = !machine.fake_button_down;
                    commands.push(if machine.fake_button_down {
                        Command::ClearDown(fire)
                    } else {
                        Command::SetDown(fire)
                    });
                }
            }
        }

        _ => {}
    }

    Transition {
        from: machine.state,
        next,
        commands,
    }
}

/// Enter Idle keeping the tracked button and baseline for grace re-entry.
fn to_idle(next: &mut Machine, commands: &mut Vec<Command>) {
    next.state = NockState::Idle;
    next.fake_button_down = false;
    next.attempt_frames = 0;
    next.stamina_blocked = false;
    commands.push(Command::ClearAll);
}

/// Enter Idle forgetting the arrow entirely.
fn reset(next: &mut Machine, commands: &mut Vec<Command>) {
    *next = Machine::default();
    commands.push(Command::ClearAll);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nockvr_types::Hand;

    const MS: fn(u64) -> Duration = Duration::from_millis;

    fn settings() -> NockSettings {
        NockSettings {
            grace_period_ms: 300,
            frames_between_attempts: 3,
            nock_angle_threshold_rad: 0.35,
            ..NockSettings::default()
        }
    }

    fn fire() -> InputAddress {
        InputAddress::press(Hand::Right, ButtonId::Trigger)
    }

    fn step(m: &Machine, input: Input, now: Duration) -> Transition {
        transition(m, &input, &settings(), now)
    }

    fn held(button: ButtonId) -> Machine {
        step(
            &Machine::default(),
            Input::ArrowEquipped {
                held_button: Some(button),
                angle: Vec3::new(0.1, 0.0, 0.0),
            },
            MS(0),
        )
        .next
    }

    fn tick(overlapping: bool, has_stamina: bool, angle: Option<Vec3>) -> Input {
        Input::Tick(TickReading {
            overlapping,
            has_stamina,
            angle,
        })
    }

    #[test]
    fn equip_with_button_captures_baseline() {
        let m = held(ButtonId::Grip);
        assert_eq!(m.state, NockState::ArrowHeld);
        assert_eq!(m.tracked_button, Some(ButtonId::Grip));
        assert_eq!(m.baseline_angle, Vec3::new(0.1, 0.0, 0.0));
    }

    #[test]
    fn equip_without_button_stays_idle() {
        let t = step(
            &Machine::default(),
            Input::ArrowEquipped {
                held_button: None,
                angle: Vec3::zero(),
            },
            MS(0),
        );
        assert_eq!(t.to(), NockState::Idle);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn equip_ignored_when_disabled() {
        let s = NockSettings {
            enabled: false,
            ..settings()
        };
        let t = transition(
            &Machine::default(),
            &Input::ArrowEquipped {
                held_button: Some(ButtonId::Trigger),
                angle: Vec3::zero(),
            },
            &s,
            MS(0),
        );
        assert_eq!(t.to(), NockState::Idle);
    }

    #[test]
    fn second_equip_does_not_recapture_baseline() {
        let m = held(ButtonId::Grip);
        let t = step(
            &m,
            Input::ArrowEquipped {
                held_button: Some(ButtonId::Trigger),
                angle: Vec3::new(2.0, 2.0, 2.0),
            },
            MS(5),
        );
        assert_eq!(t.next, m);
    }

    #[test]
    fn stamina_ok_overlap_starts_attempt_with_hold() {
        let m = held(ButtonId::Grip);
        let t = step(&m, tick(true, true, None), MS(10));
        assert_eq!(t.to(), NockState::TryingToNock);
        assert_eq!(t.commands, vec![Command::SetDown(fire())]);
        assert!(t.next.fake_button_down);
    }

    #[test]
    fn same_button_as_fire_sends_single_momentary() {
        let m = held(ButtonId::Trigger);
        let t = step(&m, tick(true, true, None), MS(10));
        assert_eq!(t.commands, vec![Command::SendMomentary(fire())]);

        // No toggling afterwards, however long the attempt runs.
        let mut m = t.next;
        for frame in 0..10 {
            let t = step(&m, tick(true, true, Some(Vec3::new(0.1, 0.0, 0.0))), MS(20 + frame));
            assert!(t.commands.is_empty());
            m = t.next;
        }
        assert_eq!(m.state, NockState::TryingToNock);
    }

    #[test]
    fn attempt_toggles_every_interval() {
        let mut m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        let baseline = Some(Vec3::new(0.1, 0.0, 0.0));
        let mut emitted = Vec::new();
        for frame in 0..6 {
            let t = step(&m, tick(true, true, baseline), MS(20 + frame));
            emitted.extend(t.commands);
            m = t.next;
        }
        assert_eq!(
            emitted,
            vec![Command::ClearDown(fire()), Command::SetDown(fire())]
        );
        assert!(m.fake_button_down);
    }

    #[test]
    fn angle_past_threshold_confirms_nock() {
        let m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        let t = step(&m, tick(true, true, Some(Vec3::new(0.1, 0.5, 0.0))), MS(20));
        assert_eq!(t.to(), NockState::ArrowNocked);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn nock_confirmed_mid_toggle_reasserts_hold() {
        let mut m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        m.fake_button_down = false;
        let t = step(&m, tick(true, true, Some(Vec3::new(1.0, 0.0, 0.0))), MS(20));
        assert_eq!(t.to(), NockState::ArrowNocked);
        assert_eq!(t.commands, vec![Command::SetDown(fire())]);
    }

    #[test]
    fn losing_overlap_returns_to_held_and_releases_fire() {
        let m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        let t = step(&m, tick(false, true, Some(Vec3::new(0.1, 0.0, 0.0))), MS(20));
        assert_eq!(t.to(), NockState::ArrowHeld);
        assert_eq!(t.commands, vec![Command::ClearDown(fire())]);
        assert!(!t.next.fake_button_down);
    }

    #[test]
    fn low_stamina_triggers_feedback_and_stays_held() {
        let m = held(ButtonId::Grip);
        let t = step(&m, tick(true, false, None), MS(10));
        assert_eq!(t.to(), NockState::ArrowHeld);
        assert_eq!(t.commands, vec![Command::TriggerFeedback]);
        assert!(!t.next.stamina_blocked);
    }

    #[test]
    fn latched_block_waits_for_overlap_exit() {
        let s = NockSettings {
            stamina_auto_recover: false,
            ..settings()
        };
        let m = held(ButtonId::Grip);
        let m = transition(&m, &tick(true, false, None), &s, MS(10)).next;
        assert!(m.stamina_blocked);

        // Stamina back but hands never separated: still blocked.
        let t = transition(&m, &tick(true, true, None), &s, MS(20));
        assert_eq!(t.to(), NockState::ArrowHeld);
        assert!(t.commands.is_empty());

        // Separate, then come back together.
        let m = transition(&t.next, &tick(false, true, None), &s, MS(30)).next;
        assert!(!m.stamina_blocked);
        let t = transition(&m, &tick(true, true, None), &s, MS(40));
        assert_eq!(t.to(), NockState::TryingToNock);
    }

    #[test]
    fn auto_recover_nocks_as_soon_as_stamina_returns() {
        let m = held(ButtonId::Grip);
        let m = step(&m, tick(true, false, None), MS(10)).next;
        let t = step(&m, tick(true, true, None), MS(20));
        assert_eq!(t.to(), NockState::TryingToNock);
    }

    #[test]
    fn release_from_held_records_timestamp_and_keeps_button() {
        let m = held(ButtonId::Grip);
        let t = step(&m, Input::ButtonUp(ButtonId::Grip), MS(100));
        assert_eq!(t.to(), NockState::Idle);
        assert_eq!(t.commands, vec![Command::ClearAll]);
        assert_eq!(t.next.tracked_button, Some(ButtonId::Grip));
        assert_eq!(t.next.last_release, Some(MS(100)));
    }

    #[test]
    fn repress_within_grace_resumes_without_recapture() {
        let m = held(ButtonId::Grip);
        let idle = step(&m, Input::ButtonUp(ButtonId::Grip), MS(100)).next;
        let t = step(&idle, Input::ButtonDown(ButtonId::Grip), MS(399));
        assert_eq!(t.to(), NockState::ArrowHeld);
        assert_eq!(t.next.baseline_angle, m.baseline_angle);
    }

    #[test]
    fn repress_after_grace_clears_tracked_button() {
        let m = held(ButtonId::Grip);
        let idle = step(&m, Input::ButtonUp(ButtonId::Grip), MS(100)).next;
        let t = step(&idle, Input::ButtonDown(ButtonId::Grip), MS(400));
        assert_eq!(t.to(), NockState::Idle);
        assert_eq!(t.next.tracked_button, None);
    }

    #[test]
    fn double_button_down_is_idempotent() {
        let m = held(ButtonId::Grip);
        let idle = step(&m, Input::ButtonUp(ButtonId::Grip), MS(100)).next;
        let first = step(&idle, Input::ButtonDown(ButtonId::Grip), MS(150)).next;
        let second = step(&first, Input::ButtonDown(ButtonId::Grip), MS(151)).next;
        assert_eq!(first, second);
    }

    #[test]
    fn double_button_up_keeps_first_release_time() {
        let m = held(ButtonId::Grip);
        let idle = step(&m, Input::ButtonUp(ButtonId::Grip), MS(100)).next;
        let t = step(&idle, Input::ButtonUp(ButtonId::Grip), MS(150));
        assert_eq!(t.next.last_release, Some(MS(100)));
        assert!(t.commands.is_empty());
    }

    #[test]
    fn release_while_nocked_forgets_arrow() {
        let m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        let nocked = step(&m, tick(true, true, Some(Vec3::new(2.0, 0.0, 0.0))), MS(20)).next;
        let t = step(&nocked, Input::ButtonUp(ButtonId::Grip), MS(30));
        assert_eq!(t.to(), NockState::Idle);
        assert_eq!(t.commands, vec![Command::ClearAll]);
        assert_eq!(t.next.tracked_button, None);

        let t = step(&t.next, Input::ButtonDown(ButtonId::Grip), MS(40));
        assert_eq!(t.to(), NockState::Idle);
    }

    #[test]
    fn release_while_trying_clears_all() {
        let m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        let t = step(&m, Input::ButtonUp(ButtonId::Grip), MS(30));
        assert_eq!(t.to(), NockState::Idle);
        assert_eq!(t.commands, vec![Command::ClearAll]);
        assert_eq!(t.next.tracked_button, Some(ButtonId::Grip));
    }

    #[test]
    fn untracked_buttons_are_ignored() {
        let m = held(ButtonId::Grip);
        let t = step(&m, Input::ButtonUp(ButtonId::A), MS(10));
        assert_eq!(t.next, m);
        assert!(t.commands.is_empty());
    }

    #[test]
    fn unequip_wins_over_running_attempt() {
        let m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        let t = step(&m, Input::Unequipped, MS(20));
        assert_eq!(t.to(), NockState::Idle);
        assert_eq!(t.commands, vec![Command::ClearAll]);
        assert_eq!(t.next.tracked_button, None);
    }

    #[test]
    fn idle_tick_expires_stale_tracked_button() {
        let m = held(ButtonId::Grip);
        let idle = step(&m, Input::ButtonUp(ButtonId::Grip), MS(100)).next;
        let still = step(&idle, tick(false, true, None), MS(200)).next;
        assert_eq!(still.tracked_button, Some(ButtonId::Grip));
        let expired = step(&still, tick(false, true, None), MS(400)).next;
        assert_eq!(expired.tracked_button, None);
    }

    #[test]
    fn desynced_state_is_forced_idle() {
        let broken = Machine {
            state: NockState::TryingToNock,
            tracked_button: None,
            fake_button_down: true,
            ..Machine::default()
        };
        let t = step(&broken, tick(true, true, None), MS(0));
        assert_eq!(t.next, Machine::default());
        assert_eq!(t.commands, vec![Command::ClearAll]);
    }

    #[test]
    fn game_load_resets_everything() {
        let m = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        let t = step(&m, Input::GameLoaded, MS(20));
        assert_eq!(t.next, Machine::default());
        assert_eq!(t.commands, vec![Command::ClearAll]);
    }

    #[test]
    fn every_idle_entry_clears_synthetic_state() {
        let entries = [
            Input::ButtonUp(ButtonId::Grip),
            Input::Unequipped,
            Input::GameLoaded,
            Input::Reconfigured,
        ];
        let trying = step(&held(ButtonId::Grip), tick(true, true, None), MS(10)).next;
        for from in [held(ButtonId::Grip), trying] {
            for input in entries {
                let t = step(&from, input, MS(50));
                assert_eq!(t.to(), NockState::Idle, "{input:?}");
                assert!(t.commands.contains(&Command::ClearAll), "{input:?}");
            }
        }
    }
}
