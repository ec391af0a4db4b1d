//! [`NockSettings`] – the complete, immutable-between-reloads configuration
//! surface of the nocking logic.
//!
//! Every field has a serde default so partial files load cleanly.  Values
//! coming from disk should be passed through [`NockSettings::sanitized`]
//! before use.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{ButtonId, Hand};

/// Candidate buttons, least to most accident-prone.
pub const DEFAULT_BUTTON_PRIORITY: [ButtonId; 5] = [
    ButtonId::Trigger,
    ButtonId::A,
    ButtonId::B,
    ButtonId::Touchpad,
    ButtonId::Grip,
];

/// Runtime configuration for one nocking context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NockSettings {
    /// Master switch for automatic nocking.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Arrows are drawn with the left hand and the bow is held in the right.
    #[serde(default)]
    pub left_hand_mode: bool,

    /// The button the game treats as "fire / nock".
    #[serde(default = "default_fire_button")]
    pub fire_button: ButtonId,

    /// Raise log verbosity to `debug`.
    #[serde(default)]
    pub debug_print: bool,

    /// Window after releasing the tracked button during which a re-press
    /// resumes the held-arrow state.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Distance between the off-hand and bow anchors below which the hands
    /// are considered together.
    #[serde(default = "default_overlap_radius")]
    pub overlap_radius: f32,

    /// Euclidean norm of the Euler-angle deviation (radians) from the
    /// equip-time baseline that confirms a nock.
    #[serde(default = "default_angle_threshold")]
    pub nock_angle_threshold_rad: f32,

    /// Ticks between synthetic press/release toggles while trying to nock.
    #[serde(default = "default_frames_between_attempts")]
    pub frames_between_attempts: u32,

    /// `<= 0` disables the gate, `(0, 1)` is a fraction of max stamina,
    /// `>= 1` is an absolute stamina value.
    #[serde(default)]
    pub stamina_threshold: f32,

    /// Allow nocking as soon as stamina recovers instead of waiting for the
    /// hands to separate first.
    #[serde(default = "default_true")]
    pub stamina_auto_recover: bool,

    /// Scale of the blocked-action vibration, `0` disables it.
    #[serde(default = "default_haptic_strength")]
    pub haptic_strength: f32,

    /// Index into the fixed visual-effect table, `0` disables it.
    #[serde(default)]
    pub visual_effect: u8,

    /// Sound played when nocking is blocked.  Empty or `"none"` disables it.
    #[serde(default)]
    pub blocked_sound: String,

    /// Order in which held buttons are considered when an arrow is equipped.
    #[serde(default = "default_button_priority")]
    pub button_priority: Vec<ButtonId>,
}

fn default_true() -> bool {
    true
}
fn default_fire_button() -> ButtonId {
    ButtonId::Trigger
}
fn default_grace_period_ms() -> u64 {
    300
}
fn default_overlap_radius() -> f32 {
    10.0
}
fn default_angle_threshold() -> f32 {
    0.35
}
fn default_frames_between_attempts() -> u32 {
    6
}
fn default_haptic_strength() -> f32 {
    0.5
}
fn default_button_priority() -> Vec<ButtonId> {
    DEFAULT_BUTTON_PRIORITY.to_vec()
}

impl Default for NockSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            left_hand_mode: false,
            fire_button: default_fire_button(),
            debug_print: false,
            grace_period_ms: default_grace_period_ms(),
            overlap_radius: default_overlap_radius(),
            nock_angle_threshold_rad: default_angle_threshold(),
            frames_between_attempts: default_frames_between_attempts(),
            stamina_threshold: 0.0,
            stamina_auto_recover: true,
            haptic_strength: default_haptic_strength(),
            visual_effect: 0,
            blocked_sound: String::new(),
            button_priority: default_button_priority(),
        }
    }
}

impl NockSettings {
    /// The hand that draws and nocks the arrow.
    pub fn arrow_hand(&self) -> Hand {
        if self.left_hand_mode {
            Hand::Left
        } else {
            Hand::Right
        }
    }

    /// The hand holding the bow.
    pub fn bow_hand(&self) -> Hand {
        self.arrow_hand().opposite()
    }

    pub fn overlap_radius_sq(&self) -> f32 {
        self.overlap_radius * self.overlap_radius
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// The configured blocked sound, unless disabled.
    pub fn blocked_sound_id(&self) -> Option<&str> {
        let id = self.blocked_sound.trim();
        if id.is_empty() || id.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(id)
        }
    }

    /// Clamp out-of-range values into something the state machine can run
    /// with.  Non-finite floats fall back to their defaults.
    pub fn sanitized(mut self) -> Self {
        self.overlap_radius = finite_or(self.overlap_radius, default_overlap_radius()).abs();
        self.nock_angle_threshold_rad =
            finite_or(self.nock_angle_threshold_rad, default_angle_threshold()).abs();
        self.stamina_threshold = finite_or(self.stamina_threshold, 0.0);
        self.haptic_strength =
            finite_or(self.haptic_strength, default_haptic_strength()).clamp(0.0, 1.0);
        self.frames_between_attempts = self.frames_between_attempts.max(1);

        let mut seen = Vec::with_capacity(self.button_priority.len());
        for button in self.button_priority.drain(..) {
            if !seen.contains(&button) {
                seen.push(button);
            }
        }
        self.button_priority = if seen.is_empty() {
            default_button_priority()
        } else {
            seen
        };
        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_serde_defaults() {
        let from_empty: NockSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(from_empty, NockSettings::default());
    }

    #[test]
    fn hands_follow_left_hand_mode() {
        let mut s = NockSettings::default();
        assert_eq!(s.arrow_hand(), Hand::Right);
        assert_eq!(s.bow_hand(), Hand::Left);
        s.left_hand_mode = true;
        assert_eq!(s.arrow_hand(), Hand::Left);
        assert_eq!(s.bow_hand(), Hand::Right);
    }

    #[test]
    fn blocked_sound_none_disables() {
        let mut s = NockSettings::default();
        assert_eq!(s.blocked_sound_id(), None);
        s.blocked_sound = "NONE".to_string();
        assert_eq!(s.blocked_sound_id(), None);
        s.blocked_sound = " UIMenuCancel ".to_string();
        assert_eq!(s.blocked_sound_id(), Some("UIMenuCancel"));
    }

    #[test]
    fn sanitized_clamps_and_dedupes() {
        let s = NockSettings {
            overlap_radius: -4.0,
            nock_angle_threshold_rad: f32::NAN,
            haptic_strength: 3.0,
            frames_between_attempts: 0,
            button_priority: vec![ButtonId::Grip, ButtonId::Grip, ButtonId::A],
            ..NockSettings::default()
        }
        .sanitized();

        assert_eq!(s.overlap_radius, 4.0);
        assert_eq!(s.overlap_radius_sq(), 16.0);
        assert_eq!(s.nock_angle_threshold_rad, 0.35);
        assert_eq!(s.haptic_strength, 1.0);
        assert_eq!(s.frames_between_attempts, 1);
        assert_eq!(s.button_priority, vec![ButtonId::Grip, ButtonId::A]);
    }

    #[test]
    fn sanitized_restores_empty_priority() {
        let s = NockSettings {
            button_priority: Vec::new(),
            ..NockSettings::default()
        }
        .sanitized();
        assert_eq!(s.button_priority, DEFAULT_BUTTON_PRIORITY.to_vec());
    }

    #[test]
    fn grace_period_is_millis() {
        let s = NockSettings {
            grace_period_ms: 250,
            ..NockSettings::default()
        };
        assert_eq!(s.grace_period(), Duration::from_millis(250));
    }
}
