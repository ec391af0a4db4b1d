//! `nockvr-types` – vocabulary shared by every NockVR crate.
//!
//! Controller identifiers, the external events the state machine consumes,
//! the [`NockSettings`] configuration surface, the injectable [`Clock`], and
//! the workspace-wide [`NockError`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod clock;
pub mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use settings::NockSettings;

/// A tracked VR controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// The other controller.
    pub fn opposite(self) -> Self {
        match self {
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Left,
        }
    }
}

impl std::fmt::Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hand::Left => write!(f, "left"),
            Hand::Right => write!(f, "right"),
        }
    }
}

/// Controller buttons the nocking logic can track or spoof.
///
/// Discriminants follow the OpenVR `EVRButtonId` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ButtonId {
    /// Knuckles "B" / application menu button.
    B = 1,
    Grip = 2,
    A = 7,
    Touchpad = 32,
    Trigger = 33,
}

/// Whether an input refers to a physical press or a capacitive touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionChannel {
    Press,
    Touch,
}

/// Edge or level of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    Down,
    Up,
}

/// Address of one synthetic input slot: (hand, button, channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputAddress {
    pub hand: Hand,
    pub button: ButtonId,
    pub channel: ActionChannel,
}

impl InputAddress {
    /// A press-channel address, the only channel the nocking logic spoofs.
    pub fn press(hand: Hand, button: ButtonId) -> Self {
        Self {
            hand,
            button,
            channel: ActionChannel::Press,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// External events
// ────────────────────────────────────────────────────────────────────────────

/// An item was equipped or unequipped on some actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipEvent {
    pub actor_id: u32,
    pub item_form_id: u32,
    pub equipped: bool,
}

/// A real controller button changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub hand: Hand,
    pub button: ButtonId,
    pub channel: ActionChannel,
    pub state: ButtonState,
}

/// A game menu opened or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEvent {
    pub menu_name: String,
    pub opening: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// World query results
// ────────────────────────────────────────────────────────────────────────────

/// Coarse classification of an equipped weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    Bow,
    Crossbow,
    Other,
}

/// Ammunition families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmmoKind {
    Arrow,
    Bolt,
}

/// What an equippable form turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Weapon(WeaponKind),
    Ammo(AmmoKind),
}

/// A current/maximum actor resource such as stamina.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceValue {
    pub current: f32,
    pub max: f32,
}

impl ResourceValue {
    /// `current / max`, or `0.0` when the maximum is not positive.
    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Errors surfaced by NockVR components.  None of them is fatal; callers log
/// and degrade.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NockError {
    #[error("Anchor unavailable: {0}")]
    AnchorUnavailable(String),

    #[error("Unresolved {channel} resource: {id}")]
    ResourceUnresolved { channel: String, id: String },

    #[error("Input layer rejected {address:?}: {details}")]
    InputRejected {
        address: InputAddress,
        details: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}
