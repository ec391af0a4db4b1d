//! [`StaminaGate`] – vetoes automatic nocking when the player is exhausted.
//!
//! A single configured threshold selects the policy:
//!
//! | Threshold | Policy |
//! |---|---|
//! | `<= 0` | disabled, always passes |
//! | `(0, 1)` | stamina as a fraction of maximum must exceed it |
//! | `>= 1` | absolute stamina must exceed it |
//!
//! Comparisons are strict: stamina exactly at the threshold fails.
//!
//! # Example
//!
//! ```
//! use nockvr_kernel::StaminaGate;
//! use nockvr_types::ResourceValue;
//!
//! let gate = StaminaGate::new(0.5);
//! let tired = ResourceValue { current: 40.0, max: 100.0 };
//! assert!(!gate.has_stamina(Some(tired)));
//!
//! let gate = StaminaGate::new(50.0);
//! let fresh = ResourceValue { current: 60.0, max: 200.0 };
//! assert!(gate.has_stamina(Some(fresh)));
//! ```

use nockvr_types::ResourceValue;
use tracing::trace;

/// How the configured threshold is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaminaMode {
    Disabled,
    Fraction(f32),
    Absolute(f32),
}

impl StaminaMode {
    pub fn from_threshold(threshold: f32) -> Self {
        if threshold.is_nan() || threshold <= 0.0 {
            StaminaMode::Disabled
        } else if threshold < 1.0 {
            StaminaMode::Fraction(threshold)
        } else {
            StaminaMode::Absolute(threshold)
        }
    }
}

/// Threshold check on the player's stamina.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaminaGate {
    mode: StaminaMode,
}

impl StaminaGate {
    pub fn new(threshold: f32) -> Self {
        Self {
            mode: StaminaMode::from_threshold(threshold),
        }
    }

    pub fn mode(&self) -> StaminaMode {
        self.mode
    }

    /// `true` when nocking may proceed.
    ///
    /// An unavailable stamina reading passes: missing actor data must not
    /// lock the player out of nocking.
    pub fn has_stamina(&self, stamina: Option<ResourceValue>) -> bool {
        let Some(stamina) = stamina else {
            trace!("stamina unavailable, gate open");
            return true;
        };
        match self.mode {
            StaminaMode::Disabled => true,
            StaminaMode::Fraction(t) => stamina.fraction() > t,
            StaminaMode::Absolute(t) => stamina.current > t,
        }
    }
}
