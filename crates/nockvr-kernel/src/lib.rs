//! `nockvr-kernel` – gating policy.
//!
//! Decides whether an automatic action may go ahead.  It does not act; the
//! runtime consults it and reacts to a veto.
//!
//! # Modules
//!
//! - [`stamina_gate`] – [`StaminaGate`][stamina_gate::StaminaGate]: vetoes
//!   automatic nocking while the player's stamina is at or below a
//!   configured threshold, read either as a fraction of maximum or as an
//!   absolute value.

pub mod stamina_gate;

pub use stamina_gate::{StaminaGate, StaminaMode};
