//! `nockvr-hal` – the device edge of NockVR.
//!
//! Everything that leaves the process goes through a trait defined here, so
//! the state machine never talks to a concrete controller hook or audio
//! engine.
//!
//! # Modules
//!
//! - [`input`] – [`InputBackend`][input::InputBackend] and
//!   [`SyntheticInputInjector`][input::SyntheticInputInjector], which tracks
//!   every synthetic button state it asserts.
//! - [`subscription`] – [`InputSubscriptions`][subscription::InputSubscriptions]:
//!   token-based filtering of real button events.
//! - [`feedback`] – [`FeedbackDispatcher`][feedback::FeedbackDispatcher]:
//!   rate-limited haptic/sound/visual feedback over a
//!   [`FeedbackSink`][feedback::FeedbackSink].
//! - [`sim`] – recording doubles for headless runs.

pub mod feedback;
pub mod input;
pub mod sim;
pub mod subscription;

pub use feedback::{FeedbackDispatcher, FeedbackRequest, FeedbackSink, VisualEffect};
pub use input::{InputBackend, SyntheticInputInjector};
pub use subscription::{InputSubscriptions, SubscriptionToken};
