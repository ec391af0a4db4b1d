//! `nockvr-runtime` – the arrow-nock engine.
//!
//! # Modules
//!
//! - [`machine`] – the side-effect-free state machine: [`transition`] maps
//!   `(Machine, Input)` to the next machine plus [`Command`]s.
//! - [`context`] – [`ArrowNockContext`], which filters external events,
//!   samples the scene, runs the machine, and executes its commands.
//! - [`world`] – the [`GameWorld`] query trait the context reads the game
//!   through.
//! - [`sim`] – [`SimWorld`][sim::SimWorld], a scripted game for tests and
//!   replays.
//! - [`telemetry`] – subscriber and OTLP setup for binaries.

pub mod context;
pub mod machine;
pub mod sim;
pub mod telemetry;
pub mod world;

pub use context::{ArrowNockContext, SettingsSource};
pub use machine::{Command, Input, Machine, NockState, TickReading, Transition, transition};
pub use world::GameWorld;
