//! `nockvr-perception` – bow and hand geometry.
//!
//! Turns externally supplied skeleton transforms into the two signals the
//! nocking state machine runs on: are the hands together, and has the arrow
//! hand rotated against the bow far enough to count as nocked.
//!
//! # Modules
//!
//! - [`transform`] – vector/quaternion math and [`NodeGraph`][transform::NodeGraph],
//!   a tree of named skeletal nodes whose lookups fail while any link is
//!   missing.
//! - [`probe`] – [`GeometryProbe`][probe::GeometryProbe]: overlap distance and
//!   bow/hand relative rotation read through an
//!   [`AnchorSource`][probe::AnchorSource].
//! - [`nock`] – [`is_nocked`][nock::is_nocked]: the angular-deviation
//!   confirmation test.

pub mod nock;
pub mod probe;
pub mod transform;

pub use nock::is_nocked;
pub use probe::{Anchor, AnchorSource, GeometryProbe, SkeletonAnchors};
pub use transform::{NodeGraph, Quaternion, Transform3D, Vec3};
