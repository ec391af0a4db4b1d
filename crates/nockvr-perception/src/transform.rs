//! Rigid-body math and the skeleton [`NodeGraph`].
//!
//! Anchors such as the bow's nocking point hang off skeletal nodes that the
//! engine may drop for a frame while animations blend.  [`NodeGraph`] models
//! that: each node stores its transform relative to its parent, and resolving
//! a node's world transform fails (returns `None`) whenever any link of the
//! chain is missing.
//!
//! # Example
//!
//! ```rust
//! use nockvr_perception::transform::{NodeGraph, Quaternion, Transform3D, Vec3};
//!
//! let mut graph = NodeGraph::new();
//! graph.set_node("world", "player",
//!     Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()));
//! graph.set_node("player", "left_hand",
//!     Transform3D::new(Vec3::new(0.5, 0.0, 0.0), Quaternion::identity()));
//!
//! let t = graph.world_transform("left_hand").unwrap();
//! assert!((t.translation.x - 1.5).abs() < 1e-5);
//!
//! graph.remove_node("player");
//! assert!(graph.world_transform("left_hand").is_none());
//! ```

use std::collections::HashMap;

/// Name of the implicit root node.
pub const WORLD: &str = "world";

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector, used both for positions and for Euler-angle triples.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Euclidean norm.
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance_squared(self, other: Self) -> f32 {
        self.sub(other).length_squared()
    }
}

/// A unit quaternion (w, x, y, z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// The caller is responsible for passing a unit quaternion.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` about a unit `axis`.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f32) -> Self {
        let (s, c) = (angle_rad * 0.5).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Hamilton product: `self` then `rhs` in the local frame.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Inverse of a unit quaternion.
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// p' = q * p * q*
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Roll (x), pitch (y), yaw (z) in radians.  Pitch is clamped to
    /// ±π/2 at the gimbal-lock singularity.
    pub fn to_euler(self) -> Vec3 {
        let roll = (2.0 * (self.w * self.x + self.y * self.z))
            .atan2(1.0 - 2.0 * (self.x * self.x + self.y * self.y));
        let pitch = (2.0 * (self.w * self.y - self.z * self.x))
            .clamp(-1.0, 1.0)
            .asin();
        let yaw = (2.0 * (self.w * self.z + self.x * self.y))
            .atan2(1.0 - 2.0 * (self.y * self.y + self.z * self.z));
        Vec3::new(roll, pitch, yaw)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// Pose of a child frame in its parent: rotate by `rotation`, then add
/// `translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// T_A_B.compose(T_B_C) == T_A_C
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation.add(self.rotation.rotate(other.translation));
        let rotated = self.rotation.mul(other.rotation);
        Self::new(translated, rotated)
    }

    /// Orientation of `other` expressed in this frame.
    pub fn relative_rotation(self, other: Self) -> Quaternion {
        self.rotation.conjugate().mul(other.rotation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// NodeGraph
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct NodeEntry {
    parent: String,
    local: Transform3D,
}

/// A tree of named skeletal nodes rooted at [`WORLD`].
#[derive(Debug, Default, Clone)]
pub struct NodeGraph {
    nodes: HashMap<String, NodeEntry>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `node` under `parent` with the given local pose.
    pub fn set_node(&mut self, parent: &str, node: &str, local: Transform3D) {
        self.nodes.insert(
            node.to_string(),
            NodeEntry {
                parent: parent.to_string(),
                local,
            },
        );
    }

    /// Drop `node`; its descendants stay registered but become unreachable.
    pub fn remove_node(&mut self, node: &str) {
        self.nodes.remove(node);
    }

    /// Compose the chain from [`WORLD`] down to `node`.
    ///
    /// Returns `None` when any ancestor is missing or the parent links form a
    /// cycle.
    pub fn world_transform(&self, node: &str) -> Option<Transform3D> {
        let mut chain = Vec::new();
        let mut current = node;
        while current != WORLD {
            if chain.len() > self.nodes.len() {
                return None;
            }
            let entry = self.nodes.get(current)?;
            chain.push(entry.local);
            current = &entry.parent;
        }
        Some(
            chain
                .into_iter()
                .rev()
                .fold(Transform3D::identity(), Transform3D::compose),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
