//! [`GeometryProbe`] – bow/off-hand sensing.
//!
//! Reads the two fixed anchors through an [`AnchorSource`] and derives the
//! quantities the state machine needs: the squared distance between them
//! (overlap test) and their relative rotation as Euler angles (nock
//! confirmation).  A missing anchor is a normal transient during animation
//! blending, so neither query ever fails: the angle keeps its previous value
//! and overlap reads as `false`.

use tracing::trace;

use crate::transform::{NodeGraph, Transform3D, Vec3};

/// The fixed anchor points the nocking logic reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Nocking point on the bow, carried by the bow hand.
    Bow,
    /// Fixed point on the hand that holds the arrow.
    OffHand,
    /// Where visual feedback is attached on the player.
    Player,
}

impl Anchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Bow => "bow",
            Anchor::OffHand => "off_hand",
            Anchor::Player => "player",
        }
    }
}

/// Anything that can resolve anchor world transforms.
pub trait AnchorSource {
    /// World transform of `anchor`, or `None` while it is unavailable.
    fn anchor_transform(&self, anchor: Anchor) -> Option<Transform3D>;
}

/// Binds [`Anchor`]s to node names inside a [`NodeGraph`].
#[derive(Debug, Clone)]
pub struct SkeletonAnchors {
    pub graph: NodeGraph,
    pub bow_node: String,
    pub off_hand_node: String,
    pub player_node: String,
}

impl SkeletonAnchors {
    pub fn new(graph: NodeGraph, bow_node: &str, off_hand_node: &str, player_node: &str) -> Self {
        Self {
            graph,
            bow_node: bow_node.to_string(),
            off_hand_node: off_hand_node.to_string(),
            player_node: player_node.to_string(),
        }
    }

    pub fn node_for(&self, anchor: Anchor) -> &str {
        match anchor {
            Anchor::Bow => &self.bow_node,
            Anchor::OffHand => &self.off_hand_node,
            Anchor::Player => &self.player_node,
        }
    }
}

impl AnchorSource for SkeletonAnchors {
    fn anchor_transform(&self, anchor: Anchor) -> Option<Transform3D> {
        self.graph.world_transform(self.node_for(anchor))
    }
}

/// Samples bow/off-hand geometry, remembering the last good angle.
#[derive(Debug, Default, Clone)]
pub struct GeometryProbe {
    last_angle: Vec3,
}

impl GeometryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative rotation of the off-hand anchor in the bow anchor frame, as
    /// roll/pitch/yaw radians.
    ///
    /// Returns the previous successful sample (zero before the first) when
    /// either anchor is unavailable.
    pub fn sample_bow_hand_angle<S: AnchorSource + ?Sized>(&mut self, source: &S) -> Vec3 {
        match (
            source.anchor_transform(Anchor::Bow),
            source.anchor_transform(Anchor::OffHand),
        ) {
            (Some(bow), Some(hand)) => {
                self.last_angle = bow.relative_rotation(hand).to_euler();
            }
            _ => trace!("bow or off-hand anchor missing, keeping last angle"),
        }
        self.last_angle
    }

    /// Squared distance between the off-hand and bow anchors.
    pub fn squared_distance<S: AnchorSource + ?Sized>(&self, source: &S) -> Option<f32> {
        let bow = source.anchor_transform(Anchor::Bow)?;
        let hand = source.anchor_transform(Anchor::OffHand)?;
        Some(hand.translation.distance_squared(bow.translation))
    }

    /// `true` when the anchors are strictly closer than `sqrt(radius_sq)`.
    pub fn overlapping<S: AnchorSource + ?Sized>(&self, source: &S, radius_sq: f32) -> bool {
        self.squared_distance(source)
            .is_some_and(|d2| d2 < radius_sq)
    }

    /// Forget the cached angle.
    pub fn reset(&mut self) {
        self.last_angle = Vec3::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Quaternion, WORLD};

    fn skeleton(hand_offset: Vec3, hand_rot: Quaternion) -> SkeletonAnchors {
        let mut graph = NodeGraph::new();
        graph.set_node(WORLD, "player", Transform3D::identity());
        graph.set_node("player", "bow", Transform3D::identity());
        graph.set_node("player", "hand", Transform3D::new(hand_offset, hand_rot));
        SkeletonAnchors::new(graph, "bow", "hand", "player")
    }

    #[test]
    fn overlap_is_strictly_below_radius() {
        let probe = GeometryProbe::new();
        let s = skeleton(Vec3::new(3.0, 4.0, 0.0), Quaternion::identity());
        assert_eq!(probe.squared_distance(&s), Some(25.0));
        assert!(probe.overlapping(&s, 25.1));
        assert!(!probe.overlapping(&s, 25.0));
    }

    #[test]
    fn missing_anchor_is_not_overlapping() {
        let probe = GeometryProbe::new();
        let mut s = skeleton(Vec3::zero(), Quaternion::identity());
        s.graph.remove_node("bow");
        assert_eq!(probe.squared_distance(&s), None);
        assert!(!probe.overlapping(&s, 1_000.0));
    }

    #[test]
    fn angle_measures_hand_relative_to_bow() {
        let mut probe = GeometryProbe::new();
        let s = skeleton(
            Vec3::zero(),
            Quaternion::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 0.5),
        );
        let angle = probe.sample_bow_hand_angle(&s);
        assert!((angle.x - 0.5).abs() < 1e-4);
        assert!(angle.y.abs() < 1e-4);
    }

    #[test]
    fn angle_is_held_while_anchor_missing() {
        let mut probe = GeometryProbe::new();
        let mut s = skeleton(
            Vec3::zero(),
            Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), 0.25),
        );
        let first = probe.sample_bow_hand_angle(&s);

        s.graph.remove_node("hand");
        let held = probe.sample_bow_hand_angle(&s);
        assert_eq!(first, held);

        probe.reset();
        assert_eq!(probe.sample_bow_hand_angle(&s), Vec3::zero());
    }
}
