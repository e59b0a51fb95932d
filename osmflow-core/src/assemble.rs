//! Ring building for area assembly.
//!
//! [`AreaAssembler`] is the seam where member way geometries become
//! polygons. [`RingAssembler`] is the default: it stitches ways into closed
//! rings by shared end nodes and nests inner rings inside outer ones.

use geo::{
    Contains, Coord, LineString, MultiPolygon, Polygon,
    algorithm::orient::{Direction, Orient},
};
use log::debug;

use crate::feature::{NodeRef, Way};

/// Whether a member way bounds the outside of an area or a hole in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingRole {
    /// Outer boundary.
    Outer,
    /// Hole.
    Inner,
}

impl RingRole {
    /// Map a relation member role; anything but `inner` is outer.
    #[must_use]
    pub fn from_member_role(role: &str) -> Self {
        if role == "inner" {
            Self::Inner
        } else {
            Self::Outer
        }
    }
}

/// A resolved way taking part in an area.
#[derive(Debug, Clone, Copy)]
pub struct MemberWay<'w> {
    /// The way, with node locations resolved.
    pub way: &'w Way,
    /// Role of the way within the area.
    pub role: RingRole,
}

/// Builds polygon geometry from member ways.
pub trait AreaAssembler {
    /// Assemble `members` into polygons, or `None` when they do not form
    /// valid rings.
    fn assemble(&self, members: &[MemberWay<'_>]) -> Option<MultiPolygon<f64>>;
}

impl<A> AreaAssembler for &A
where
    A: AreaAssembler + ?Sized,
{
    fn assemble(&self, members: &[MemberWay<'_>]) -> Option<MultiPolygon<f64>> {
        (**self).assemble(members)
    }
}

/// Default [`AreaAssembler`] joining ways end to end by node id.
///
/// Every member must be fully located and every ring must close; otherwise
/// the whole area is rejected. Outer rings become counter-clockwise
/// exteriors; each inner ring becomes a clockwise hole of the first exterior
/// containing it. Inner rings outside every exterior are dropped.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use osmflow_core::{AreaAssembler, MemberWay, NodeRef, RingAssembler, RingRole, Way};
///
/// let corners = [(1, 0.0, 0.0), (2, 1.0, 0.0), (3, 1.0, 1.0), (1, 0.0, 0.0)];
/// let mut way = Way::new(7, corners.iter().map(|(id, _, _)| *id));
/// for (node, (_, x, y)) in way.nodes.iter_mut().zip(corners) {
///     node.location = Some(Coord { x, y });
/// }
/// let members = [MemberWay { way: &way, role: RingRole::Outer }];
/// let geometry = RingAssembler.assemble(&members).expect("closed ring");
/// assert_eq!(geometry.0.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RingAssembler;

impl AreaAssembler for RingAssembler {
    fn assemble(&self, members: &[MemberWay<'_>]) -> Option<MultiPolygon<f64>> {
        let ways_with = |role: RingRole| -> Vec<&[NodeRef]> {
            members
                .iter()
                .filter(|member| member.role == role)
                .map(|member| member.way.nodes.as_slice())
                .collect()
        };
        let exteriors = build_rings(ways_with(RingRole::Outer))?;
        if exteriors.is_empty() {
            return None;
        }
        let holes = build_rings(ways_with(RingRole::Inner))?;

        let mut polygons: Vec<Polygon<f64>> = exteriors
            .into_iter()
            .map(|exterior| Polygon::new(exterior, Vec::new()))
            .collect();
        for hole in holes {
            match polygons
                .iter_mut()
                .find(|polygon| polygon.contains(&hole))
            {
                Some(polygon) => polygon.interiors_push(hole),
                None => debug!("Dropped inner ring outside every outer ring"),
            }
        }
        Some(MultiPolygon::new(polygons).orient(Direction::Default))
    }
}

/// Stitch way segments into closed rings.
///
/// Segments are consumed in order; each ring is grown from its tail by the
/// first remaining segment sharing that end node, reversed when needed.
fn build_rings(segments: Vec<&[NodeRef]>) -> Option<Vec<LineString<f64>>> {
    let mut remaining: Vec<&[NodeRef]> = segments
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .rev()
        .collect();
    let mut rings = Vec::new();
    while let Some(start) = remaining.pop() {
        let mut ring: Vec<NodeRef> = start.to_vec();
        loop {
            let head = ring.first()?.id;
            let tail = ring.last()?.id;
            if ring.len() >= 4 && head == tail {
                break;
            }
            let Some(position) = remaining.iter().rposition(|segment| {
                segment.first().map(|node| node.id) == Some(tail)
                    || segment.last().map(|node| node.id) == Some(tail)
            }) else {
                debug!("Ring starting at node {head} does not close at node {tail}");
                return None;
            };
            let segment = remaining.remove(position);
            if segment.first().map(|node| node.id) == Some(tail) {
                ring.extend(segment.iter().skip(1));
            } else {
                ring.extend(segment.iter().rev().skip(1));
            }
        }
        let coords: Option<Vec<Coord<f64>>> = ring.iter().map(|node| node.location).collect();
        let Some(coords) = coords else {
            debug!("Ring contains nodes without locations");
            return None;
        };
        rings.push(LineString::new(coords));
    }
    Some(rings)
}
