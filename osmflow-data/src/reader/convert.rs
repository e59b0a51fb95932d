//! Conversion from decoded PBF elements into owned features.
//!
//! Elements borrow their primitive block, so every element a session keeps
//! is copied out before the block is dropped.

use geo::Coord;
use log::debug;
use osmflow_core::{
    Feature, FeatureKind, FeatureKinds, Member, MemberKind, Node, Relation, Tags, Way,
};
use osmpbf::{Element, RelMemberType};

/// Convert `element` when its kind was requested.
pub(super) fn convert(element: Element<'_>, kinds: FeatureKinds) -> Option<Feature> {
    match element {
        Element::Node(node) if kinds.contains(FeatureKind::Node) => Some(node_feature(
            node.id(),
            node.lon(),
            node.lat(),
            collect_tags(node.tags()),
        )),
        Element::DenseNode(node) if kinds.contains(FeatureKind::Node) => Some(node_feature(
            node.id(),
            node.lon(),
            node.lat(),
            collect_tags(node.tags()),
        )),
        Element::Way(way) if kinds.contains(FeatureKind::Way) => Some(Feature::from(
            Way::new(way.id(), way.refs()).with_tags(collect_tags(way.tags())),
        )),
        Element::Relation(relation) if kinds.contains(FeatureKind::Relation) => {
            let members = relation
                .members()
                .map(|member| {
                    let role = member.role().unwrap_or_else(|err| {
                        debug!(
                            "Relation {} member {} has an unreadable role: {err}",
                            relation.id(),
                            member.member_id
                        );
                        ""
                    });
                    Member {
                        kind: member_kind(&member.member_type),
                        id: member.member_id,
                        role: role.to_owned(),
                    }
                })
                .collect();
            Some(Feature::from(
                Relation::new(relation.id(), members).with_tags(collect_tags(relation.tags())),
            ))
        }
        Element::Node(_) | Element::DenseNode(_) | Element::Way(_) | Element::Relation(_) => None,
    }
}

fn node_feature(id: i64, lon: f64, lat: f64, tags: Tags) -> Feature {
    Feature::from(Node::new(id, Coord { x: lon, y: lat }).with_tags(tags))
}

const fn member_kind(member_type: &RelMemberType) -> MemberKind {
    match member_type {
        RelMemberType::Node => MemberKind::Node,
        RelMemberType::Way => MemberKind::Way,
        RelMemberType::Relation => MemberKind::Relation,
    }
}

fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}
