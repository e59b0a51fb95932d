//! Map features delivered by a feature stream.
//!
//! Coordinates are WGS84 with `x = longitude` and `y = latitude`, matching
//! the rest of the workspace. Features are plain owned values; the stages
//! only ever fill in way node locations before handing them on.

use std::{collections::HashMap, fmt};

use enumflags2::{BitFlags, bitflags};
use geo::{Coord, MultiPolygon, Rect};

/// OpenStreetMap-style key/value tags.
pub type Tags = HashMap<String, String>;

/// The closed set of feature kinds a stream can carry.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// A point with a location.
    Node = 0b0_0001,
    /// An ordered list of node references.
    Way = 0b0_0010,
    /// A grouping of typed member references.
    Relation = 0b0_0100,
    /// Edit metadata.
    Changeset = 0b0_1000,
    /// A polygon synthesised from a closed way or a multipolygon relation.
    Area = 0b1_0000,
}

/// A set of [`FeatureKind`] flags, e.g. the kinds requested from a reader.
pub type FeatureKinds = BitFlags<FeatureKind>;

impl FeatureKind {
    /// Lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
            Self::Changeset => "changeset",
            Self::Area => "area",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node and its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// OSM node identifier.
    pub id: i64,
    /// Position of the node.
    pub location: Coord<f64>,
    /// Tags attached to the node.
    pub tags: Tags,
}

impl Node {
    /// Construct a node without tags.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use osmflow_core::Node;
    ///
    /// let node = Node::new(7, Coord { x: 13.4, y: 52.5 });
    /// assert!(node.tags.is_empty());
    /// ```
    #[must_use]
    pub fn new(id: i64, location: Coord<f64>) -> Self {
        Self {
            id,
            location,
            tags: Tags::new(),
        }
    }

    /// Attach tags to the node.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// A reference from a way to one of its nodes.
///
/// `location` stays `None` until a location stage resolves it, and stays
/// `None` afterwards when the node could not be found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRef {
    /// Referenced node identifier.
    pub id: i64,
    /// Resolved location, if known.
    pub location: Option<Coord<f64>>,
}

impl NodeRef {
    /// A reference whose location has not been resolved.
    #[must_use]
    pub const fn unresolved(id: i64) -> Self {
        Self { id, location: None }
    }
}

/// An ordered list of node references.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    /// OSM way identifier.
    pub id: i64,
    /// Node references in way order.
    pub nodes: Vec<NodeRef>,
    /// Tags attached to the way.
    pub tags: Tags,
}

impl Way {
    /// Construct a way from raw node ids; every reference starts unresolved.
    ///
    /// # Examples
    /// ```
    /// use osmflow_core::Way;
    ///
    /// let way = Way::new(1, [10, 11, 12, 10]);
    /// assert!(way.is_closed());
    /// assert!(!way.is_fully_located());
    /// ```
    #[must_use]
    pub fn new<I>(id: i64, refs: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            id,
            nodes: refs.into_iter().map(NodeRef::unresolved).collect(),
            tags: Tags::new(),
        }
    }

    /// Attach tags to the way.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Referenced node ids in way order.
    pub fn refs(&self) -> impl Iterator<Item = i64> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Resolved locations in way order; `None` marks an unresolved reference.
    pub fn locations(&self) -> impl Iterator<Item = Option<Coord<f64>>> + '_ {
        self.nodes.iter().map(|node| node.location)
    }

    /// Whether the way could describe a ring: at least four references and
    /// the same node at both ends.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) => self.nodes.len() >= 4 && first.id == last.id,
            _ => false,
        }
    }

    /// Whether every reference carries a location.
    #[must_use]
    pub fn is_fully_located(&self) -> bool {
        self.nodes.iter().all(|node| node.location.is_some())
    }
}

/// Kind of a relation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// The member is a node.
    Node,
    /// The member is a way.
    Way,
    /// The member is another relation.
    Relation,
}

/// A typed reference held by a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Kind of the referenced feature.
    pub kind: MemberKind,
    /// Identifier of the referenced feature.
    pub id: i64,
    /// Free-form role, e.g. `outer` or `inner` for multipolygons.
    pub role: String,
}

impl Member {
    /// A way member with the given role.
    #[must_use]
    pub fn way(id: i64, role: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Way,
            id,
            role: role.into(),
        }
    }

    /// A node member with the given role.
    #[must_use]
    pub fn node(id: i64, role: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Node,
            id,
            role: role.into(),
        }
    }
}

/// A grouping of typed member references.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// OSM relation identifier.
    pub id: i64,
    /// Members in relation order.
    pub members: Vec<Member>,
    /// Tags attached to the relation.
    pub tags: Tags,
}

impl Relation {
    /// Construct a relation without tags.
    #[must_use]
    pub fn new(id: i64, members: Vec<Member>) -> Self {
        Self {
            id,
            members,
            tags: Tags::new(),
        }
    }

    /// Attach tags to the relation.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// Metadata describing one edit session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Changeset {
    /// Changeset identifier.
    pub id: i64,
    /// Display name of the editor, if known.
    pub user: Option<String>,
    /// Numeric user id, if known.
    pub uid: Option<i64>,
    /// Creation time as seconds since the Unix epoch.
    pub created_at: Option<i64>,
    /// Closing time as seconds since the Unix epoch; `None` while open.
    pub closed_at: Option<i64>,
    /// Number of changes made in the changeset.
    pub num_changes: u32,
    /// Bounding box of the edits, if any were located.
    pub bounds: Option<Rect<f64>>,
    /// Tags attached to the changeset.
    pub tags: Tags,
}

/// Where an [`Area`] was assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AreaOrigin {
    /// A single closed way.
    Way(i64),
    /// A multipolygon or boundary relation.
    Relation(i64),
}

impl AreaOrigin {
    /// Derive the area identifier: `way * 2` or `relation * 2 + 1`.
    ///
    /// Returns `None` when the doubled identifier does not fit in an `i64`.
    #[must_use]
    pub fn area_id(self) -> Option<i64> {
        match self {
            Self::Way(id) => id.checked_mul(2),
            Self::Relation(id) => id.checked_mul(2).and_then(|doubled| doubled.checked_add(1)),
        }
    }

    /// Identifier of the originating way or relation.
    #[must_use]
    pub const fn original_id(self) -> i64 {
        match self {
            Self::Way(id) | Self::Relation(id) => id,
        }
    }
}

/// A polygonal feature synthesised during area assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    /// Area identifier derived from [`AreaOrigin::area_id`].
    pub id: i64,
    /// Feature the area was built from.
    pub origin: AreaOrigin,
    /// Tags inherited from the originating feature.
    pub tags: Tags,
    /// Assembled rings.
    pub geometry: MultiPolygon<f64>,
}

impl Area {
    /// Build an area, deriving its identifier from `origin`.
    ///
    /// Returns `None` when the identifier cannot be represented.
    ///
    /// # Examples
    /// ```
    /// use geo::MultiPolygon;
    /// use osmflow_core::{Area, AreaOrigin, Tags};
    ///
    /// let area = Area::new(AreaOrigin::Relation(5), Tags::new(), MultiPolygon::new(vec![]));
    /// assert_eq!(area.map(|a| a.id), Some(11));
    /// ```
    #[must_use]
    pub fn new(origin: AreaOrigin, tags: Tags, geometry: MultiPolygon<f64>) -> Option<Self> {
        let id = origin.area_id()?;
        Some(Self {
            id,
            origin,
            tags,
            geometry,
        })
    }

    /// Whether the area was built from a single closed way.
    #[must_use]
    pub const fn from_way(&self) -> bool {
        matches!(self.origin, AreaOrigin::Way(_))
    }
}

/// One record of a feature stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// See [`Node`].
    Node(Node),
    /// See [`Way`].
    Way(Way),
    /// See [`Relation`].
    Relation(Relation),
    /// See [`Changeset`].
    Changeset(Changeset),
    /// See [`Area`].
    Area(Area),
}

impl Feature {
    /// Kind of this feature.
    #[must_use]
    pub const fn kind(&self) -> FeatureKind {
        match self {
            Self::Node(_) => FeatureKind::Node,
            Self::Way(_) => FeatureKind::Way,
            Self::Relation(_) => FeatureKind::Relation,
            Self::Changeset(_) => FeatureKind::Changeset,
            Self::Area(_) => FeatureKind::Area,
        }
    }

    /// Identifier of this feature within its kind.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Node(node) => node.id,
            Self::Way(way) => way.id,
            Self::Relation(relation) => relation.id,
            Self::Changeset(changeset) => changeset.id,
            Self::Area(area) => area.id,
        }
    }
}

impl From<Node> for Feature {
    fn from(value: Node) -> Self {
        Self::Node(value)
    }
}

impl From<Way> for Feature {
    fn from(value: Way) -> Self {
        Self::Way(value)
    }
}

impl From<Relation> for Feature {
    fn from(value: Relation) -> Self {
        Self::Relation(value)
    }
}

impl From<Changeset> for Feature {
    fn from(value: Changeset) -> Self {
        Self::Changeset(value)
    }
}

impl From<Area> for Feature {
    fn from(value: Area) -> Self {
        Self::Area(value)
    }
}
