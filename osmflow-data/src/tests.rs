use super::*;
use osmflow_core::{Feature, FeatureKind, FeatureKinds, FeatureSource, MemberKind};
use rstest::{fixture, rstest};
use tempfile::TempPath;

mod support {
    include!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/support.rs"));
}

use support::{assert_coord_close, decode_fixture, fixtures_dir};

#[fixture]
fn meadow_pbf() -> TempPath {
    support::meadow()
}

#[fixture]
fn invalid_pbf() -> TempPath {
    decode_fixture(&fixtures_dir(), "invalid")
}

fn read_all(path: &Path, kinds: FeatureKinds) -> Result<Vec<Feature>, PbfError> {
    PbfSource::new(path).open(kinds)?.collect()
}

#[rstest]
fn reads_dense_and_plain_nodes(meadow_pbf: TempPath) -> Result<(), PbfError> {
    let features = read_all(meadow_pbf.as_ref(), FeatureKind::Node.into())?;
    let nodes: Vec<_> = features
        .iter()
        .filter_map(|feature| match feature {
            Feature::Node(node) => Some(node),
            _ => None,
        })
        .collect();
    assert_eq!(nodes.len(), 5, "four dense nodes and one plain node");
    let gate = nodes.get(2).expect("third node");
    assert_eq!(gate.tags.get("barrier").map(String::as_str), Some("gate"));
    assert_coord_close(gate.location, (1.0, 1.0));
    let bench = nodes.last().expect("plain node");
    assert_eq!(bench.id, 5);
    assert_eq!(bench.tags.get("amenity").map(String::as_str), Some("bench"));
    assert_coord_close(bench.location, (0.5, 0.5));
    Ok(())
}

#[rstest]
fn yields_only_requested_kinds(meadow_pbf: TempPath) -> Result<(), PbfError> {
    let features = read_all(meadow_pbf.as_ref(), FeatureKind::Way.into())?;
    let ids: Vec<_> = features.iter().map(Feature::id).collect();
    assert_eq!(ids, vec![10, 11, 12, 13]);
    assert!(features.iter().all(|feature| feature.kind() == FeatureKind::Way));
    let Some(Feature::Way(closed)) = features.get(2) else {
        panic!("expected way 12 in third position");
    };
    assert!(closed.is_closed());
    assert!(!closed.is_fully_located(), "readers never resolve locations");
    Ok(())
}

#[rstest]
fn keeps_relation_members_in_order(meadow_pbf: TempPath) -> Result<(), PbfError> {
    let features = read_all(meadow_pbf.as_ref(), FeatureKind::Relation.into())?;
    let Some(Feature::Relation(route)) = features.last() else {
        panic!("expected the route relation last");
    };
    let members: Vec<_> = route
        .members
        .iter()
        .map(|member| (member.kind, member.id, member.role.as_str()))
        .collect();
    assert_eq!(
        members,
        vec![(MemberKind::Node, 5, "stop"), (MemberKind::Way, 13, "")]
    );
    assert_eq!(route.tags.get("type").map(String::as_str), Some("route"));
    Ok(())
}

#[rstest]
fn empty_kind_sets_yield_nothing(meadow_pbf: TempPath) -> Result<(), PbfError> {
    let mut session = PbfSource::new(meadow_pbf.to_path_buf()).open(FeatureKinds::empty())?;
    assert!(session.next().is_none());
    Ok(())
}

#[rstest]
fn missing_files_fail_to_open() {
    let path = fixtures_dir().join("missing.osm.pbf");
    let err = PbfSource::new(&path)
        .open(FeatureKinds::all())
        .expect_err("missing file");
    match err {
        PbfError::Open { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected an open error, got {other:?}"),
    }
}

#[rstest]
fn corrupt_files_fail_once_then_stop(invalid_pbf: TempPath) {
    let mut session = PbfSource::new(invalid_pbf.to_path_buf())
        .open(FeatureKinds::all())
        .expect("opening does not read the file");
    assert!(matches!(session.next(), Some(Err(PbfError::Decode { .. }))));
    assert!(session.next().is_none());
}

#[rstest]
fn locations_leave_missing_nodes_unresolved(meadow_pbf: TempPath) {
    let mut partial = Vec::new();
    let callbacks = Callbacks::new().on_way(|way| {
        if !way.is_fully_located() {
            partial.push(way.id);
        }
        Ok(())
    });
    let options = ApplyOptions::default().with_locations(true);
    let report = apply_file(meadow_pbf.as_ref(), options, callbacks).expect("run succeeds");
    assert_eq!(partial, vec![13]);
    let stats = report.locations.expect("index built");
    assert_eq!(stats.indexed, 5);
    assert_eq!(stats.resolved, 12);
    assert_eq!(stats.unresolved, 1);
}

#[rstest]
fn areas_are_dispatched_after_their_completing_way(meadow_pbf: TempPath) {
    let mut order = Vec::new();
    {
        let log = std::cell::RefCell::new(&mut order);
        let callbacks = Callbacks::new()
            .on_way(|way| {
                log.borrow_mut().push(format!("way {}", way.id));
                Ok(())
            })
            .on_area(|area| {
                log.borrow_mut().push(format!("area {}", area.id));
                Ok(())
            });
        let report =
            apply_file(meadow_pbf.as_ref(), ApplyOptions::default(), callbacks).expect("run");
        assert_eq!(report.sessions, 2);
        let stats = report.areas.expect("area mode");
        assert_eq!((stats.relations, stats.areas, stats.abandoned), (2, 2, 1));
    }
    assert_eq!(
        order,
        vec!["way 10", "way 11", "area 41", "way 12", "area 24", "way 13"]
    );
}
