//! Behavioural tests for planning and dispatching a feature stream.

use geo::Coord;
use osmflow_core::{
    ApplyError, ApplyOptions, ApplyReport, Callbacks, FeatureKind, FeatureKinds, apply_source,
    test_support::{MemorySource, MemorySourceError, multipolygon, node, way},
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};

type Outcome = Result<ApplyReport, ApplyError<MemorySourceError>>;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Node(i64),
    Way(i64, Vec<Option<Coord<f64>>>),
    Relation(i64),
    Area(i64),
}

#[derive(Debug, Default)]
struct Consumer {
    kinds: Vec<FeatureKind>,
    locations: bool,
    failing_ways: bool,
}

#[fixture]
fn dataset() -> RefCell<Option<MemorySource>> {
    RefCell::new(None)
}

#[fixture]
fn consumer() -> RefCell<Consumer> {
    RefCell::new(Consumer::default())
}

#[fixture]
fn events() -> RefCell<Vec<Event>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn outcome() -> RefCell<Option<Outcome>> {
    RefCell::new(None)
}

fn expect_report(outcome: &RefCell<Option<Outcome>>) -> ApplyReport {
    outcome
        .borrow()
        .as_ref()
        .expect("run was attempted")
        .as_ref()
        .expect("expected a successful run")
        .clone()
}

fn square_nodes() -> Vec<osmflow_core::Feature> {
    vec![
        node(1, 0.0, 0.0),
        node(2, 1.0, 0.0),
        node(3, 1.0, 1.0),
        node(4, 0.0, 1.0),
    ]
}

#[given("a triangle dataset with three nodes and one way")]
fn triangle_dataset(#[from(dataset)] dataset: &RefCell<Option<MemorySource>>) {
    *dataset.borrow_mut() = Some(MemorySource::new([
        node(1, 0.0, 0.0),
        node(2, 1.0, 0.0),
        node(3, 1.0, 1.0),
        way(10, [1, 2, 3]),
    ]));
}

#[given("a square split into two ways and a multipolygon relation")]
fn square_dataset(#[from(dataset)] dataset: &RefCell<Option<MemorySource>>) {
    let mut features = square_nodes();
    features.extend([
        way(10, [1, 2, 3]),
        way(11, [3, 4, 1]),
        multipolygon(20, &[(10, "outer"), (11, "outer")]),
    ]);
    *dataset.borrow_mut() = Some(MemorySource::new(features));
}

#[given("a multipolygon relation whose second way is missing")]
fn truncated_dataset(#[from(dataset)] dataset: &RefCell<Option<MemorySource>>) {
    let mut features = square_nodes();
    features.extend([
        way(10, [1, 2, 3]),
        multipolygon(20, &[(10, "outer"), (11, "outer")]),
    ]);
    *dataset.borrow_mut() = Some(MemorySource::new(features));
}

#[given("a consumer that only handles ways")]
fn way_consumer(#[from(consumer)] consumer: &RefCell<Consumer>) {
    consumer.borrow_mut().kinds = vec![FeatureKind::Way];
}

#[given("a consumer that only handles areas")]
fn area_consumer(#[from(consumer)] consumer: &RefCell<Consumer>) {
    consumer.borrow_mut().kinds = vec![FeatureKind::Area];
}

#[given("a consumer without callbacks")]
fn empty_consumer(#[from(consumer)] consumer: &RefCell<Consumer>) {
    consumer.borrow_mut().kinds.clear();
}

#[given("a consumer whose way callback fails")]
fn failing_consumer(#[from(consumer)] consumer: &RefCell<Consumer>) {
    let mut consumer = consumer.borrow_mut();
    consumer.kinds = vec![FeatureKind::Node, FeatureKind::Way];
    consumer.failing_ways = true;
}

#[given("location resolution is requested")]
fn request_locations(#[from(consumer)] consumer: &RefCell<Consumer>) {
    consumer.borrow_mut().locations = true;
}

#[when("I apply the dataset")]
fn apply_dataset(
    #[from(dataset)] dataset: &RefCell<Option<MemorySource>>,
    #[from(consumer)] consumer: &RefCell<Consumer>,
    #[from(events)] events: &RefCell<Vec<Event>>,
    #[from(outcome)] outcome: &RefCell<Option<Outcome>>,
) {
    let guard = dataset.borrow();
    let source = guard.as_ref().expect("dataset prepared");
    let settings = consumer.borrow();
    let mut callbacks = Callbacks::new();
    for kind in &settings.kinds {
        callbacks = match kind {
            FeatureKind::Node => callbacks.on_node(move |node| {
                events.borrow_mut().push(Event::Node(node.id));
                Ok(())
            }),
            FeatureKind::Way if settings.failing_ways => {
                callbacks.on_way(|way| Err(format!("way {} rejected", way.id).into()))
            }
            FeatureKind::Way => callbacks.on_way(move |way| {
                events
                    .borrow_mut()
                    .push(Event::Way(way.id, way.locations().collect()));
                Ok(())
            }),
            FeatureKind::Relation => callbacks.on_relation(move |relation| {
                events.borrow_mut().push(Event::Relation(relation.id));
                Ok(())
            }),
            FeatureKind::Changeset => callbacks.on_changeset(|_| Ok(())),
            FeatureKind::Area => callbacks.on_area(move |area| {
                events.borrow_mut().push(Event::Area(area.id));
                Ok(())
            }),
        };
    }
    let options = ApplyOptions::default().with_locations(settings.locations);
    *outcome.borrow_mut() = Some(apply_source(source, options, callbacks));
}

#[then("one way callback fires with unresolved references")]
fn raw_way(#[from(events)] events: &RefCell<Vec<Event>>) {
    assert_eq!(*events.borrow(), vec![Event::Way(10, vec![None, None, None])]);
}

#[then("no location index is built")]
fn no_index(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let report = expect_report(outcome);
    assert_eq!(report.locations, None);
    assert_eq!(report.dispatched.nodes, 0);
}

#[then("one way callback fires with the triangle coordinates")]
fn resolved_way(#[from(events)] events: &RefCell<Vec<Event>>) {
    let expected = vec![
        Some(Coord { x: 0.0, y: 0.0 }),
        Some(Coord { x: 1.0, y: 0.0 }),
        Some(Coord { x: 1.0, y: 1.0 }),
    ];
    assert_eq!(*events.borrow(), vec![Event::Way(10, expected)]);
}

#[then("exactly one area callback fires for the relation")]
fn one_area(#[from(events)] events: &RefCell<Vec<Event>>) {
    let areas: Vec<_> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Area(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(areas, vec![41], "relation 20 maps to area 41");
}

#[then("no node or way callbacks fire")]
fn no_native_callbacks(
    #[from(events)] events: &RefCell<Vec<Event>>,
    #[from(outcome)] outcome: &RefCell<Option<Outcome>>,
) {
    assert!(
        events
            .borrow()
            .iter()
            .all(|event| matches!(event, Event::Area(_))),
        "only areas were requested"
    );
    let report = expect_report(outcome);
    assert_eq!(report.dispatched.nodes + report.dispatched.ways, 0);
    assert_eq!(report.locations.map(|stats| stats.resolved), Some(6));
}

#[then("the dataset was read twice")]
fn read_twice(
    #[from(dataset)] dataset: &RefCell<Option<MemorySource>>,
    #[from(outcome)] outcome: &RefCell<Option<Outcome>>,
) {
    let guard = dataset.borrow();
    let source = guard.as_ref().expect("dataset prepared");
    assert_eq!(
        source.opened(),
        vec![
            FeatureKinds::from(FeatureKind::Relation),
            FeatureKind::Node | FeatureKind::Way | FeatureKind::Relation,
        ]
    );
    assert_eq!(expect_report(outcome).sessions, 2);
}

#[then("no area callback fires")]
fn no_area(#[from(events)] events: &RefCell<Vec<Event>>) {
    assert!(events.borrow().is_empty());
}

#[then("the run succeeds with one abandoned relation")]
fn abandoned(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let stats = expect_report(outcome).areas.expect("area mode ran");
    assert_eq!(stats.relations, 1);
    assert_eq!(stats.abandoned, 1);
    assert_eq!(stats.areas, 0);
}

#[then("the run succeeds after opening one empty session")]
fn empty_session(
    #[from(dataset)] dataset: &RefCell<Option<MemorySource>>,
    #[from(events)] events: &RefCell<Vec<Event>>,
    #[from(outcome)] outcome: &RefCell<Option<Outcome>>,
) {
    let report = expect_report(outcome);
    assert!(report.plan.is_noop());
    assert_eq!(report.sessions, 1);
    let guard = dataset.borrow();
    let source = guard.as_ref().expect("dataset prepared");
    assert_eq!(source.opened(), vec![FeatureKinds::empty()]);
    assert!(events.borrow().is_empty());
}

#[then("the run fails with a way callback error")]
fn callback_error(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let borrowed = outcome.borrow();
    match borrowed.as_ref().expect("run was attempted") {
        Err(ApplyError::Callback(failure)) => {
            assert_eq!(failure.kind, FeatureKind::Way);
            assert_eq!(failure.id, 10);
            assert_eq!(failure.source.to_string(), "way 10 rejected");
        }
        other => panic!("expected a callback failure, got {other:?}"),
    }
}

#[then("every session has been released")]
fn sessions_released(#[from(dataset)] dataset: &RefCell<Option<MemorySource>>) {
    let guard = dataset.borrow();
    let source = guard.as_ref().expect("dataset prepared");
    assert_eq!(source.live_sessions(), 0);
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/dispatch.feature");
    let contents = fs::read_to_string(&feature).unwrap_or_else(|err| {
        panic!("failed to read feature file {feature:?}: {err}");
    });
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        vec![
            "delivering raw ways without locations",
            "resolving way locations on request",
            "assembling an area from a multipolygon relation",
            "omitting a relation with a missing member",
            "running without callbacks",
            "stopping on a failing callback",
        ]
    );
}

#[scenario(path = "tests/features/dispatch.feature", index = 0)]
fn delivering_raw_ways(
    dataset: RefCell<Option<MemorySource>>,
    consumer: RefCell<Consumer>,
    events: RefCell<Vec<Event>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (dataset, consumer, events, outcome);
}

#[scenario(path = "tests/features/dispatch.feature", index = 1)]
fn resolving_way_locations(
    dataset: RefCell<Option<MemorySource>>,
    consumer: RefCell<Consumer>,
    events: RefCell<Vec<Event>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (dataset, consumer, events, outcome);
}

#[scenario(path = "tests/features/dispatch.feature", index = 2)]
fn assembling_areas(
    dataset: RefCell<Option<MemorySource>>,
    consumer: RefCell<Consumer>,
    events: RefCell<Vec<Event>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (dataset, consumer, events, outcome);
}

#[scenario(path = "tests/features/dispatch.feature", index = 3)]
fn omitting_incomplete_relations(
    dataset: RefCell<Option<MemorySource>>,
    consumer: RefCell<Consumer>,
    events: RefCell<Vec<Event>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (dataset, consumer, events, outcome);
}

#[scenario(path = "tests/features/dispatch.feature", index = 4)]
fn running_without_callbacks(
    dataset: RefCell<Option<MemorySource>>,
    consumer: RefCell<Consumer>,
    events: RefCell<Vec<Event>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (dataset, consumer, events, outcome);
}

#[scenario(path = "tests/features/dispatch.feature", index = 5)]
fn stopping_on_failures(
    dataset: RefCell<Option<MemorySource>>,
    consumer: RefCell<Consumer>,
    events: RefCell<Vec<Event>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (dataset, consumer, events, outcome);
}
