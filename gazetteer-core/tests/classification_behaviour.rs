//! Behavioural tests for classification and row emission using rstest-bdd.

use std::{cell::RefCell, fs, path::PathBuf};

use gazetteer_core::{
    Column, EmitSource, OsmEntity, OsmType, RowSink, Style, classify, emit_rows,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

const STYLE: &str = "\
amenity=restaurant main,main_named
shop               main,main_fallback
name               name
";

/// Row captured by [`RowCollector`]: class, type and the name map.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EmittedRow {
    class: String,
    kind: String,
    names: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct RowCollector {
    rows: Vec<EmittedRow>,
    columns: Vec<String>,
    names: Vec<(String, String)>,
}

impl RowSink for RowCollector {
    type Error = std::convert::Infallible;

    fn prepare(&mut self) -> Result<(), Self::Error> {
        self.columns.clear();
        self.names.clear();
        Ok(())
    }

    fn add_column(&mut self, column: Column<'_>) {
        match column {
            Column::Text(value) => self.columns.push(value.to_owned()),
            Column::Integer(value) => self.columns.push(value.to_string()),
            Column::Tags(pairs) => {
                if self.columns.len() == 4 {
                    self.names = pairs
                        .iter()
                        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                        .collect();
                }
                self.columns.push(String::from("<tags>"));
            }
            Column::Null => self.columns.push(String::from("<null>")),
        }
    }

    fn finish_row(&mut self) -> Result<(), Self::Error> {
        let class = self.columns.get(2).cloned().unwrap_or_default();
        let kind = self.columns.get(3).cloned().unwrap_or_default();
        self.rows.push(EmittedRow {
            class,
            kind,
            names: std::mem::take(&mut self.names),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Outcome {
    rows: Vec<EmittedRow>,
    has_data: bool,
}

#[fixture]
fn style() -> Style {
    Style::parse(STYLE).expect("behaviour style parses")
}

#[fixture]
fn entity() -> RefCell<Option<OsmEntity>> {
    RefCell::new(None)
}

#[fixture]
fn outcome() -> RefCell<Option<Outcome>> {
    RefCell::new(None)
}

fn set_node(target: &RefCell<Option<OsmEntity>>, tags: &[(&str, &str)]) {
    *target.borrow_mut() = Some(OsmEntity::new(OsmType::Node, 1, tags.iter().copied()));
}

fn expect_rows(outcome: &RefCell<Option<Outcome>>) -> Vec<EmittedRow> {
    outcome
        .borrow()
        .as_ref()
        .expect("the node was classified")
        .rows
        .clone()
}

#[given("a node tagged amenity=restaurant and name=Joe's")]
fn named_restaurant(#[from(entity)] target: &RefCell<Option<OsmEntity>>) {
    set_node(target, &[("amenity", "restaurant"), ("name", "Joe's")]);
}

#[given("a node tagged amenity=restaurant only")]
fn unnamed_restaurant(#[from(entity)] target: &RefCell<Option<OsmEntity>>) {
    set_node(target, &[("amenity", "restaurant")]);
}

#[given("a node tagged shop=bakery only")]
fn unnamed_shop(#[from(entity)] target: &RefCell<Option<OsmEntity>>) {
    set_node(target, &[("shop", "bakery")]);
}

#[given("a node tagged amenity=restaurant, shop=deli and name=Corner")]
fn named_restaurant_and_shop(#[from(entity)] target: &RefCell<Option<OsmEntity>>) {
    set_node(
        target,
        &[("amenity", "restaurant"), ("shop", "deli"), ("name", "Corner")],
    );
}

#[when("the node is classified and emitted")]
fn classify_and_emit(
    #[from(style)] style: &Style,
    #[from(entity)] target: &RefCell<Option<OsmEntity>>,
    #[from(outcome)] outcome: &RefCell<Option<Outcome>>,
) {
    let guard = target.borrow();
    let entity = guard.as_ref().expect("node prepared");
    let classification = classify(style, entity.tags());
    let mut sink = RowCollector::default();
    let source = EmitSource {
        osm_type: entity.osm_type,
        osm_id: entity.id,
        metadata: &entity.metadata,
        fields: style.metadata_fields(),
    };
    let Ok(_) = emit_rows(source, "POINT(0 0)", &classification, &mut sink);
    *outcome.borrow_mut() = Some(Outcome {
        rows: sink.rows,
        has_data: classification.has_data(),
    });
}

#[then("one row with class amenity and type restaurant is emitted")]
fn one_restaurant_row(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let rows = expect_rows(outcome);
    assert_eq!(rows.len(), 1, "expected exactly one row");
    assert_eq!(rows[0].class, "amenity");
    assert_eq!(rows[0].kind, "restaurant");
}

#[then("the row carries the name Joe's")]
fn row_carries_name(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let rows = expect_rows(outcome);
    assert_eq!(rows[0].names, [("name".to_owned(), "Joe's".to_owned())]);
}

#[then("no rows are emitted")]
fn no_rows(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    assert!(expect_rows(outcome).is_empty(), "expected no rows");
}

#[then("the classification has no data")]
fn no_data(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let borrowed = outcome.borrow();
    let result = borrowed.as_ref().expect("the node was classified");
    assert!(!result.has_data);
}

#[then("one row with class shop and type bakery is emitted")]
fn one_shop_row(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let rows = expect_rows(outcome);
    assert_eq!(rows.len(), 1, "expected exactly one row");
    assert_eq!(rows[0].class, "shop");
    assert_eq!(rows[0].kind, "bakery");
}

#[then("rows for the classes amenity,shop are emitted in order")]
fn rows_in_order(#[from(outcome)] outcome: &RefCell<Option<Outcome>>) {
    let classes: Vec<String> = expect_rows(outcome)
        .into_iter()
        .map(|row| row.class)
        .collect();
    assert_eq!(classes, ["amenity", "shop"]);
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/classification.feature");
    let contents = fs::read_to_string(&feature).unwrap_or_else(|err| {
        panic!("failed to read feature file {feature:?}: {err}");
    });
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "emitting a named restaurant",
            "dropping an unnamed restaurant",
            "keeping an unnamed shop as a fallback",
            "fanning out a named object with several classes",
        ],
        "scenario order changed in feature file"
    );
}

#[scenario(path = "tests/features/classification.feature", index = 0)]
fn emitting_named_restaurant(
    style: Style,
    entity: RefCell<Option<OsmEntity>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (style, entity, outcome);
}

#[scenario(path = "tests/features/classification.feature", index = 1)]
fn dropping_unnamed_restaurant(
    style: Style,
    entity: RefCell<Option<OsmEntity>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (style, entity, outcome);
}

#[scenario(path = "tests/features/classification.feature", index = 2)]
fn keeping_unnamed_shop(
    style: Style,
    entity: RefCell<Option<OsmEntity>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (style, entity, outcome);
}

#[scenario(path = "tests/features/classification.feature", index = 3)]
fn fanning_out_named_object(
    style: Style,
    entity: RefCell<Option<OsmEntity>>,
    outcome: RefCell<Option<Outcome>>,
) {
    let _ = (style, entity, outcome);
}
