//! Behavioural tests for append-mode updates through `PlaceOutput`.

use std::{cell::RefCell, fs, path::PathBuf};

use camino::Utf8PathBuf;
use gazetteer_core::{OsmEntity, OsmType, Style};
use gazetteer_data::{Mode, PlaceOutput};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use rusqlite::Connection;
use tempfile::TempDir;

const STYLE: &str = "\
amenity=restaurant main,main_named
amenity main
shop main
name name
";

struct PlaceWorld {
    _temp_dir: TempDir,
    database: Utf8PathBuf,
    output: RefCell<PlaceOutput>,
}

impl PlaceWorld {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let database = Utf8PathBuf::from_path_buf(temp_dir.path().join("place.db"))
            .expect("temporary paths are UTF-8");
        let style = Style::parse(STYLE).expect("valid style");
        let output = PlaceOutput::open(style, &database).expect("open place output");
        Self {
            _temp_dir: temp_dir,
            database,
            output: RefCell::new(output),
        }
    }

    fn write(&self, entity: &OsmEntity, geometry: &str, mode: Mode) {
        let mut output = self.output.borrow_mut();
        output
            .process(entity, Some(geometry), mode)
            .expect("process entity");
        output.sync().expect("sync output");
    }

    fn classes(&self, osm_type: &str, osm_id: i64) -> Vec<String> {
        let reader = Connection::open(self.database.as_std_path()).expect("open reader");
        let mut statement = reader
            .prepare("SELECT class FROM place WHERE osm_type = ?1 AND osm_id = ?2 ORDER BY class")
            .expect("prepare select");
        statement
            .query_map((osm_type, osm_id), |row| row.get(0))
            .expect("query classes")
            .collect::<Result<_, _>>()
            .expect("read classes")
    }
}

#[fixture]
fn world() -> PlaceWorld {
    PlaceWorld::new()
}

#[given("a place database holding node 1 as a cafe and a bakery")]
fn cafe_and_bakery(world: &PlaceWorld) {
    let entity = OsmEntity::new(
        OsmType::Node,
        1,
        [("amenity", "cafe"), ("shop", "bakery"), ("name", "Crumbs")],
    );
    world.write(&entity, "POINT(2 3)", Mode::Create);
    assert_eq!(world.classes("N", 1), ["amenity", "shop"]);
}

#[given("a place database holding way 7 as a named restaurant")]
fn named_restaurant(world: &PlaceWorld) {
    let entity = OsmEntity::new(
        OsmType::Way,
        7,
        [("amenity", "restaurant"), ("name", "Trattoria")],
    );
    world.write(&entity, "LINESTRING(0 0,1 1)", Mode::Create);
    assert_eq!(world.classes("W", 7), ["amenity"]);
}

#[when("node 1 is updated to only a bakery")]
fn bakery_only(world: &PlaceWorld) {
    let entity = OsmEntity::new(OsmType::Node, 1, [("shop", "bakery")]);
    world.write(&entity, "POINT(2 3)", Mode::Append);
}

#[when("node 1 is deleted upstream")]
fn delete_node(world: &PlaceWorld) {
    let mut output = world.output.borrow_mut();
    output.delete(OsmType::Node, 1).expect("queue delete");
    output.sync().expect("sync output");
}

#[when("way 7 is updated without its name")]
fn unnamed_restaurant(world: &PlaceWorld) {
    let entity = OsmEntity::new(OsmType::Way, 7, [("amenity", "restaurant")]);
    world.write(&entity, "LINESTRING(0 0,1 1)", Mode::Append);
}

#[then("node 1 keeps only its shop row")]
fn only_shop(world: &PlaceWorld) {
    assert_eq!(world.classes("N", 1), ["shop"]);
}

#[then("node 1 has no rows")]
fn node_gone(world: &PlaceWorld) {
    assert!(world.classes("N", 1).is_empty());
}

#[then("way 7 has no rows")]
fn way_gone(world: &PlaceWorld) {
    assert!(world.classes("W", 7).is_empty());
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/place_update.feature");
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
            "reclassifying a place drops its lost classes",
            "removing a deleted object",
            "dropping a restaurant that lost its name",
        ],
        "scenario order changed in feature file"
    );
}

#[scenario(path = "tests/features/place_update.feature", index = 0)]
fn reclassifying_place(world: PlaceWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/place_update.feature", index = 1)]
fn removing_deleted_object(world: PlaceWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/place_update.feature", index = 2)]
fn dropping_unnamed_restaurant(world: PlaceWorld) {
    let _ = world;
}
