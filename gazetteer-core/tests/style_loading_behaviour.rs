//! Behavioural tests for `Style::load`.

use std::{cell::RefCell, fs, path::PathBuf};

use camino::Utf8PathBuf;
use gazetteer_core::{MatcherKind, Style, StyleError, StyleFlags};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

#[derive(Debug)]
struct StyleWorld {
    temp_dir: TempDir,
    path: RefCell<Option<Utf8PathBuf>>,
    result: RefCell<Option<Result<Style, StyleError>>>,
}

impl StyleWorld {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            path: RefCell::new(None),
            result: RefCell::new(None),
        }
    }

    fn style_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.temp_dir.path().join("import.style"))
            .expect("temporary paths are UTF-8")
    }

    fn write_style(&self, contents: &str) {
        let path = self.style_path();
        fs::write(&path, contents).expect("write style file");
        self.path.replace(Some(path));
    }

    fn expect_style(&self) -> Style {
        self.result
            .borrow()
            .as_ref()
            .expect("the style was loaded")
            .as_ref()
            .expect("expected the style to load")
            .clone()
    }
}

#[fixture]
fn world() -> StyleWorld {
    StyleWorld::new()
}

#[given("a style file with three rules and a default")]
fn valid_style(world: &StyleWorld) {
    world.write_style(
        "# gazetteer style\n\
         amenity=restaurant main,main_named\n\
         \n\
         shop main,main_fallback\n\
         *=yes extra\n\
         * extra\n",
    );
}

#[given("a style file whose second line uses the flag with_name")]
fn unknown_flag_style(world: &StyleWorld) {
    world.write_style("shop main\namenity main,with_name\n");
}

#[given("a path to a missing style file")]
fn missing_style(world: &StyleWorld) {
    world.path.replace(Some(world.style_path()));
}

#[when("the style file is loaded")]
fn load_style(world: &StyleWorld) {
    let path = world
        .path
        .borrow()
        .clone()
        .expect("style path prepared before loading");
    world.result.replace(Some(Style::load(&path)));
}

#[then("the style holds three rules in file order")]
fn three_rules(world: &StyleWorld) {
    let style = world.expect_style();
    let kinds: Vec<MatcherKind> = style.rules().iter().map(|rule| rule.kind()).collect();
    assert_eq!(
        kinds,
        [MatcherKind::Full, MatcherKind::Key, MatcherKind::Value]
    );
}

#[then("unmatched tags receive the default flags")]
fn default_flags(world: &StyleWorld) {
    let style = world.expect_style();
    assert_eq!(style.find_flags("wheelchair", "limited"), StyleFlags::EXTRA);
    assert_eq!(style.default_flags(), StyleFlags::EXTRA);
}

#[then("loading fails naming line 2 and the token with_name")]
fn unknown_flag_error(world: &StyleWorld) {
    let borrowed = world.result.borrow();
    match borrowed.as_ref().expect("the style was loaded") {
        Err(StyleError::UnknownFlag { line, token }) => {
            assert_eq!(*line, 2);
            assert_eq!(token, "with_name");
        }
        other => panic!("expected an unknown flag error, got {other:?}"),
    }
}

#[then("loading fails with a read error")]
fn read_error(world: &StyleWorld) {
    let borrowed = world.result.borrow();
    match borrowed.as_ref().expect("the style was loaded") {
        Err(StyleError::Read { path, .. }) => {
            assert!(path.ends_with("import.style"), "unexpected path {path}");
        }
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/style_loading.feature");
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
            "loading a valid style file",
            "rejecting an unknown flag",
            "reporting a missing style file",
        ],
        "scenario order changed in feature file"
    );
}

#[scenario(path = "tests/features/style_loading.feature", index = 0)]
fn loading_valid_style(world: StyleWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/style_loading.feature", index = 1)]
fn rejecting_unknown_flag(world: StyleWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/style_loading.feature", index = 2)]
fn reporting_missing_style(world: StyleWorld) {
    let _ = world;
}
