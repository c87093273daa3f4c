//! Cache validity across consecutive runs.
//!
//! Each test runs the full pipeline more than once against the same fixture
//! and cache directory, and checks when the parser is and is not invoked.

use std::fs;

use quill_cache::{modified_time, ArtifactCache};
use quill_conformance::{generated, Fixture, Harness};
use quill_parse::PipelineOptions;

const USER: &str = "struct User {\n    let id: Int\n    var name: String\n}\n";
const ORDER: &str = "class Order {\n    var total: Double\n}\n\nextension Order: Codable {}\n";

fn two_file_fixture() -> Fixture {
    let fx = Fixture::new();
    fx.write("Models/User.swift", USER);
    fx.write("Models/Order.swift", ORDER);
    fx
}

fn keep_raw(options: PipelineOptions) -> PipelineOptions {
    PipelineOptions {
        keep_raw: true,
        ..options
    }
}

// ---------------------------------------------------------------------------
// Unchanged files
// ---------------------------------------------------------------------------

#[test]
fn second_run_parses_nothing() {
    let fx = two_file_fixture();
    let harness = Harness::new(keep_raw(fx.options()));

    let first = harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.take_parsed().len(), 2);
    assert_eq!(first.changed_count(), 2);

    let second = harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.calls(), 0);
    assert_eq!(second.changed_count(), 0);
    assert_eq!(second.total_files, 2);
    assert_eq!(second.scanned_files, 2);

    assert_eq!(
        first.raw.as_ref().unwrap().canonical(),
        second.raw.as_ref().unwrap().canonical()
    );
    assert_eq!(first.model, second.model);
}

#[test]
fn fresh_pipeline_reuses_existing_cache() {
    let fx = two_file_fixture();
    Harness::new(fx.options()).run(&fx.request()).unwrap();

    let later = Harness::new(fx.options());
    let report = later.run(&fx.request()).unwrap();
    assert_eq!(later.parser.calls(), 0);
    assert!(report.model.type_named("User").is_some());
}

// ---------------------------------------------------------------------------
// Modification time
// ---------------------------------------------------------------------------

#[test]
fn mtime_change_forces_reparse() {
    let fx = two_file_fixture();
    let harness = Harness::new(fx.options());
    harness.run(&fx.request()).unwrap();
    harness.parser.take_parsed();

    fx.bump_mtime("Models/User.swift");
    let report = harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.take_parsed(), vec![fx.path("Models/User.swift")]);
    assert_eq!(report.changed_files, vec![fx.path("Models/User.swift")]);

    // The entry now carries the new mtime, so the next run hits again.
    harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.calls(), 0);
}

#[test]
fn overwritten_entry_records_new_mtime() {
    let fx = two_file_fixture();
    let harness = Harness::new(fx.options());
    harness.run(&fx.request()).unwrap();

    fx.bump_mtime("Models/Order.swift");
    harness.run(&fx.request()).unwrap();

    let path = fx.path("Models/Order.swift");
    let cache = ArtifactCache::open(fx.cache_base(), &fx.root(), quill_parse::TOOL_VERSION).unwrap();
    let mtime = modified_time(&path).unwrap();
    let artifact = cache.lookup_at(&path, mtime).unwrap();
    assert_eq!(artifact.modified, Some(mtime));
}

#[test]
fn edited_content_is_picked_up() {
    let fx = two_file_fixture();
    let harness = Harness::new(fx.options());
    harness.run(&fx.request()).unwrap();

    fx.write("Models/User.swift", "struct User {\n    let id: Int\n    let email: String\n}\n");
    fx.bump_mtime("Models/User.swift");
    let report = harness.run(&fx.request()).unwrap();

    let user = report.model.type_named("User").unwrap();
    let vars: Vec<_> = user.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(vars, ["id", "email"]);
}

// ---------------------------------------------------------------------------
// Disabled cache
// ---------------------------------------------------------------------------

#[test]
fn disabled_cache_parses_every_run() {
    let fx = two_file_fixture();
    let harness = Harness::new(PipelineOptions {
        cache_disabled: true,
        ..fx.options()
    });

    for _ in 0..3 {
        let report = harness.run(&fx.request()).unwrap();
        assert_eq!(report.changed_count(), 2);
        assert_eq!(harness.parser.take_parsed().len(), 2);
    }
    assert_eq!(fs::read_dir(fx.cache_base()).unwrap().count(), 0);
}

// ---------------------------------------------------------------------------
// Damaged entries
// ---------------------------------------------------------------------------

fn assert_damage_is_a_miss(damage: impl Fn(&std::path::Path)) {
    let fx = two_file_fixture();
    let harness = Harness::new(fx.options());
    harness.run(&fx.request()).unwrap();
    harness.parser.take_parsed();

    let entry = fx.cache_entry("Models/User.swift");
    let good = fs::read(&entry).unwrap();
    damage(&entry);

    let report = harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.take_parsed(), vec![fx.path("Models/User.swift")]);
    assert!(report.model.type_named("User").is_some());
    assert_eq!(fs::read(&entry).unwrap(), good);

    harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.calls(), 0);
}

#[test]
fn garbage_entry_is_a_miss() {
    assert_damage_is_a_miss(|entry| fs::write(entry, b"not a cache entry at all").unwrap());
}

#[test]
fn truncated_entry_is_a_miss() {
    assert_damage_is_a_miss(|entry| {
        let bytes = fs::read(entry).unwrap();
        fs::write(entry, &bytes[..bytes.len() / 2]).unwrap();
    });
}

#[test]
fn empty_entry_is_a_miss() {
    assert_damage_is_a_miss(|entry| fs::write(entry, b"").unwrap());
}

#[test]
fn flipped_payload_byte_is_a_miss() {
    assert_damage_is_a_miss(|entry| {
        let mut bytes = fs::read(entry).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(entry, bytes).unwrap();
    });
}

#[test]
fn entry_from_another_version_is_a_miss() {
    let fx = two_file_fixture();
    let path = fx.path("Models/User.swift");

    let foreign = ArtifactCache::open(fx.cache_base(), &fx.root(), "0.0.0-foreign").unwrap();
    let mut artifact = quill_model::ParseArtifact::empty(&path, None);
    artifact.types.push(quill_model::TypeDecl::new("Stale", quill_model::TypeKind::Struct));
    foreign
        .store(&path, &artifact, modified_time(&path).unwrap())
        .unwrap();

    let harness = Harness::new(fx.options());
    let report = harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.calls(), 2);
    assert!(report.model.type_named("Stale").is_none());
    assert!(report.model.type_named("User").is_some());
}

// ---------------------------------------------------------------------------
// Force-parse
// ---------------------------------------------------------------------------

#[test]
fn force_parsed_file_is_parsed_every_run() {
    let fx = two_file_fixture();
    fx.write(
        "Models/AutoEquatable.generated.swift",
        &generated("extension User: Equatable {}\n"),
    );
    let harness = Harness::new(PipelineOptions {
        force_parse: vec!["generated".to_string()],
        ..fx.options()
    });

    let first = harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.take_parsed().len(), 3);
    assert!(first
        .model
        .type_named("User")
        .unwrap()
        .inherits
        .contains(&"Equatable".to_string()));

    let second = harness.run(&fx.request()).unwrap();
    assert_eq!(
        harness.parser.take_parsed(),
        vec![fx.path("Models/AutoEquatable.generated.swift")]
    );
    assert_eq!(second.changed_count(), 1);
    assert_eq!(first.model, second.model);
}

#[test]
fn generated_file_without_force_parse_is_never_parsed() {
    let fx = two_file_fixture();
    fx.write(
        "Models/AutoEquatable.generated.swift",
        &generated("extension User: Equatable {}\n"),
    );
    let harness = Harness::new(fx.options());

    let report = harness.run(&fx.request()).unwrap();
    assert_eq!(harness.parser.calls(), 2);
    assert_eq!(report.total_files, 3);
    assert_eq!(report.scanned_files, 2);
    assert!(!report
        .model
        .type_named("User")
        .unwrap()
        .inherits
        .contains(&"Equatable".to_string()));
}
