use arbor::archive::{pack, MemoryContent, PackEntry, PathMapper, ZipPlanner};
use arbor::store::{MemoryNodeStore, Node};
use arbor::ApiError;
use chrono::{TimeZone, Utc};
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn module_entry(module: &str, physical: &str) -> PackEntry {
    let ts = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
    PackEntry {
        folder: module.to_string(),
        relative: String::new(),
        name: "f1".to_string(),
        node_type: "txt".to_string(),
        size: 2,
        physical_path: physical.to_string(),
        create_on: ts,
        modify_on: ts,
    }
}

fn content() -> MemoryContent {
    let mut content = MemoryContent::new();
    content.insert("data/1", b"one".to_vec());
    content.insert("data/2", b"two".to_vec());
    content
}

fn archive_names(entries: &[PackEntry], mapper: &PathMapper) -> Vec<String> {
    let outcome = pack(Cursor::new(Vec::new()), entries, &content(), mapper, false).unwrap();
    let bytes = outcome.sink.unwrap().into_inner();
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

#[test]
fn scenario_single_module_without_mapper() {
    let names = archive_names(&[module_entry("/A/a1/", "data/1")], &PathMapper::new());
    assert_eq!(names, vec!["A/a1/f1.txt"]);
}

#[test]
fn scenario_single_module_with_mapper() {
    let mapper = PathMapper::parse(r#"{"/A/a1/":"Aa1"}"#).unwrap();
    let names = archive_names(&[module_entry("/A/a1/", "data/1")], &mapper);
    assert_eq!(names, vec!["Aa1/f1.txt"]);
}

#[test]
fn scenario_two_modules_keep_distinct_folders() {
    let mapper = PathMapper::parse(r#"{"/A/a1/":"Aa1","/A/a2/":"Aa2"}"#).unwrap();
    let names = archive_names(
        &[module_entry("/A/a1/", "data/1"), module_entry("/A/a2/", "data/2")],
        &mapper,
    );
    assert_eq!(names, vec!["Aa1/f1.txt", "Aa2/f1.txt"]);
}

#[test]
fn empty_plan_packs_to_empty_archive() {
    let outcome = pack(Cursor::new(Vec::new()), &[], &content(), &PathMapper::new(), false).unwrap();
    let archive = ZipArchive::new(Cursor::new(outcome.sink.unwrap().into_inner())).unwrap();
    assert_eq!(archive.len(), 0);
}

#[test]
fn same_named_roots_under_common_ancestor_export_without_collision() {
    let store = MemoryNodeStore::with_nodes(vec![
        Node::folder("A", "A", "A"),
        Node::folder("a1", "a1", "a1").under("A"),
        Node::folder("a2", "a2", "a2").under("A"),
        Node::folder("m1", "module", "m1").under("a1"),
        Node::folder("m2", "module", "m2").under("a2"),
        Node::file("f1", "f1", "txt", "1").under("m1"),
        Node::file("f2", "f1", "txt", "2").under("m2"),
    ]);
    let plan = ZipPlanner::new(&store, 100).plan(&["m1", "m2"]).unwrap();
    let entries: Vec<PackEntry> = plan.entries.iter().map(PackEntry::from_plan).collect();

    let mut content = MemoryContent::new();
    content.insert("A/a1/m1/1", b"first".to_vec());
    content.insert("A/a2/m2/2", b"second".to_vec());

    let outcome = pack(
        Cursor::new(Vec::new()),
        &entries,
        &content,
        &PathMapper::new(),
        false,
    )
    .unwrap();
    let mut archive = ZipArchive::new(Cursor::new(outcome.sink.unwrap().into_inner())).unwrap();
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"a1/module/".to_string()));
    assert!(names.contains(&"a1/module/f1.txt".to_string()));
    assert!(names.contains(&"a2/module/f1.txt".to_string()));

    let mut text = String::new();
    archive
        .by_name("a2/module/f1.txt")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "second");
}

#[test]
fn entries_follow_planned_order() {
    let store = MemoryNodeStore::with_nodes(vec![
        Node::folder("r", "r", "r"),
        Node::file("b", "b", "txt", "b").under("r"),
        Node::file("a", "a", "txt", "a").under("r"),
    ]);
    let plan = ZipPlanner::new(&store, 100).plan(&["r"]).unwrap();
    let entries: Vec<PackEntry> = plan.entries.iter().map(PackEntry::from_plan).collect();

    let mut content = MemoryContent::new();
    content.insert("r/a", b"a".to_vec());
    content.insert("r/b", b"b".to_vec());
    let outcome = pack(Cursor::new(Vec::new()), &entries, &content, &PathMapper::new(), false).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(outcome.sink.unwrap().into_inner())).unwrap();
    let order: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(order, vec!["r/", "r/a.txt", "r/b.txt"]);
}

#[test]
fn unreadable_source_aborts_with_its_path() {
    let result = pack(
        Cursor::new(Vec::new()),
        &[module_entry("/A/", "data/1"), module_entry("/B/", "data/missing")],
        &content(),
        &PathMapper::new(),
        true,
    );
    match result {
        Err(ApiError::Io { path, .. }) => assert_eq!(path, "data/missing"),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn empty_folders_survive_packing() {
    let store = MemoryNodeStore::with_nodes(vec![
        Node::folder("r", "r", "r"),
        Node::folder("e", "empty", "e").under("r"),
        Node::file("f", "f", "txt", "f").under("r"),
    ]);
    let plan = ZipPlanner::new(&store, 100).plan(&["r"]).unwrap();
    let entries: Vec<PackEntry> = plan.entries.iter().map(PackEntry::from_plan).collect();

    let mut content = MemoryContent::new();
    content.insert("r/f", b"f".to_vec());
    let outcome = pack(Cursor::new(Vec::new()), &entries, &content, &PathMapper::new(), false).unwrap();
    let archive = ZipArchive::new(Cursor::new(outcome.sink.unwrap().into_inner())).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["r/", "r/empty/", "r/f.txt"]);
}

#[test]
fn disjoint_same_named_roots_pack_side_by_side() {
    let store = MemoryNodeStore::with_nodes(vec![
        Node::folder("r1", "docs", "r1"),
        Node::folder("r2", "docs", "r2"),
        Node::file("a", "readme", "md", "a").under("r1"),
        Node::file("b", "readme", "md", "b").under("r2"),
    ]);
    let plan = ZipPlanner::new(&store, 100).plan(&["r1", "r2"]).unwrap();
    let entries: Vec<PackEntry> = plan.entries.iter().map(PackEntry::from_plan).collect();

    let mut content = MemoryContent::new();
    content.insert("r1/a", b"first".to_vec());
    content.insert("r2/b", b"second".to_vec());
    let outcome = pack(Cursor::new(Vec::new()), &entries, &content, &PathMapper::new(), false).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(outcome.sink.unwrap().into_inner())).unwrap();

    let mut text = String::new();
    archive
        .by_name("docs (r2)/readme.md")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "second");
    assert!(archive.by_name("docs (r1)/readme.md").is_ok());
}
