mod common;

use common::{payload, scratch_paths, Reply, TestServer};
use craftdeck::fetch::FetchError;
use craftdeck::{ModCatalogEntry, ModError, ModLibrary, Progress, SelectionContext, SelectionError};
use pretty_assertions::assert_eq;
use serde_json::json;

fn hits(n: usize) -> serde_json::Value {
    let hits: Vec<_> = (0..n)
        .map(|i| json!({"project_id": format!("p{i}"), "title": format!("Mod {i}"), "description": "d"}))
        .collect();
    json!({ "hits": hits, "total_hits": 400 })
}

fn catalog() -> TestServer {
    TestServer::start(|base| {
        vec![
            ("/mods/search".into(), Reply::json(hits(10))),
            (
                "/mods/project/p0/version".into(),
                Reply::json(json!([
                    {"version_number": "0.5.8", "files": [
                        {"filename": "sodium-sources.zip", "url": format!("{base}/cdn/sources.zip")},
                        {"filename": "sodium-fabric-0.5.8.jar", "url": format!("{base}/cdn/sodium.jar")}
                    ]},
                    {"version_number": "0.5.7", "files": [
                        {"filename": "sodium-fabric-0.5.7.jar", "url": format!("{base}/cdn/old.jar")}
                    ]}
                ])),
            ),
            (
                "/mods/project/p1/version".into(),
                Reply::json(json!([{"files": [{"filename": "pack.zip", "url": format!("{base}/cdn/pack.zip")}]}])),
            ),
            ("/cdn/sodium.jar".into(), Reply::bytes(payload(9_000))),
        ]
    })
}

#[test]
fn search_then_pick_then_download() {
    let server = catalog();
    let (_tmp, paths) = scratch_paths();
    let fetcher = server.fetcher();
    let library = ModLibrary::open(&fetcher, &paths);

    let mut last = SelectionContext::new();
    let results = library.search("sodium").unwrap();
    assert!(results.len() <= 10);
    last.remember(results);

    let entry: ModCatalogEntry = last.select(1).unwrap().clone();
    assert_eq!(entry.id, "p0");
    let mut saw_progress = false;
    let path = library
        .download(&entry.id, &mut |_: Progress| saw_progress = true)
        .unwrap();

    assert!(saw_progress);
    assert_eq!(path, paths.mods_dir().join("sodium-fabric-0.5.8.jar"));
    let jars: Vec<_> = std::fs::read_dir(paths.mods_dir())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().into_string().unwrap())
        .collect();
    assert_eq!(jars, vec!["sodium-fabric-0.5.8.jar".to_string()]);
    assert_eq!(std::fs::read(&path).unwrap().len(), 9_000);

    let searched = server.requested();
    assert!(searched[0].starts_with("/mods/search?query=sodium"));
    assert!(searched[0].contains("limit=10"));
}

#[test]
fn featured_listing_asks_for_relevance() {
    let server = catalog();
    let (_tmp, paths) = scratch_paths();
    let fetcher = server.fetcher();
    let library = ModLibrary::open(&fetcher, &paths);

    assert_eq!(library.list_featured().unwrap().len(), 10);
    let request = &server.requested()[0];
    assert!(request.contains("index=relevance"));
    assert!(request.contains("limit=10"));
}

#[test]
fn project_without_jar_reports_no_archive() {
    let server = catalog();
    let (_tmp, paths) = scratch_paths();
    let fetcher = server.fetcher();
    let library = ModLibrary::open(&fetcher, &paths);

    let err = library.download("p1", &mut |_: Progress| {}).unwrap_err();
    assert!(matches!(err, ModError::Fetch(FetchError::NoArchiveFound(ref id)) if id == "p1"), "{err}");
    assert_eq!(std::fs::read_dir(paths.mods_dir()).unwrap().count(), 0);
}

#[test]
fn unknown_project_is_not_found() {
    let server = catalog();
    let (_tmp, paths) = scratch_paths();
    let fetcher = server.fetcher();
    let library = ModLibrary::open(&fetcher, &paths);

    let err = library.download("nope", &mut |_: Progress| {}).unwrap_err();
    assert!(matches!(err, ModError::Fetch(FetchError::NotFound(_))), "{err}");
}

#[test]
fn pick_outside_listing_is_invalid() {
    let mut last: SelectionContext<ModCatalogEntry> = SelectionContext::new();
    assert_eq!(last.select(1).unwrap_err(), SelectionError::NoListing);
    last.remember(serde_json::from_value::<Vec<ModCatalogEntry>>(json!([
        {"project_id": "a", "title": "A", "description": ""}
    ]))
    .unwrap());
    assert_eq!(last.select(2).unwrap_err(), SelectionError::OutOfRange { index: 2, len: 1 });
}

#[test]
fn delete_all_removes_only_jars() {
    let server = TestServer::start(|_| Vec::new());
    let (_tmp, paths) = scratch_paths();
    let fetcher = server.fetcher();
    let library = ModLibrary::open(&fetcher, &paths);

    for name in ["a.jar", "b.jar", "c.jar", "notes.txt"] {
        std::fs::write(paths.mods_dir().join(name), "x").unwrap();
    }
    assert_eq!(library.delete_all().unwrap(), 3);

    let left: Vec<_> = std::fs::read_dir(paths.mods_dir())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().into_string().unwrap())
        .collect();
    assert_eq!(left, vec!["notes.txt".to_string()]);
}

#[test]
fn delete_all_on_missing_dir_is_zero() {
    let server = TestServer::start(|_| Vec::new());
    let tmp = tempfile::tempdir().unwrap();
    let fetcher = server.fetcher();
    let library = ModLibrary::new(&fetcher, tmp.path().join("absent"));
    assert_eq!(library.delete_all().unwrap(), 0);
}
