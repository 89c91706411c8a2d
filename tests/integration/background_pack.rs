use arbor::archive::PathMapper;
use arbor::store::{MemoryNodeStore, Node};
use arbor::AttachmentService;
use std::io::Cursor;
use std::sync::Arc;

#[tokio::test]
async fn packages_on_blocking_pool() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(AttachmentService::new(
        Arc::new(MemoryNodeStore::new()),
        dir.path(),
    ));
    service
        .create(&[
            Node::folder("p", "project", "project"),
            Node::folder("a", "alpha", "alpha").under("p"),
            Node::folder("b", "beta", "beta").under("p"),
        ])
        .unwrap();
    service
        .upload(Node::file("f", "one", "txt", "one.txt").under("a"), &mut &b"1"[..])
        .unwrap();
    service
        .upload(Node::file("g", "two", "txt", "two.txt").under("b"), &mut &b"22"[..])
        .unwrap();

    let package = service
        .clone()
        .package_in_background(
            vec!["a".to_string(), "b".to_string()],
            Cursor::new(Vec::new()),
            PathMapper::new(),
            false,
        )
        .await
        .unwrap();

    assert_eq!(package.file_name, "project.zip");
    assert_eq!(package.outcome.bytes_written, 3);

    let bytes = package.outcome.sink.unwrap().into_inner();
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["alpha/", "alpha/one.txt", "beta/", "beta/two.txt"]);
}
