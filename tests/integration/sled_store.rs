use arbor::store::{Node, NodeStore, NodeUpdate, SledNodeStore};
use arbor::tree::{AncestorResolver, TreeBuilder};
use tempfile::TempDir;

#[test]
fn hierarchy_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("store");

    {
        let store = SledNodeStore::open(&db_path).unwrap();
        store.put(&Node::folder("root", "root", "root")).unwrap();
        store.put(&Node::folder("sub", "sub", "sub").under("root")).unwrap();
        store
            .put(&Node::file("f", "f", "txt", "f.txt").under("sub").with_size(42))
            .unwrap();
        store.flush().unwrap();
    }

    let store = SledNodeStore::open(&db_path).unwrap();
    let node = store.get("f").unwrap().unwrap();
    assert_eq!(node.size, 42);
    assert_eq!(
        AncestorResolver::new(&store).full_path("f").unwrap(),
        "root/sub/f.txt"
    );
    assert_eq!(TreeBuilder::new(&store).build("root").unwrap().len(), 3);
}

#[test]
fn reparenting_updates_child_index() {
    let store = SledNodeStore::temporary().unwrap();
    store.put(&Node::folder("a", "a", "a")).unwrap();
    store.put(&Node::folder("b", "b", "b")).unwrap();
    let mut node = Node::file("f", "f", "txt", "f.txt").under("a");
    store.put(&node).unwrap();

    NodeUpdate {
        upper_id: Some(Some("b".to_string())),
        ..Default::default()
    }
    .apply(&mut node);
    store.put(&node).unwrap();

    assert!(store.children_of("a").unwrap().is_empty());
    assert_eq!(store.children_of("b").unwrap()[0].id, "f");
    let roots: Vec<_> = store.roots().unwrap().into_iter().map(|n| n.id).collect();
    assert_eq!(roots, vec!["a", "b"]);
}

#[test]
fn timestamps_round_trip_to_the_millisecond() {
    let store = SledNodeStore::temporary().unwrap();
    let node = Node::file("f", "f", "txt", "f.txt");
    store.put(&node).unwrap();
    let loaded = store.get("f").unwrap().unwrap();
    assert_eq!(
        loaded.modify_on.timestamp_millis(),
        node.modify_on.timestamp_millis()
    );
}
