use arbor::store::{MemoryNodeStore, Node, NodeStore};
use arbor::tree::{reduce, AncestorResolver, TreeBuilder};
use arbor::ApiError;

// project ─┬─ specs ─┬─ api.md
//          │         └─ drafts ─ v1.md
//          └─ assets ─ logo.png
// archive ─ old.txt
fn forest() -> MemoryNodeStore {
    MemoryNodeStore::with_nodes(vec![
        Node::folder("p", "project", "project"),
        Node::folder("s", "specs", "specs").under("p"),
        Node::file("api", "api", "md", "api.md").under("s"),
        Node::folder("dr", "drafts", "drafts").under("s"),
        Node::file("v1", "v1", "md", "v1.md").under("dr"),
        Node::folder("as", "assets", "assets").under("p"),
        Node::file("logo", "logo", "png", "logo.png").under("as"),
        Node::folder("ar", "archive", "archive"),
        Node::file("old", "old", "txt", "old.txt").under("ar"),
    ])
}

#[test]
fn full_path_joins_every_ancestor_segment() {
    let store = forest();
    let resolver = AncestorResolver::new(&store);
    assert_eq!(resolver.full_path("v1").unwrap(), "project/specs/drafts/v1.md");
    assert_eq!(resolver.full_path("p").unwrap(), "project");
    assert_eq!(
        resolver.full_path_from("v1", "s").unwrap(),
        "drafts/v1.md"
    );
}

#[test]
fn unknown_ids_are_not_found() {
    let store = forest();
    let resolver = AncestorResolver::new(&store);
    assert!(matches!(resolver.full_path("nope"), Err(ApiError::NotFound(_))));
    assert!(matches!(
        TreeBuilder::new(&store).build("nope"),
        Err(ApiError::NotFound(_))
    ));
}

#[test]
fn dangling_parent_is_corrupt() {
    let store = forest();
    store.put(&Node::file("lost", "lost", "txt", "lost.txt").under("gone")).unwrap();
    let resolver = AncestorResolver::new(&store);
    assert!(matches!(
        resolver.full_path("lost"),
        Err(ApiError::CorruptHierarchy { .. })
    ));
}

#[test]
fn cycle_trips_the_depth_guard() {
    let store = MemoryNodeStore::with_nodes(vec![
        Node::folder("a", "a", "a").under("b"),
        Node::folder("b", "b", "b").under("a"),
    ]);
    let resolver = AncestorResolver::with_max_depth(&store, 16);
    assert!(matches!(
        resolver.full_path("a"),
        Err(ApiError::CorruptHierarchy { .. })
    ));
}

#[test]
fn tree_contains_each_descendant_once_under_its_parent() {
    let store = forest();
    let tree = TreeBuilder::new(&store).build("p").unwrap();
    let ids: Vec<_> = tree.iter().map(|t| t.node.id.as_str()).collect();
    assert_eq!(ids.len(), 7);
    for subtree in tree.iter() {
        for child in subtree.children() {
            assert_eq!(child.node.upper_id.as_deref(), Some(subtree.node.id.as_str()));
        }
    }
}

#[test]
fn disjoint_roots_share_no_ancestor() {
    let store = forest();
    let resolver = AncestorResolver::new(&store);
    let reduction = reduce(&resolver, &["dr", "old"]).unwrap();
    assert!(reduction.common_ancestor.is_none());
    let reduction = reduce(&resolver, &["v1", "logo"]).unwrap();
    assert_eq!(reduction.common_ancestor_id(), Some("p"));
}
