use arbor::archive::ZipPlanner;
use arbor::store::{MemoryNodeStore, Node};
use arbor::tree::{AncestorResolver, TreeBuilder};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{HashMap, HashSet};

/// Random forest: node `i` hangs under some earlier node, or is a root.
fn forest(parents: &[Option<Index>]) -> (MemoryNodeStore, HashMap<String, Option<String>>) {
    let mut links = HashMap::new();
    let nodes: Vec<Node> = parents
        .iter()
        .enumerate()
        .map(|(i, parent)| {
            let id = format!("n{}", i);
            let upper = match parent {
                Some(index) if i > 0 => Some(format!("n{}", index.index(i))),
                _ => None,
            };
            links.insert(id.clone(), upper.clone());
            let node = if i % 3 == 0 {
                Node::file(id.clone(), format!("name{}", i), "bin", format!("seg{}", i))
            } else {
                Node::folder(id.clone(), format!("name{}", i), format!("seg{}", i))
            };
            match upper {
                Some(upper) => node.under(upper),
                None => node,
            }
        })
        .collect();
    (MemoryNodeStore::with_nodes(nodes), links)
}

fn naive_descendants(links: &HashMap<String, Option<String>>, root: &str) -> HashSet<String> {
    links
        .keys()
        .filter(|id| {
            let mut current = links.get(*id).cloned().flatten();
            while let Some(upper) = current {
                if upper == root {
                    return true;
                }
                current = links.get(&upper).cloned().flatten();
            }
            false
        })
        .cloned()
        .collect()
}

fn naive_path(links: &HashMap<String, Option<String>>, id: &str) -> String {
    let mut segments = vec![format!("seg{}", &id[1..])];
    let mut current = links.get(id).cloned().flatten();
    while let Some(upper) = current {
        segments.push(format!("seg{}", &upper[1..]));
        current = links.get(&upper).cloned().flatten();
    }
    segments.reverse();
    segments.join("/")
}

proptest! {
    #[test]
    fn tree_holds_exactly_root_and_descendants(
        parents in prop::collection::vec(prop::option::weighted(0.8, any::<Index>()), 1..60)
    ) {
        let (store, links) = forest(&parents);
        let tree = TreeBuilder::new(&store).build("n0").unwrap();

        let ids: Vec<String> = tree.iter().map(|t| t.node.id.clone()).collect();
        let unique: HashSet<String> = ids.iter().cloned().collect();
        prop_assert_eq!(ids.len(), unique.len());

        let mut expected = naive_descendants(&links, "n0");
        expected.insert("n0".to_string());
        prop_assert_eq!(unique, expected);

        for subtree in tree.iter() {
            for child in subtree.children() {
                prop_assert_eq!(child.node.upper_id.as_deref(), Some(subtree.node.id.as_str()));
            }
        }
    }

    #[test]
    fn full_path_matches_naive_walk(
        parents in prop::collection::vec(prop::option::weighted(0.8, any::<Index>()), 1..40)
    ) {
        let (store, links) = forest(&parents);
        let resolver = AncestorResolver::new(&store);
        for id in links.keys() {
            prop_assert_eq!(resolver.full_path(id).unwrap(), naive_path(&links, id));
        }
    }

    #[test]
    fn planning_is_repeatable_and_key_unique(
        parents in prop::collection::vec(prop::option::weighted(0.8, any::<Index>()), 2..40),
        picks in prop::collection::vec(any::<Index>(), 1..4)
    ) {
        let (store, _) = forest(&parents);
        let roots: Vec<String> = picks.iter().map(|p| format!("n{}", p.index(parents.len()))).collect();
        let planner = ZipPlanner::new(&store, 1000);

        // Unrelated selections can legitimately collide on archive paths.
        if let Ok(first) = planner.plan(&roots) {
            let second = planner.plan(&roots).unwrap();
            prop_assert_eq!(&first.entries, &second.entries);

            let keys: HashSet<_> = first.entries.iter().map(|e| e.key()).collect();
            prop_assert_eq!(keys.len(), first.entries.len());
        }
    }
}
