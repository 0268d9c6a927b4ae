use lineage_forest::{BuildConfig, BuildError, ForestBuilder, Forests, Link};
use lineage_history::{
    Change, ChangeKind, ChangeRecord, ElementKind, History, Location, RevisionGraph,
};
use lineage_test_utils::{modified_method_history, HistoryBuilder};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::BTreeSet;

fn build(history: &History) -> Forests {
    ForestBuilder::new(history).build_all().unwrap()
}

fn build_strict(history: &History) -> Forests {
    let config = BuildConfig::new().with_graft_shared_ancestors(false);
    ForestBuilder::with_config(history, config)
        .build_all()
        .unwrap()
}

#[test]
fn test_modified_method_forms_one_tree() {
    let history = modified_method_history();
    let forests = build(&history);

    let methods = forests.methods();
    assert_eq!(methods.len(), 1);
    let tree = methods.trees().next().unwrap();
    assert_eq!(tree.len(), 2);
    assert_eq!(
        tree.nodes().collect::<Vec<_>>(),
        vec![Location::member(0, 0, 0, 0), Location::member(1, 0, 0, 0)]
    );
    assert_eq!(tree.seed(), Location::member(1, 0, 0, 0));
    assert_eq!(tree.roots(), vec![Location::member(0, 0, 0, 0)]);
    assert_eq!(forests.files().len(), 1);
    assert_eq!(forests.declarations().len(), 1);
}

#[test]
fn test_rename_links_through_previous_signature() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("F.java", ChangeKind::Added)
        .decl("C", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .revision("c1", &[0])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method_change(Change::new("n(int)", ChangeKind::Modified).renamed_from("m()"))
        .branch("main", 1)
        .build_checked();

    let forests = build(&history);
    let methods = forests.methods();
    assert_eq!(methods.len(), 1);
    assert_eq!(
        methods.tree_of(Location::member(0, 0, 0, 0)),
        methods.tree_of(Location::member(1, 0, 0, 0))
    );
}

#[test]
fn test_renamed_file_keeps_declarations_linked() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("a/F.java", ChangeKind::Added)
        .decl("a.C", ChangeKind::Added)
        .revision("c1", &[0])
        .file_change(Change::new("b/F.java", ChangeKind::Modified).renamed_from("a/F.java"))
        .decl("a.C", ChangeKind::Modified)
        .branch("main", 1)
        .build_checked();

    let forests = build(&history);
    assert_eq!(forests.files().len(), 1);
    assert_eq!(forests.declarations().len(), 1);
    assert_eq!(forests.declarations().assigned(), 2);
}

#[test]
fn test_ambiguous_file_predecessor_discards_tree() {
    // two unrelated roots both add F.java, joined by an empty merge
    let history = HistoryBuilder::new()
        .revision("a", &[])
        .file("F.java", ChangeKind::Added)
        .revision("b", &[])
        .file("F.java", ChangeKind::Added)
        .revision("merge", &[0, 1])
        .revision("c3", &[2])
        .file("F.java", ChangeKind::Modified)
        .branch("main", 3)
        .build_checked();

    let forests = build(&history);
    let files = forests.files();
    assert_eq!(files.tree_of(Location::file(3, 0)), None);
    assert_eq!(files.stats().failed_ambiguous, 1);
    assert_eq!(files.len(), 2);
    assert!(files.trees().all(|t| !t.contains(Location::file(3, 0))));
}

#[test]
fn test_ambiguous_method_predecessor_discards_tree() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("F.java", ChangeKind::Added)
        .decl("C", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .revision("c1", &[0])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method("m()", ChangeKind::Modified)
        .branch("main", 1)
        .build_checked();

    let forests = build(&history);
    let methods = forests.methods();
    assert_eq!(methods.tree_of(Location::member(1, 0, 0, 0)), None);
    assert_eq!(methods.stats().failed_ambiguous, 1);
    assert_eq!(methods.len(), 2);
}

#[test]
fn test_same_signature_in_other_class_is_not_a_candidate() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("F.java", ChangeKind::Added)
        .decl("C", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .decl("D", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .revision("c1", &[0])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method("m()", ChangeKind::Modified)
        .branch("main", 1)
        .build_checked();

    let forests = build(&history);
    let methods = forests.methods();
    assert_eq!(methods.len(), 2);
    assert_eq!(
        methods.tree_of(Location::member(1, 0, 0, 0)),
        methods.tree_of(Location::member(0, 0, 0, 0))
    );
    assert_eq!(methods.stats().failed(), 0);
}

#[test]
fn test_deleted_record_has_no_successor() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("F.java", ChangeKind::Added)
        .decl("C", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .revision("c1", &[0])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method("m()", ChangeKind::Deleted)
        .revision("c2", &[1])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method("m()", ChangeKind::Modified)
        .branch("main", 2)
        .build_checked();

    let forests = build(&history);
    let methods = forests.methods();
    let deleted = Location::member(1, 0, 0, 0);

    // the modification after the deletion has nowhere to go
    assert_eq!(methods.tree_of(Location::member(2, 0, 0, 0)), None);
    assert_eq!(methods.stats().failed_missing, 1);
    for tree in methods.trees() {
        assert!(tree.links().iter().all(|l| l.predecessor != deleted));
    }
    assert!(methods.tree_of(deleted).is_some());
}

#[test]
fn test_merge_joins_both_sides() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("F.java", ChangeKind::Added)
        .revision("left", &[0])
        .file("F.java", ChangeKind::Modified)
        .revision("right", &[0])
        .file("F.java", ChangeKind::Modified)
        .revision("merge", &[1, 2])
        .file_change(Change::new("F.java", ChangeKind::Modified).with_second(ChangeKind::Modified))
        .branch("main", 3)
        .build_checked();

    let forests = build(&history);
    let files = forests.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files.assigned(), 4);
    let tree = files.trees().next().unwrap();
    assert_eq!(tree.links().len(), 4);
    assert!(tree.links().contains(&Link {
        successor: Location::file(3, 0),
        predecessor: Location::file(2, 0),
    }));
}

#[test]
fn test_merge_side_added_needs_no_predecessor() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("F.java", ChangeKind::Added)
        .revision("c1", &[])
        .revision("merge", &[0, 1])
        .file_change(Change::new("F.java", ChangeKind::Unchanged).with_second(ChangeKind::Added))
        .branch("main", 2)
        .build_checked();

    let forests = build(&history);
    assert_eq!(forests.files().len(), 1);
    assert_eq!(forests.files().assigned(), 2);
}

#[test]
fn test_diverged_branches_claim_shared_ancestor_once() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("F.java", ChangeKind::Added)
        .revision("left", &[0])
        .file("F.java", ChangeKind::Modified)
        .revision("right", &[0])
        .file("F.java", ChangeKind::Modified)
        .branch("left", 1)
        .branch("right", 2)
        .build_checked();

    let forests = build(&history);
    let files = forests.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files.assigned(), 3);
    assert_eq!(files.stats().grafted, 1);
    assert_eq!(files.stats().failed(), 0);
    assert_eq!(files.tree_of(Location::file(1, 0)), files.tree_of(Location::file(2, 0)));

    let strict = build_strict(&history);
    let files = strict.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files.tree_of(Location::file(1, 0)), None);
    assert_eq!(files.stats().failed_claimed, 1);
}

#[test]
fn test_forked_rename_joins_the_shared_tree() {
    let history = HistoryBuilder::new()
        .revision("r0", &[])
        .file("F.java", ChangeKind::Added)
        .decl("C", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .revision("feature1", &[0])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method("m()", ChangeKind::Modified)
        .revision("feature2", &[1])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method_change(Change::new("n()", ChangeKind::Modified).renamed_from("m()"))
        .revision("main1", &[0])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method("m()", ChangeKind::Modified)
        .branch("feature", 2)
        .branch("main", 3)
        .build_checked();

    let forests = build(&history);
    for forest in forests.iter() {
        assert_eq!(forest.len(), 1, "{} forest", forest.kind());
        assert_eq!(forest.assigned(), 4, "{} forest", forest.kind());
        assert_eq!(forest.stats().failed(), 0, "{} forest", forest.kind());
    }
    let methods = forests.methods();
    let tree = methods.trees().next().unwrap();
    assert_eq!(tree.roots(), vec![Location::member(0, 0, 0, 0)]);
    assert!(tree.links().contains(&Link {
        successor: Location::member(2, 0, 0, 0),
        predecessor: Location::member(1, 0, 0, 0),
    }));

    let strict = build_strict(&history);
    assert_eq!(strict.methods().assigned(), 2);
    assert_eq!(strict.methods().stats().failed_detached, 2);
}

#[test]
fn test_missing_parent_fails_only_that_tree() {
    let history = HistoryBuilder::new()
        .revision("c0", &[])
        .file("A.java", ChangeKind::Added)
        .revision("c1", &[7])
        .file("B.java", ChangeKind::Modified)
        .branch("main", 1)
        .build();

    let forests = build(&history);
    let files = forests.files();
    assert_eq!(files.len(), 1);
    assert_eq!(files.stats().failed_graph, 1);
}

#[test]
fn test_member_forest_requires_declarations() {
    let history = modified_method_history();
    let builder = ForestBuilder::new(&history);

    let err = builder.build(ElementKind::Method, None).unwrap_err();
    assert!(matches!(
        err,
        BuildError::ScopeNotBuilt {
            kind: ElementKind::Method,
            requires: ElementKind::Declaration,
        }
    ));

    let files = builder.build(ElementKind::File, None).unwrap();
    assert!(builder.build(ElementKind::Field, Some(&files)).is_err());
    let decls = builder.build(ElementKind::Declaration, Some(&files)).unwrap();
    assert!(builder.build(ElementKind::Field, Some(&decls)).is_ok());
}

#[test]
fn test_sequential_members_match_parallel() {
    let history = modified_method_history();
    let parallel = build(&history);
    let sequential = ForestBuilder::with_config(&history, BuildConfig::new().with_parallel_members(false))
        .build_all()
        .unwrap();
    for kind in ElementKind::ALL {
        assert_eq!(parallel.get(kind).assigned(), sequential.get(kind).assigned());
        assert_eq!(parallel.get(kind).stats(), sequential.get(kind).stats());
    }
}

fn kind_of(code: u8) -> ChangeKind {
    match code % 4 {
        0 => ChangeKind::Added,
        1 => ChangeKind::Modified,
        2 => ChangeKind::Deleted,
        _ => ChangeKind::Unchanged,
    }
}

type RevisionPlan = (Index, Option<Index>, Vec<(usize, u8, u8)>);

fn arb_history() -> impl Strategy<Value = History> {
    prop::collection::vec(
        (
            any::<Index>(),
            prop::option::of(any::<Index>()),
            prop::collection::vec((0..4usize, any::<u8>(), any::<u8>()), 0..4),
        ),
        1..12,
    )
    .prop_map(|plan: Vec<RevisionPlan>| {
        let mut builder = HistoryBuilder::new();
        for (i, (first, second, methods)) in plan.into_iter().enumerate() {
            let mut parents = Vec::new();
            if i > 0 {
                parents.push(first.index(i));
                if let Some(second) = second {
                    let p = second.index(i);
                    if !parents.contains(&p) {
                        parents.push(p);
                    }
                }
            }
            let merge = parents.len() > 1;
            let shell = if parents.is_empty() {
                ChangeKind::Added
            } else {
                ChangeKind::Modified
            };
            let sided = |change: Change| {
                if merge {
                    change.with_second(ChangeKind::Modified)
                } else {
                    change
                }
            };

            builder = builder
                .revision(&format!("c{i}"), &parents)
                .file_change(sided(Change::new("F.java", shell)))
                .decl_change(sided(Change::new("C", shell)));
            for (m, a, b) in methods {
                let mut change = Change::new(format!("m{m}()"), kind_of(a));
                if merge {
                    change = change.with_second(kind_of(b));
                }
                builder = builder.method_change(change);
            }
        }
        builder.build_checked()
    })
}

proptest! {
    #[test]
    fn prop_every_record_belongs_to_at_most_one_tree(history in arb_history()) {
        let forests = build(&history);
        for forest in forests.iter() {
            let mut seen = BTreeSet::new();
            for tree in forest.trees() {
                for node in tree.nodes() {
                    prop_assert!(seen.insert(node), "{} in two trees", node);
                    prop_assert_eq!(forest.tree_of(node), Some(tree.id()));
                }
                for link in tree.links() {
                    prop_assert!(tree.contains(link.successor));
                    prop_assert!(tree.contains(link.predecessor));
                }
            }
            prop_assert_eq!(seen.len(), forest.assigned());
        }
    }

    #[test]
    fn prop_deleted_records_end_their_lineage(history in arb_history()) {
        let forests = build(&history);
        let methods = forests.methods();
        for tree in methods.trees() {
            for link in tree.links() {
                let successor = history.record(ElementKind::Method, link.successor).unwrap();
                prop_assert!(!successor.is_deleted());
            }
        }
    }

    #[test]
    fn prop_strict_build_still_partitions(history in arb_history()) {
        let forests = build_strict(&history);
        let methods = forests.methods();
        let total: usize = methods.trees().map(|t| t.len()).sum();
        prop_assert_eq!(total, methods.assigned());
    }
}
