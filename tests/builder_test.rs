//! Tests for ForestBuilder

use std::collections::HashSet;

use chrono::NaiveDate;
use rstest::rstest;

use pyebwa::domain::{
    build_forest, Diagnostic, FamilyForest, ForestBuilder, Member, MemberId, RelationshipIndex,
    RelationshipKind::*,
};

fn born(member: Member, year: i32, month: u32, day: u32) -> Member {
    member.with_birth_date(NaiveDate::from_ymd_opt(year, month, day).unwrap())
}

fn nuclear_family(prefix: &str, year: i32) -> Vec<Member> {
    let mom = format!("{prefix}-mom");
    vec![
        born(Member::new(mom.as_str(), "Mom"), year, 1, 1),
        Member::new(format!("{prefix}-dad"), "Dad").with_relation(Spouse, mom.as_str()),
        Member::new(format!("{prefix}-kid"), "Kid").with_relation(Child, mom.as_str()),
    ]
}

fn unit_ids(forest: &FamilyForest) -> Vec<String> {
    forest
        .tree()
        .iter()
        .filter_map(|(_, node)| node.data.unit())
        .map(|unit| unit.member.id.to_string())
        .collect()
}

#[test]
fn given_nuclear_family_when_building_then_mom_is_root_with_spouse_and_child() {
    // Arrange
    let members = nuclear_family("a", 1960);

    // Act
    let forest = build_forest(&members);

    // Assert
    assert!(!forest.is_virtual_root());
    let root = forest.root_unit().expect("root unit");
    assert_eq!(root.member.id.as_str(), "a-mom");
    assert_eq!(root.spouse.as_ref().map(|s| s.id.as_str()), Some("a-dad"));

    let tree = forest.tree();
    let root_node = tree.get_node(tree.root().unwrap()).unwrap();
    assert_eq!(root_node.children.len(), 1);
    let child = tree.get_node(root_node.children[0]).unwrap();
    assert_eq!(child.data.unit().unwrap().member.id.as_str(), "a-kid");
    assert!(forest.diagnostics().is_empty());
}

#[test]
fn given_orphaned_reference_when_building_then_member_becomes_root() {
    // Arrange
    let members = vec![Member::new("x", "X").with_relation(Child, "nonexistent")];

    // Act
    let forest = build_forest(&members);

    // Assert
    assert_eq!(forest.root_unit().unwrap().member.id.as_str(), "x");
    assert!(forest.diagnostics().is_empty());
}

#[test]
fn given_two_unrelated_families_when_building_then_virtual_root_with_two_trees() {
    // Arrange
    let mut members = nuclear_family("late", 1970);
    members.extend(nuclear_family("early", 1950));

    // Act
    let forest = build_forest(&members);

    // Assert
    assert!(forest.is_virtual_root());
    let top: Vec<_> = forest.top_level_units();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].member.id.as_str(), "early-mom");
    assert_eq!(top[1].member.id.as_str(), "late-mom");
    assert!(top.iter().all(|unit| unit.spouse.is_some()));
    assert_eq!(forest.depth(), 2);
}

#[test]
fn given_two_cycle_when_building_then_terminates_and_reports_cycle() {
    // Arrange
    let members = vec![
        Member::new("a", "A").with_relation(Child, "b"),
        Member::new("b", "B").with_relation(Child, "a"),
    ];

    // Act
    let forest = build_forest(&members);

    // Assert
    let placed = forest.placed_member_ids();
    assert!(placed.len() <= 1, "at most one of the cycle is placed: {placed:?}");
    assert!(forest.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::CycleDetected { members } if members.len() == 2
    )));
}

#[test]
fn given_same_input_when_building_twice_then_identical_trees() {
    // Arrange
    let mut members = nuclear_family("a", 1960);
    members.extend(nuclear_family("b", 1960));
    let index = RelationshipIndex::build(&members);
    let mut builder = ForestBuilder::new();

    // Act
    let first = builder.build(&index);
    let second = builder.build(&index);

    // Assert
    assert_eq!(first.to_view(), second.to_view());
    assert_eq!(first.diagnostics(), second.diagnostics());
}

#[test]
fn given_connected_members_when_building_then_every_member_placed_exactly_once() {
    // Arrange
    let members = vec![
        born(Member::new("gp", "Grandpa"), 1930, 1, 1),
        Member::new("gm", "Grandma").with_relation(Spouse, "gp"),
        born(Member::new("p1", "Parent1"), 1955, 1, 1).with_relation(Child, "gp"),
        Member::new("p1s", "Partner1").with_relation(Spouse, "p1"),
        born(Member::new("p2", "Parent2"), 1958, 1, 1).with_relation(Child, "gm"),
        Member::new("k1", "Kid1").with_relation(Child, "p1s"),
        Member::new("k2", "Kid2").with_relation(Child, "p2"),
    ];

    // Act
    let forest = build_forest(&members);

    // Assert
    let placed: Vec<&MemberId> = forest.placed_member_ids();
    let unique: HashSet<&MemberId> = placed.iter().copied().collect();
    assert_eq!(placed.len(), members.len());
    assert_eq!(unique.len(), members.len());
    assert!(forest.diagnostics().is_empty());
}

#[rstest]
#[case::undated_keep_input_order(vec![None, None, None], vec!["c0", "c1", "c2"])]
#[case::dated_ascending(vec![Some(2001), Some(1999), Some(2000)], vec!["c1", "c2", "c0"])]
#[case::undated_after_dated(vec![None, Some(2005), None], vec!["c1", "c0", "c2"])]
fn given_children_with_birth_dates_when_building_then_sorted_stably(
    #[case] years: Vec<Option<i32>>,
    #[case] expected: Vec<&str>,
) {
    // Arrange
    let mut members = vec![Member::new("p", "Parent")];
    for (i, year) in years.iter().enumerate() {
        let child = Member::new(format!("c{i}"), "Child").with_relation(Child, "p");
        members.push(match year {
            Some(year) => born(child, *year, 6, 1),
            None => child,
        });
    }

    // Act
    let forest = build_forest(&members);

    // Assert
    let ids = unit_ids(&forest);
    assert_eq!(ids[0], "p");
    assert_eq!(&ids[1..], expected.as_slice());
}

#[test]
fn given_depth_limit_when_building_then_deeper_generations_cut_without_unplaced_noise() {
    // Arrange
    let members = vec![
        Member::new("g1", "G1"),
        Member::new("g2", "G2").with_relation(Child, "g1"),
        Member::new("g3", "G3").with_relation(Child, "g2"),
        Member::new("g4", "G4").with_relation(Child, "g3"),
    ];
    let index = RelationshipIndex::build(&members);

    // Act
    let forest = ForestBuilder::new().with_max_depth(Some(2)).build(&index);

    // Assert
    assert_eq!(forest.depth(), 2);
    assert_eq!(
        forest.diagnostics(),
        &[Diagnostic::DepthLimitReached {
            member: MemberId::from("g2"),
            limit: 2
        }]
    );
}

#[test]
fn given_empty_snapshot_when_building_then_empty_virtual_root() {
    // Act
    let forest = build_forest(&[]);

    // Assert
    assert!(forest.is_virtual_root());
    assert!(forest.top_level_units().is_empty());
    assert_eq!(forest.depth(), 0);
}

#[test]
fn given_forest_when_rendering_json_view_then_camel_case_flat_nodes() {
    // Arrange
    let forest = build_forest(&nuclear_family("a", 1960));

    // Act
    let json = serde_json::to_value(forest.to_view()).unwrap();

    // Assert
    assert_eq!(json["isVirtualRoot"], false);
    assert_eq!(json["roots"], serde_json::json!([0]));
    assert_eq!(json["nodes"][0]["member"]["id"], "a-mom");
    assert_eq!(json["nodes"][0]["member"]["birthDate"], "1960-01-01");
    assert_eq!(json["nodes"][0]["spouse"]["id"], "a-dad");
    assert_eq!(json["nodes"][0]["children"], serde_json::json!([1]));
    assert_eq!(json["nodes"][1]["member"]["id"], "a-kid");
    assert_eq!(json["nodes"][1]["parent"], 0);
    assert_eq!(json["nodes"][1]["generation"], 1);
}

#[test]
fn given_two_families_when_rendering_json_view_then_virtual_root_lists_both_roots() {
    // Arrange
    let mut members = nuclear_family("a", 1960);
    members.extend(nuclear_family("b", 1950));

    // Act
    let view = build_forest(&members).to_view();

    // Assert
    assert!(view.is_virtual_root);
    let roots: Vec<_> = view
        .roots
        .iter()
        .map(|&i| view.nodes[i].member.id.as_deref().unwrap())
        .collect();
    assert_eq!(roots, vec!["b-mom", "a-mom"]);
}

#[test]
fn given_very_deep_child_chain_when_building_and_rendering_then_no_stack_overflow() {
    // Arrange
    let depth = 20_000;
    let mut members = vec![Member::new("m0", "Gen0")];
    for i in 1..depth {
        members.push(
            Member::new(format!("m{i}"), format!("Gen{i}"))
                .with_relation(Child, format!("m{}", i - 1)),
        );
    }

    // Act
    let forest = build_forest(&members);
    let text = forest.to_tree_string();
    let json = serde_json::to_string(&forest.to_view()).unwrap();

    // Assert
    assert_eq!(forest.depth(), depth);
    assert_eq!(text.lines().count(), depth);
    assert!(text.ends_with("(level 19999) Gen19999\n"));
    assert!(json.contains("\"generation\":19999"));
}
