use std::collections::{BTreeSet, HashMap, HashSet};

use bbrc_miner::{
    canonize::{canonicalize, DfsCode, Label},
    molecule::Bond,
    significance::Direction,
    store::CompoundStore,
    Bound, Level, MiningError, Session, SessionState, Settings,
};
use petgraph::visit::EdgeRef;

fn session(settings: Settings, compounds: &[(u64, &str, f64)]) -> Session {
    let mut session = Session::with_settings(settings).unwrap();
    for (id, smiles, _) in compounds {
        session.add_compound(smiles, *id).unwrap();
    }
    for (id, _, activity) in compounds {
        session.add_activity(*activity, *id).unwrap();
    }
    session
}

fn mine_serially(session: &mut Session) -> Vec<bbrc_miner::FragmentRecord> {
    (0..session.root_count())
        .flat_map(|root| session.mine_root(root).unwrap())
        .collect()
}

/// Minimum DFS codes of every connected bond subset of every compound.
fn all_fragments(store: &CompoundStore) -> BTreeSet<DfsCode> {
    let mut codes = BTreeSet::new();
    for compound in store.iter() {
        let graph = compound.molecule().graph();
        let bonds: Vec<_> = graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
            .collect();
        for mask in 1u32..(1 << bonds.len()) {
            let chosen: Vec<_> = (0..bonds.len())
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| bonds[i])
                .collect();

            let mut local: HashMap<usize, usize> = HashMap::new();
            let mut labels: Vec<Label> = Vec::new();
            let mut edges = Vec::new();
            for (u, v, bond) in &chosen {
                let mut index = |n: usize| {
                    *local.entry(n).or_insert_with(|| {
                        labels.push(compound.label(petgraph::graph::NodeIndex::new(n)));
                        labels.len() - 1
                    })
                };
                let (a, b) = (index(*u), index(*v));
                edges.push((a, b, *bond));
            }
            if connected(labels.len(), &edges) {
                codes.insert(canonicalize(&labels, &edges));
            }
        }
    }
    codes
}

fn connected(n: usize, edges: &[(usize, usize, Bond)]) -> bool {
    let mut seen = vec![false; n];
    let mut stack = vec![0];
    seen[0] = true;
    while let Some(v) = stack.pop() {
        for &(a, b, _) in edges {
            for (x, y) in [(a, b), (b, a)] {
                if x == v && !seen[y] {
                    seen[y] = true;
                    stack.push(y);
                }
            }
        }
    }
    seen.into_iter().all(|s| s)
}

#[test]
fn lifecycle() {
    let mut session = Session::new();
    assert_eq!(session.state(), SessionState::Configuring);
    assert_eq!(session.mine_root(0), Err(MiningError::NoCompounds));

    session.add_compound("CCO", 1).unwrap();
    session.add_compound("CCN", 2).unwrap();
    assert_eq!(session.state(), SessionState::PopulatingData);
    assert_eq!(
        session.add_compound("CC", 2),
        Err(MiningError::DuplicateCompound(2))
    );
    assert_eq!(session.add_activity(1.0, 3), Err(MiningError::UnknownCompound(3)));

    session.add_activity(1.0, 1).unwrap();
    assert_eq!(session.mine_root(0), Err(MiningError::MissingActivity(2)));
    assert_eq!(session.state(), SessionState::PopulatingData);
    session.add_activity(0.0, 2).unwrap();

    // C, O and N.
    assert_eq!(session.root_count(), 3);
    session.mine_root(1).unwrap();
    assert_eq!(session.state(), SessionState::Mining);
    assert_eq!(session.mine_root(1), Err(MiningError::RootAlreadyMined(1)));
    assert_eq!(
        session.mine_root(3),
        Err(MiningError::RootOutOfRange { index: 3, count: 3 })
    );
    assert!(matches!(
        session.add_compound("C", 9),
        Err(MiningError::WrongState { .. })
    ));
    assert!(matches!(
        session.add_activity(2.0, 1),
        Err(MiningError::WrongState { .. })
    ));

    session.mine_root(0).unwrap();
    session.mine_root(2).unwrap();
    assert_eq!(session.state(), SessionState::Done);
    assert!(matches!(
        session.mine_root(0),
        Err(MiningError::WrongState { .. })
    ));

    session.reset();
    assert_eq!(session.state(), SessionState::Configuring);
    assert_eq!(session.root_count(), 0);
}

#[test]
fn mine_all_matches_serial_mining() {
    let compounds = [
        (1, "CC(=O)O", 1.0),
        (2, "CC(=O)N", 1.0),
        (3, "CCO", 0.0),
        (4, "OCCN", 0.0),
        (5, "c1ccccc1O", 1.0),
        (6, "c1ccccc1N", 0.0),
    ];
    let settings = Settings {
        significance: 0.0,
        level: Level::Graphs,
        ..Settings::default()
    };
    let mut serial = session(settings.clone(), &compounds);
    let serial = mine_serially(&mut serial);

    let mut parallel = session(settings, &compounds);
    let parallel: Vec<_> = parallel
        .mine_all()
        .unwrap()
        .into_iter()
        .flat_map(Result::unwrap)
        .collect();
    assert_eq!(serial, parallel);
    assert!(!serial.is_empty());
}

#[test]
fn mining_is_deterministic() {
    let compounds = [
        (10, "CC(=O)Oc1ccccc1C(=O)O", 1.0),
        (11, "CC(=O)Nc1ccc(O)cc1", 1.0),
        (12, "CCOC(=O)C", 0.0),
        (13, "OC(=O)CCC(=O)O", 0.0),
    ];
    let settings = Settings {
        significance: 0.0,
        ..Settings::default()
    };
    let first = mine_serially(&mut session(settings.clone(), &compounds));
    let second = mine_serially(&mut session(settings, &compounds));
    assert_eq!(first, second);
}

#[test]
fn unfiltered_mining_finds_every_fragment() {
    let compounds = [
        (1, "C1CC1O", 1.0),
        (2, "CC(=O)NC", 0.0),
        (3, "c1ccccc1", 1.0),
    ];
    let mut settings = Settings {
        significance: 0.0,
        level: Level::Graphs,
        backbone: false,
        ..Settings::default()
    };
    settings.refine_singles = true;
    settings.min_frequency = 1.0;
    let mut session = session(settings, &compounds);
    let records = mine_serially(&mut session);

    let mined: Vec<DfsCode> = records.iter().map(|r| r.code.clone()).collect();
    let unique: BTreeSet<DfsCode> = mined.iter().cloned().collect();
    assert_eq!(unique.len(), mined.len(), "a fragment was reported twice");
    assert_eq!(unique, all_fragments(session.store()));
}

#[test]
fn zero_significance_keeps_every_fragment_of_a_barbiturate() {
    let compounds = [
        (1, "CC", 1.0),
        (2, "O=C1NC(=S)NC(=O)C1C(=O)NC2=CC=CC=C2", 0.0),
    ];
    let settings = Settings {
        min_frequency: 1.0,
        refine_singles: true,
        significance: 0.0,
        level: Level::Graphs,
        backbone: false,
        ..Settings::default()
    };
    let mut session = session(settings, &compounds);
    let records = mine_serially(&mut session);

    let mined: Vec<DfsCode> = records.iter().map(|r| r.code.clone()).collect();
    let unique: BTreeSet<DfsCode> = mined.iter().cloned().collect();
    assert_eq!(unique.len(), mined.len(), "a fragment was reported twice");
    assert_eq!(unique, all_fragments(session.store()));
}

#[test]
fn trees_and_paths_are_restricted() {
    let compounds = [(1, "C1CC1C(C)C", 1.0), (2, "C1CC1C(C)C", 0.0)];
    let base = Settings {
        significance: 0.0,
        backbone: false,
        ..Settings::default()
    };

    let trees = mine_serially(&mut session(
        Settings {
            level: Level::Trees,
            ..base.clone()
        },
        &compounds,
    ));
    assert!(trees.iter().all(|r| r.code.edges().iter().all(|e| e.is_forward())));

    let paths = mine_serially(&mut session(
        Settings {
            level: Level::Paths,
            ..base.clone()
        },
        &compounds,
    ));
    assert!(paths.iter().all(|r| r.code.degrees().iter().all(|d| *d <= 2)));
    assert!(paths.len() < trees.len());

    let graphs = mine_serially(&mut session(
        Settings {
            level: Level::Graphs,
            ..base
        },
        &compounds,
    ));
    assert!(graphs.iter().any(|r| r.pattern.contains('1')));
    assert!(graphs.len() > trees.len());
}

#[test]
fn repeated_atom_types_add_no_roots() {
    let mut session = Session::new();
    session.add_compound("CCO", 1).unwrap();
    assert_eq!(session.root_count(), 2);
    session.add_compound("OCC", 2).unwrap();
    assert_eq!(session.root_count(), 2);
    session.add_compound("CCN", 3).unwrap();
    assert_eq!(session.root_count(), 3);
}

#[test]
fn fractional_min_frequency_with_weights() {
    let mut session = Session::new();
    session.set_min_frequency(3.1).unwrap();
    session.set_significance(0.0).unwrap();
    for (id, smiles, weight) in [(1, "CO", 4.0), (2, "CO", 2.0), (3, "CC", 1.0)] {
        session.add_compound(smiles, id).unwrap();
        session.add_activity((id % 2) as f64, id).unwrap();
        session.add_weight(weight, id).unwrap();
    }

    let records = mine_serially(&mut session);
    let patterns: Vec<&str> = records.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["[C]-[O]"]);
    assert_eq!(records[0].weighted_support, 6);
    assert_eq!(records[0].support, 2);
}

#[test]
fn weights_count_as_multiplicities() {
    let mut session = Session::new();
    session.set_min_frequency(3.0).unwrap();
    session.set_significance(0.0).unwrap();
    for (id, smiles) in [(1, "CC"), (2, "CC"), (3, "CO")] {
        session.add_compound(smiles, id).unwrap();
        session.add_activity(id as f64, id).unwrap();
    }
    session.add_weight(1.0, 1).unwrap();
    session.add_weight(1.9, 2).unwrap();
    assert_eq!(session.mine_root(0), Err(MiningError::MissingWeight(3)));
    session.add_weight(5.0, 3).unwrap();

    let records = session.mine_root(0).unwrap();
    let patterns: Vec<&str> = records.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["[C]-[O]"]);
    assert_eq!(records[0].weighted_support, 5);
    assert_eq!(records[0].support, 1);
}

#[test]
fn backbone_classes_have_one_representative() {
    let compounds = [
        (1, "C=CC(=O)O", 1.0),
        (2, "C=CC(=O)N", 1.0),
        (3, "CCC(O)O", 0.0),
        (4, "CCC(O)N", 0.0),
        (5, "C=CCO", 1.0),
        (6, "CCCO", 0.0),
    ];
    let settings = Settings {
        significance: 0.0,
        ..Settings::default()
    };
    let all = mine_serially(&mut session(
        Settings {
            backbone: false,
            ..settings.clone()
        },
        &compounds,
    ));
    let collapsed = mine_serially(&mut session(settings, &compounds));

    let mut best: HashMap<(usize, DfsCode<()>), f64> = HashMap::new();
    for r in &all {
        let score = best.entry((r.root, r.code.skeleton())).or_insert(f64::MIN);
        *score = score.max(r.score);
    }
    assert_eq!(collapsed.len(), best.len());
    let mut seen = HashSet::new();
    for r in &collapsed {
        let key = (r.root, r.code.skeleton());
        assert_eq!(best[&key], r.score);
        assert!(seen.insert(key));
        assert!(all.contains(r));
    }
}

#[test]
fn pruning_does_not_change_results() {
    let compounds = [
        (1, "CC(=O)Oc1ccccc1", 1.0),
        (2, "CC(=O)Nc1ccccc1", 1.0),
        (3, "CC(=O)Oc1ccncc1", 1.0),
        (4, "CCCCc1ccccc1", 0.0),
        (5, "CCCNc1ccccc1", 0.0),
        (6, "CCCOc1ccncc1", 0.0),
    ];
    let settings = Settings {
        significance: 0.8,
        backbone: false,
        ..Settings::default()
    };
    let pruned = mine_serially(&mut session(settings.clone(), &compounds));
    let full = mine_serially(&mut session(
        Settings {
            bounds: Vec::new(),
            ..settings
        },
        &compounds,
    ));
    assert_eq!(pruned, full);
    assert!(pruned.iter().any(|r| r.pattern == "[C]=[O]"));
}

/// Mine `compounds` once per bound configuration and check that the results
/// agree. `weights` are registered after the activities when given.
fn assert_bounds_agree(settings: Settings, compounds: &[(u64, &str, f64)], weights: &[f64]) {
    let configurations = [
        vec![],
        vec![Bound::Significance],
        vec![Bound::Significance, Bound::Dynamic],
    ];
    let results: Vec<_> = configurations
        .into_iter()
        .map(|bounds| {
            let mut session = session(
                Settings {
                    bounds,
                    ..settings.clone()
                },
                compounds,
            );
            for ((id, _, _), weight) in compounds.iter().zip(weights) {
                session.add_weight(*weight, *id).unwrap();
            }
            mine_serially(&mut session)
        })
        .collect();
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], results[2]);
    assert!(results[0].iter().any(|r| r.pattern == "[C]=[O]"));
}

#[test]
fn pruning_is_safe_for_every_label_kind() {
    let structures = [
        "CC(=O)O", "CC(=O)N", "CC(=O)C", "CCCO", "CCCN", "CCOC", "CCNC", "CCCC",
    ];
    let with_values = |values: [f64; 8]| -> Vec<(u64, &'static str, f64)> {
        (1..)
            .zip(structures)
            .zip(values)
            .map(|((id, smiles), value)| (id, smiles, value))
            .collect()
    };
    let settings = Settings {
        backbone: false,
        ..Settings::default()
    };

    // Continuous activities.
    assert_bounds_agree(
        Settings {
            regression: true,
            significance: 0.9,
            ..settings.clone()
        },
        &with_values([9.0, 8.0, 7.5, 3.0, 2.0, 1.0, 1.5, 0.5]),
        &[],
    );

    // Three classes.
    assert_bounds_agree(
        Settings {
            significance: 0.8,
            ..settings.clone()
        },
        &with_values([2.0, 2.0, 2.0, 1.0, 1.0, 0.0, 0.0, 0.0]),
        &[],
    );

    // Weighted compounds under a fractional minimum frequency.
    assert_bounds_agree(
        Settings {
            significance: 0.9,
            min_frequency: 2.5,
            ..settings
        },
        &with_values([1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        &[2.0, 3.0, 1.5, 1.0, 2.0, 1.0, 1.0, 4.0],
    );
}

#[test]
fn regression_uses_ks_direction() {
    let compounds = [
        (1, "CCO", 5.0),
        (2, "CCO", 6.0),
        (3, "CCO", 7.0),
        (4, "CCN", 1.0),
        (5, "CCN", 2.0),
        (6, "CCN", 3.0),
    ];
    let settings = Settings {
        regression: true,
        significance: 0.9,
        ..Settings::default()
    };
    let records = mine_serially(&mut session(settings, &compounds));
    let find = |pattern: &str| records.iter().find(|r| r.pattern == pattern);

    let co = find("[C]-[O]").unwrap();
    assert_eq!(co.direction, Direction::Activating);
    assert!(co.p_value < 0.1);
    assert_eq!(co.statistic, 1.0);
    assert_eq!(co.groups, vec![vec![1, 2, 3]]);

    assert_eq!(find("[C]-[N]").unwrap().direction, Direction::Deactivating);
    assert!(find("[C]-[C]").is_none());
}

#[test]
fn frequent_mining_without_activities() {
    let compounds = [(1, "CCO", 0.0), (2, "CCO", 0.0), (3, "CN", 0.0)];
    let settings = Settings {
        significance: 0.0,
        backbone: false,
        ..Settings::default()
    };
    let records = mine_serially(&mut session(settings, &compounds));
    let patterns: Vec<&str> = records.iter().map(|r| r.pattern.as_str()).collect();
    assert_eq!(patterns, vec!["[C]-[C]", "[C]-[C]-[O]", "[C]-[O]"]);
    assert!(records.iter().all(|r| r.groups.len() == 1));
}
