use bbrc_miner::{
    canonize::{canonicalize, DfsCode, Label},
    molecule::Bond,
};
use proptest::prelude::*;

/// A connected graph: a random spanning tree plus a few extra edges.
fn connected_graph() -> impl Strategy<Value = (Vec<Label>, Vec<(usize, usize, Bond)>)> {
    (2usize..8).prop_flat_map(|n| {
        let labels = prop::collection::vec(0u32..3, n);
        let parents: Vec<_> = (1..n).map(|i| 0..i).collect();
        let bonds = prop::collection::vec(1usize..4, n - 1 + 3);
        let extra = prop::collection::vec((0..n, 0..n), 0..3);
        (labels, parents, bonds, extra).prop_map(|(labels, parents, bonds, extra)| {
            let mut edges = Vec::new();
            for (i, p) in parents.into_iter().enumerate() {
                edges.push((p, i + 1, Bond::try_from(bonds[i]).unwrap()));
            }
            for (k, (u, v)) in extra.into_iter().enumerate() {
                let taken = edges
                    .iter()
                    .any(|&(a, b, _)| (a, b) == (u, v) || (a, b) == (v, u));
                if u != v && !taken {
                    let bond = Bond::try_from(bonds[labels.len() - 1 + k]).unwrap();
                    edges.push((u, v, bond));
                }
            }
            (labels, edges)
        })
    })
}

fn relabel(
    labels: &[Label],
    edges: &[(usize, usize, Bond)],
    perm: &[usize],
) -> (Vec<Label>, Vec<(usize, usize, Bond)>) {
    let mut moved = vec![0; labels.len()];
    for (old, &new) in perm.iter().enumerate() {
        moved[new] = labels[old];
    }
    let mut edges: Vec<_> = edges
        .iter()
        .map(|&(u, v, bond)| (perm[v], perm[u], bond))
        .collect();
    edges.reverse();
    (moved, edges)
}

proptest! {
    #[test]
    fn code_ignores_vertex_order(
        (graph, perm) in connected_graph().prop_flat_map(|graph| {
            let n = graph.0.len();
            (Just(graph), Just((0..n).collect::<Vec<_>>()).prop_shuffle())
        })
    ) {
        let (labels, edges) = graph;
        let (moved, moved_edges) = relabel(&labels, &edges, &perm);
        let code = canonicalize(&labels, &edges);
        prop_assert_eq!(&code, &canonicalize(&moved, &moved_edges));
        prop_assert_eq!(code.len(), edges.len());
        prop_assert!(code.is_min());
    }

    #[test]
    fn every_prefix_of_a_minimum_code_is_minimal((labels, edges) in connected_graph()) {
        let code = canonicalize(&labels, &edges);
        for k in 1..code.len() {
            let prefix = DfsCode::from_edges(code.edges()[..k].to_vec());
            prop_assert!(prefix.is_min());
        }
    }
}
