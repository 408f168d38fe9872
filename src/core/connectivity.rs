use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;

use super::atom::Atom;
use super::bonds::{Bond, HBond};
use super::StructureError;

/// A maximal set of atoms linked by non-symmetry bonds and hydrogen bonds,
/// together with the edges that formed it.
#[derive(Debug, Clone, Default)]
pub struct ConnectedGroup {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    pub h_bonds: Vec<HBond>,
}

/// Groups atoms into molecular fragments.
///
/// Only edges whose far-end symmetry code is absent merge fragments;
/// symmetry-coded bonds and hydrogen bonds are skipped (their labels are
/// still validated). Every atom lands in exactly one group; untouched atoms
/// become singletons.
pub fn find_connected_groups(
    atoms: &[Atom],
    bonds: &[Bond],
    h_bonds: &[HBond],
) -> Result<Vec<ConnectedGroup>, StructureError> {
    let index_of: HashMap<&str, usize> = atoms
        .iter()
        .enumerate()
        .map(|(index, atom)| (atom.label.as_str(), index))
        .collect();

    let resolve = |label: &str, kind: &'static str| {
        index_of
            .get(label)
            .copied()
            .ok_or_else(|| StructureError::DanglingReference {
                kind,
                label: label.to_string(),
            })
    };

    let mut graph = UnGraph::<usize, ()>::with_capacity(atoms.len(), bonds.len() + 2 * h_bonds.len());
    let nodes: Vec<NodeIndex> = (0..atoms.len()).map(|index| graph.add_node(index)).collect();

    for bond in bonds {
        let first = resolve(&bond.atom1_label, "Bond")?;
        let second = resolve(&bond.atom2_label, "Bond")?;
        if bond.atom2_site_symmetry.is_none() {
            graph.add_edge(nodes[first], nodes[second], ());
        }
    }
    for h_bond in h_bonds {
        let donor = resolve(&h_bond.donor_label, "Hydrogen bond")?;
        let hydrogen = resolve(&h_bond.hydrogen_label, "Hydrogen bond")?;
        let acceptor = resolve(&h_bond.acceptor_label, "Hydrogen bond")?;
        if h_bond.acceptor_atom_symmetry.is_none() {
            graph.add_edge(nodes[donor], nodes[hydrogen], ());
            graph.add_edge(nodes[hydrogen], nodes[acceptor], ());
        }
    }

    // BFS over the graph assigns every atom to one group, singletons included.
    let mut group_of = vec![usize::MAX; atoms.len()];
    let mut group_count = 0;
    for start in 0..atoms.len() {
        if group_of[start] != usize::MAX {
            continue;
        }
        let mut bfs = Bfs::new(&graph, nodes[start]);
        while let Some(node) = bfs.next(&graph) {
            let atom_index = graph[node];
            if group_of[atom_index] == usize::MAX {
                group_of[atom_index] = group_count;
            }
        }
        group_count += 1;
    }

    let mut groups: Vec<ConnectedGroup> = (0..group_count).map(|_| ConnectedGroup::default()).collect();
    for (index, atom) in atoms.iter().enumerate() {
        groups[group_of[index]].atoms.push(atom.clone());
    }
    for bond in bonds {
        if bond.atom2_site_symmetry.is_none() {
            groups[group_of[index_of[bond.atom1_label.as_str()]]]
                .bonds
                .push(bond.clone());
        }
    }
    for h_bond in h_bonds {
        if h_bond.acceptor_atom_symmetry.is_none() {
            groups[group_of[index_of[h_bond.donor_label.as_str()]]]
                .h_bonds
                .push(h_bond.clone());
        }
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::atom::Position;
    use nalgebra::Vector3;

    fn atom(label: &str) -> Atom {
        Atom {
            label: label.to_string(),
            element: label.trim_end_matches(char::is_numeric).to_string(),
            position: Position::Fractional(Vector3::zeros()),
            adp: None,
            disorder_group: 0,
        }
    }

    fn bond(a: &str, b: &str, symmetry: Option<&str>) -> Bond {
        Bond {
            atom1_label: a.to_string(),
            atom2_label: b.to_string(),
            length: 1.5,
            length_su: None,
            atom2_site_symmetry: symmetry.map(|s| s.to_string()),
        }
    }

    fn h_bond(d: &str, h: &str, a: &str, symmetry: Option<&str>) -> HBond {
        HBond {
            donor_label: d.to_string(),
            hydrogen_label: h.to_string(),
            acceptor_label: a.to_string(),
            donor_hydrogen_distance: 0.9,
            donor_hydrogen_distance_su: None,
            acceptor_hydrogen_distance: 2.0,
            acceptor_hydrogen_distance_su: None,
            donor_acceptor_distance: 2.8,
            donor_acceptor_distance_su: None,
            hbond_angle: 170.0,
            hbond_angle_su: None,
            acceptor_atom_symmetry: symmetry.map(|s| s.to_string()),
        }
    }

    #[test]
    fn symmetry_bonds_never_merge() {
        let atoms = vec![atom("C1"), atom("O1"), atom("N1"), atom("P1"), atom("F1")];
        let bonds = vec![
            bond("C1", "O1", None),
            bond("O1", "N1", None),
            bond("C1", "F1", Some("2_655")),
        ];
        let groups = find_connected_groups(&atoms, &bonds, &[]).unwrap();

        assert_eq!(groups.len(), 3);
        let mut sizes: Vec<usize> = groups.iter().map(|g| g.atoms.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 1, 3]);

        let big = groups.iter().find(|g| g.atoms.len() == 3).unwrap();
        let mut labels: Vec<&str> = big.atoms.iter().map(|a| a.label.as_str()).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec!["C1", "N1", "O1"]);
        assert_eq!(big.bonds.len(), 2);
    }

    #[test]
    fn h_bonds_merge_donor_hydrogen_acceptor() {
        let atoms = vec![atom("N1"), atom("H2"), atom("O1")];
        let h_bonds = vec![h_bond("N1", "H2", "O1", None)];
        let groups = find_connected_groups(&atoms, &[], &h_bonds).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].h_bonds.len(), 1);
    }

    #[test]
    fn symmetry_h_bonds_are_skipped_but_validated() {
        let atoms = vec![atom("N1"), atom("H2"), atom("O1")];
        let h_bonds = vec![h_bond("N1", "H2", "O1", Some("3_545"))];
        let groups = find_connected_groups(&atoms, &[], &h_bonds).unwrap();
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.h_bonds.is_empty()));
    }

    #[test]
    fn unknown_label_is_fatal() {
        let atoms = vec![atom("C1")];
        let bonds = vec![bond("C1", "Zz9", None)];
        let result = find_connected_groups(&atoms, &bonds, &[]);
        assert!(matches!(
            result,
            Err(StructureError::DanglingReference { label, .. }) if label == "Zz9"
        ));
    }

    #[test]
    fn every_atom_lands_in_exactly_one_group() {
        let atoms = vec![atom("C1"), atom("O1"), atom("P1")];
        let bonds = vec![bond("C1", "O1", None)];
        let groups = find_connected_groups(&atoms, &bonds, &[]).unwrap();
        let total: usize = groups.iter().map(|g| g.atoms.len()).sum();
        assert_eq!(total, 3);
    }
}
