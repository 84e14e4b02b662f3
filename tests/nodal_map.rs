//! Serial end-to-end coverage of the shared nodal map.

mod common;

use std::sync::Arc;

use common::LineMesh;
use dof_sieve::prelude::*;

fn build_serial(n_elems: usize, funcs: &FuncSet) -> Vec<DofMap> {
    let mesh = LineMesh::serial(n_elems);
    let comm = NoComm;
    let mut builder = DofMapBuilder::new(&mesh, &comm);
    let mut store = MatrixStore::new();
    let region = FuncRegion::new(
        funcs.clone(),
        CellFilter::maximal(1),
        Arc::new(Lagrange::new(1)),
    );
    builder.build(&[region], &mut store).unwrap()
}

#[test]
fn ten_line_elements_give_eleven_dofs() {
    let maps = build_serial(10, &func_set([0]));
    assert_eq!(maps.len(), 1);
    let map = &maps[0];
    assert!(matches!(map.kind(), MapKind::Nodal(_)));
    assert_eq!(map.lowest_local_dof(), 0);
    assert_eq!(map.num_local_dofs(), 11);
    assert_eq!(map.total_dof_count(), 11);
    assert!(map.ghost_indices().is_empty());
    map.validate_invariants().unwrap();
}

#[test]
fn element_batches_share_vertex_dofs() {
    let mesh = LineMesh::serial(10);
    let maps = build_serial(10, &func_set([0]));
    let map = &maps[0];

    let cells: Vec<usize> = (0..10).collect();
    let batch = map.dofs_for_cell_batch(&mesh, 1, &cells, &func_set([0])).unwrap();
    let chunk = batch.single();
    assert_eq!(chunk.nodes_per_cell, 2);
    assert_eq!(chunk.dofs.len(), 10 * 2);

    // Neighboring elements agree on their shared vertex.
    for c in 0..9 {
        assert_eq!(chunk.dofs[c * 2 + 1], chunk.dofs[(c + 1) * 2]);
    }
    // Walk order numbers vertices consecutively along the line.
    for c in 0..10 {
        assert_eq!(chunk.dofs[c * 2], c as i64);
        assert_eq!(chunk.dofs[c * 2 + 1], c as i64 + 1);
    }
}

#[test]
fn vertex_batches_match_element_batches() {
    let mesh = LineMesh::serial(4);
    let maps = build_serial(4, &func_set([0]));
    let map = &maps[0];

    let nodes: Vec<usize> = (0..5).collect();
    let by_node = map.dofs_for_cell_batch(&mesh, 0, &nodes, &func_set([0])).unwrap();
    assert_eq!(by_node.single().nodes_per_cell, 1);
    assert_eq!(by_node.single().dofs, vec![0, 1, 2, 3, 4]);
}

#[test]
fn two_functions_interleave_per_vertex() {
    let mesh = LineMesh::serial(3);
    let maps = build_serial(3, &func_set([0, 1]));
    let map = &maps[0];
    assert_eq!(map.total_dof_count(), 8);

    let batch = map.dofs_for_cell_batch(&mesh, 0, &[0, 1], &func_set([0, 1])).unwrap();
    // Function slots of one vertex are consecutive.
    assert_eq!(batch.single().dofs, vec![0, 1, 2, 3]);
    assert_eq!(
        map.allowed_funcs_on_cell_batch(&mesh, 1, &[0, 1, 2]),
        func_set([0, 1])
    );
}

#[test]
fn unknown_function_is_rejected() {
    let mesh = LineMesh::serial(3);
    let maps = build_serial(3, &func_set([0]));
    let err = maps[0]
        .dofs_for_cell_batch(&mesh, 1, &[0], &func_set([7]))
        .unwrap_err();
    assert!(matches!(err, DofSieveError::UnknownFunction { func: 7 }));
}

#[test]
fn rebuilding_is_bit_identical() {
    let mesh = LineMesh::serial(17);
    let first = build_serial(17, &func_set([0, 1]));
    let second = build_serial(17, &func_set([0, 1]));
    let cells: Vec<usize> = (0..17).collect();
    let a = first[0]
        .dofs_for_cell_batch(&mesh, 1, &cells, &func_set([0, 1]))
        .unwrap();
    let b = second[0]
        .dofs_for_cell_batch(&mesh, 1, &cells, &func_set([0, 1]))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn empty_region_list_is_a_config_error() {
    let mesh = LineMesh::serial(3);
    let comm = NoComm;
    let mut builder = DofMapBuilder::new(&mesh, &comm);
    let mut store = MatrixStore::new();
    let err = builder.build(&[], &mut store).unwrap_err();
    assert!(matches!(err, DofSieveError::EmptyBasis));
}
