//! Tests for CellState and StateHistory

use seqmem::{CellRef, CellState, StateHistory, CURR, PREV};

#[test]
fn test_set_get_clear() {
    let mut state = CellState::new(4, 3);
    assert_eq!(state.num_columns(), 4);
    assert_eq!(state.cells_per_column(), 3);

    state.set(3, 2);
    assert!(state.get(3, 2));
    assert!(state.contains(CellRef::new(3, 2)));
    assert!(!state.get(3, 1));

    state.clear(3, 2);
    assert!(state.is_empty());
}

#[test]
fn test_column_operations() {
    let mut state = CellState::new(4, 3);
    state.set_column(1);
    state.set(2, 0);

    assert!(state.column_any(1));
    assert!(!state.column_any(0));
    assert_eq!(state.num_set(), 4);
    assert_eq!(state.active_columns(), vec![1, 2]);
    assert_eq!(state.cells_in_column(1).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_matrix_snapshot() {
    let mut state = CellState::new(2, 3);
    state.set(0, 1);
    state.set(1, 2);
    assert_eq!(
        state.to_matrix(),
        vec![vec![false, true, false], vec![false, false, true]]
    );
}

#[test]
fn test_copy_from() {
    let mut a = CellState::new(3, 2);
    a.set(0, 1);
    a.set(2, 0);
    let mut b = CellState::new(3, 2);
    b.set(1, 1);

    b.copy_from(&a);
    assert_eq!(a, b);
    assert_eq!(b.active_cells(), vec![CellRef::new(0, 1), CellRef::new(2, 0)]);
}

#[test]
fn test_clear_all() {
    let mut state = CellState::new(5, 4);
    for c in 0..5 {
        state.set_column(c);
    }
    assert_eq!(state.num_set(), 20);
    state.clear_all();
    assert!(state.is_empty());
}

#[test]
fn test_history_indices() {
    let mut history = StateHistory::new(2, 2);
    history.curr_mut().set(1, 1);
    assert!(history.at(CURR).get(1, 1));
    assert!(history.at(PREV).is_empty());

    history.step();
    assert!(history.at(PREV).get(1, 1));
    assert!(history.at(CURR).is_empty());

    history.clear();
    assert!(history.curr().is_empty());
    assert!(history.prev().is_empty());
}

#[test]
fn test_cell_ref_display_and_order() {
    let a = CellRef::new(1, 3);
    let b = CellRef::new(2, 0);
    assert_eq!(a.to_string(), "(1, 3)");
    assert!(a < b);
}
