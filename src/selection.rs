use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::ResourceIdentity;

#[derive(Debug, Default)]
struct SelectionState {
    rows: Vec<ResourceIdentity>,
    selected_row: usize,
    selected: Option<ResourceIdentity>,
}

/// Keeps "which row the operator is looking at" stable across refreshes.
///
/// The row map is a dense arena indexed by render order and is only ever
/// replaced wholesale. Restoration tries, in order: an exact identity match,
/// a same-name match (the uid changed because the resource was recreated),
/// and finally a positional fallback that distinguishes a single deletion
/// from a full replacement of the data set.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    state: RwLock<SelectionState>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_row_map(&self, rows: Vec<ResourceIdentity>) {
        self.write().rows = rows;
    }

    pub fn update_selection(&self, row: usize) {
        let mut state = self.write();
        state.selected_row = row;
        state.selected = state.rows.get(row).cloned();
    }

    pub fn restore_selection(&self, total_rows: usize) -> usize {
        let mut state = self.write();
        let row = match state.selected.clone() {
            None => clamp_row(state.selected_row, total_rows),
            Some(remembered) => locate(&state.rows, &remembered, state.selected_row, total_rows),
        };
        adopt(&mut state, row, total_rows);
        row
    }

    pub fn move_selection(&self, delta: isize, total_rows: usize) -> usize {
        let mut state = self.write();
        if total_rows == 0 {
            state.selected_row = 0;
            state.selected = None;
            return 0;
        }

        let max_index = total_rows.saturating_sub(1) as isize;
        let current = state.selected_row.min(max_index as usize) as isize;
        let next = current.saturating_add(delta).clamp(0, max_index) as usize;
        adopt(&mut state, next, total_rows);
        next
    }

    pub fn selected_identity(&self) -> Option<ResourceIdentity> {
        self.read().selected.clone()
    }

    pub fn selected_row(&self) -> usize {
        self.read().selected_row
    }

    fn read(&self) -> RwLockReadGuard<'_, SelectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SelectionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn locate(
    rows: &[ResourceIdentity],
    remembered: &ResourceIdentity,
    previous_row: usize,
    total_rows: usize,
) -> usize {
    if let Some(row) = rows
        .iter()
        .position(|identity| identity.same_resource(remembered))
    {
        return row;
    }

    if let Some(row) = rows.iter().position(|identity| identity.same_slot(remembered)) {
        return row;
    }

    if is_wholesale_replacement(rows, remembered) {
        return 0;
    }

    clamp_row(previous_row, total_rows)
}

/// Heuristic: the set was replaced when no surviving name shares the
/// remembered name's leading hyphen segment ("worker-7" vs "worker-*").
/// Unrelated resources that happen to share a prefix defeat it.
fn is_wholesale_replacement(rows: &[ResourceIdentity], remembered: &ResourceIdentity) -> bool {
    let base = base_name(&remembered.name);
    !rows.iter().any(|identity| base_name(&identity.name) == base)
}

fn base_name(name: &str) -> &str {
    name.split('-').next().unwrap_or(name)
}

fn clamp_row(row: usize, total_rows: usize) -> usize {
    if total_rows == 0 {
        0
    } else {
        row.min(total_rows - 1)
    }
}

fn adopt(state: &mut SelectionState, row: usize, total_rows: usize) {
    state.selected_row = row;
    state.selected = if total_rows == 0 {
        None
    } else {
        state.rows.get(row).cloned()
    };
}
