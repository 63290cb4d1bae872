use std::{cell::RefCell, rc::Rc};

use crate::{Error, handles::ClobId, value::Value};

/// The current row of an updatable result set.
///
/// Holds the committed column values and the pending updates of the current edit session.
/// Cloning creates another handle to the same row, so large object wrappers can publish their
/// working copies into the row they have been read from.
///
/// Columns are one based.
#[derive(Debug, Clone)]
pub struct UpdatableRow {
    state: Rc<RefCell<RowState>>,
}

#[derive(Debug)]
struct RowState {
    values: Vec<Value>,
    /// Pending update per column. `None` if the column has not been updated.
    updates: Vec<Option<Value>>,
    updatable: bool,
    updating: bool,
    /// Advanced whenever an edit session ends, either by applying or cancelling the updates.
    edit_session: u64,
}

impl UpdatableRow {
    /// Row whose columns may be updated.
    pub fn new(values: Vec<Value>) -> Self {
        Self::with_updatable(values, true)
    }

    /// Row of a read only result set.
    pub fn read_only(values: Vec<Value>) -> Self {
        Self::with_updatable(values, false)
    }

    fn with_updatable(values: Vec<Value>, updatable: bool) -> Self {
        let updates = vec![None; values.len()];
        Self {
            state: Rc::new(RefCell::new(RowState {
                values,
                updates,
                updatable,
                updating: false,
                edit_session: 0,
            })),
        }
    }

    pub fn num_columns(&self) -> u16 {
        self.state.borrow().values.len().try_into().unwrap_or(u16::MAX)
    }

    pub fn is_updatable(&self) -> bool {
        self.state.borrow().updatable
    }

    /// Enters edit mode for `column`.
    pub fn start_update(&self, column: u16) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if !state.updatable {
            return Err(Error::NotWritable);
        }
        state.index(column)?;
        state.updating = true;
        Ok(())
    }

    /// Sets the pending value of `column`. Requires [`Self::start_update`] to have been called in
    /// the current edit session.
    pub fn set_parameter(&self, column: u16, value: Value) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if !state.updatable {
            return Err(Error::NotWritable);
        }
        let index = state.index(column)?;
        state.updating = true;
        state.updates[index] = Some(value);
        Ok(())
    }

    /// Discards the pending update of a single column.
    pub fn clear_parameter(&self, column: u16) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        let index = state.index(column)?;
        state.updates[index] = None;
        Ok(())
    }

    /// The pending update of `column` if present, otherwise its committed value.
    pub fn value(&self, column: u16) -> Result<Value, Error> {
        let state = self.state.borrow();
        let index = state.index(column)?;
        Ok(state.updates[index]
            .clone()
            .unwrap_or_else(|| state.values[index].clone()))
    }

    pub fn committed_value(&self, column: u16) -> Result<Value, Error> {
        let state = self.state.borrow();
        let index = state.index(column)?;
        Ok(state.values[index].clone())
    }

    pub fn is_updating(&self) -> bool {
        self.state.borrow().updating
    }

    /// Ends the edit session, discarding all pending updates.
    pub fn cancel_updates(&self) {
        let mut state = self.state.borrow_mut();
        state.updates.iter_mut().for_each(|update| *update = None);
        state.end_edit_session();
    }

    /// Ends the edit session, making all pending updates the committed values.
    pub fn apply_updates(&self) {
        let mut state = self.state.borrow_mut();
        let RowState {
            values, updates, ..
        } = &mut *state;
        for (value, update) in values.iter_mut().zip(updates.iter_mut()) {
            if let Some(update) = update.take() {
                *value = update;
            }
        }
        state.end_edit_session();
    }

    /// Identifies the current edit session. Changes whenever updates are applied or cancelled.
    pub fn edit_session(&self) -> u64 {
        self.state.borrow().edit_session
    }

    /// Committed large object of `column`, if it holds one.
    pub(crate) fn committed_clob(&self, column: u16) -> Option<ClobId> {
        match self.committed_value(column) {
            Ok(Value::Clob(clob)) => Some(clob),
            _ => None,
        }
    }
}

impl RowState {
    fn index(&self, column: u16) -> Result<usize, Error> {
        let index = usize::from(column)
            .checked_sub(1)
            .filter(|&index| index < self.values.len())
            .ok_or_else(|| Error::out_of_range("column", column))?;
        Ok(index)
    }

    fn end_edit_session(&mut self) {
        self.updating = false;
        self.edit_session += 1;
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, value::Value};

    use super::UpdatableRow;

    #[test]
    fn pending_update_shadows_committed_value() {
        let row = UpdatableRow::new(vec![Value::from(1), Value::from("a")]);
        row.start_update(2).unwrap();
        row.set_parameter(2, Value::from("b")).unwrap();

        assert_eq!(Value::from("b"), row.value(2).unwrap());
        assert_eq!(Value::from("a"), row.committed_value(2).unwrap());
        assert!(row.is_updating());
    }

    #[test]
    fn cancel_discards_updates_and_ends_session() {
        let row = UpdatableRow::new(vec![Value::from("a")]);
        row.set_parameter(1, Value::from("b")).unwrap();

        row.cancel_updates();

        assert_eq!(Value::from("a"), row.value(1).unwrap());
        assert_eq!(1, row.edit_session());
        assert!(!row.is_updating());
    }

    #[test]
    fn apply_commits_updates() {
        let row = UpdatableRow::new(vec![Value::from("a"), Value::from("x")]);
        row.set_parameter(1, Value::from("b")).unwrap();

        row.apply_updates();

        assert_eq!(Value::from("b"), row.committed_value(1).unwrap());
        assert_eq!(Value::from("x"), row.committed_value(2).unwrap());
        assert_eq!(1, row.edit_session());
    }

    #[test]
    fn read_only_row_rejects_updates() {
        let row = UpdatableRow::read_only(vec![Value::Null]);
        assert!(matches!(row.start_update(1), Err(Error::NotWritable)));
    }

    #[test]
    fn column_out_of_range() {
        let row = UpdatableRow::new(vec![Value::Null]);
        assert!(matches!(row.start_update(0), Err(Error::OutOfRange { .. })));
        assert!(matches!(row.start_update(2), Err(Error::OutOfRange { .. })));
    }
}
