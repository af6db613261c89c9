use crate::models::{SearchCriteria, StudentRecord};

/// Search currently narrowing the table, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ActiveFilter {
    pub(crate) criteria: SearchCriteria,
    pub(crate) term: String,
}

/// Rows shown in the main table plus the selection cursor.
#[derive(Default)]
pub(crate) struct TableScreen {
    pub(crate) records: Vec<StudentRecord>,
    pub(crate) selected: usize,
    pub(crate) filter: Option<ActiveFilter>,
}

impl TableScreen {
    pub(crate) fn set_records(&mut self, records: Vec<StudentRecord>, filter: Option<ActiveFilter>) {
        self.records = records;
        self.filter = filter;
        self.ensure_in_bounds();
    }

    pub(crate) fn current_record(&self) -> Option<&StudentRecord> {
        self.records.get(self.selected)
    }

    /// Move the cursor onto the row with `registration_no`, if present.
    pub(crate) fn focus(&mut self, registration_no: &str) {
        if let Some(idx) = self
            .records
            .iter()
            .position(|r| r.registration_no == registration_no)
        {
            self.selected = idx;
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.records.is_empty() {
            return;
        }
        let len = self.records.len() as isize;
        let new = (self.selected as isize + offset).clamp(0, len - 1);
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.records.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.records.is_empty() {
            self.selected = self.records.len() - 1;
        }
    }

    pub(crate) fn ensure_in_bounds(&mut self) {
        if self.records.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.records.len() {
            self.selected = self.records.len() - 1;
        }
    }
}
