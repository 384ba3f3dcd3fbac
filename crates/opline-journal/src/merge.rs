use opline_types::{ErrorRecord, EventRecord, Record};

use crate::journal::ErrorSlot;

/// One entry yielded by merge traversal, borrowing from the journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergedEntry<'a> {
    Event(&'a EventRecord),
    Error(&'a ErrorRecord),
}

impl<'a> MergedEntry<'a> {
    pub fn id(&self) -> u64 {
        match self {
            Self::Event(r) => r.id,
            Self::Error(r) => r.id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn to_record(&self) -> Record {
        match self {
            Self::Event(r) => Record::Event((*r).clone()),
            Self::Error(r) => Record::Error((*r).clone()),
        }
    }
}

/// Merge-by-id traversal over the two ledgers.
///
/// While both cursors are live the entry with the smaller id is yielded and
/// its cursor advances; ties go to the error cursor. Once one side is
/// exhausted the other drains alone. Tombstoned error slots never appear.
pub struct MergeIter<'a> {
    events: &'a [EventRecord],
    errors: Vec<&'a ErrorRecord>,
    event_cursor: usize,
    error_cursor: usize,
}

impl<'a> MergeIter<'a> {
    pub(crate) fn new(events: &'a [EventRecord], errors: &'a [ErrorSlot]) -> Self {
        Self {
            events,
            errors: errors
                .iter()
                .filter(|s| !s.removed)
                .map(|s| &s.record)
                .collect(),
            event_cursor: 0,
            error_cursor: 0,
        }
    }
}

impl<'a> Iterator for MergeIter<'a> {
    type Item = MergedEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.events.get(self.event_cursor);
        let error = self.errors.get(self.error_cursor).copied();

        match (event, error) {
            (Some(ev), Some(er)) => {
                // Error wins on equal id; this tie-break is part of the
                // contract and is tested explicitly.
                if er.id <= ev.id {
                    self.error_cursor += 1;
                    Some(MergedEntry::Error(er))
                } else {
                    self.event_cursor += 1;
                    Some(MergedEntry::Event(ev))
                }
            }
            (Some(ev), None) => {
                self.event_cursor += 1;
                Some(MergedEntry::Event(ev))
            }
            (None, Some(er)) => {
                self.error_cursor += 1;
                Some(MergedEntry::Error(er))
            }
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Journal;

    fn journal_with(events: &[u64], errors: &[u64]) -> Journal {
        let mut journal = Journal::new();
        for &id in events {
            journal.add_event(EventRecord::new(id, "t", format!("e{id}")));
        }
        for &id in errors {
            journal.add_error(ErrorRecord::new(id, "t", format!("x{id}"), false));
        }
        journal
    }

    #[test]
    fn merge_interleaves_by_ascending_id_with_error_tie_break() {
        let journal = journal_with(&[3, 7, 9], &[5, 7, 12]);
        let order: Vec<(u64, bool)> = journal
            .iter_merged()
            .map(|e| (e.id(), e.is_error()))
            .collect();
        assert_eq!(
            order,
            vec![
                (3, false),
                (5, true),
                (7, true), // tie: error first
                (7, false),
                (9, false),
                (12, true),
            ]
        );
    }

    #[test]
    fn single_ledger_drains_alone() {
        let journal = journal_with(&[1, 2, 3], &[]);
        assert_eq!(journal.iter_merged().count(), 3);

        let journal = journal_with(&[], &[4, 5]);
        let all_errors: Vec<bool> = journal.iter_merged().map(|e| e.is_error()).collect();
        assert_eq!(all_errors, vec![true, true]);
    }

    #[test]
    fn empty_journal_yields_nothing() {
        let journal = Journal::new();
        assert_eq!(journal.iter_merged().next(), None);
    }

    #[test]
    fn tombstoned_errors_are_skipped() {
        let mut journal = journal_with(&[2], &[1, 3]);
        journal.remove_error(1);
        let order: Vec<u64> = journal.iter_merged().map(|e| e.id()).collect();
        assert_eq!(order, vec![2, 3]);
    }

    #[test]
    fn to_record_preserves_fields() {
        let journal = journal_with(&[8], &[]);
        let record = journal.iter_merged().next().unwrap().to_record();
        assert_eq!(record.id(), 8);
        assert!(!record.is_error());
        assert_eq!(record.text(), "e8");
    }
}
