use tracing::warn;

use opline_protocol::LineCodec;
use opline_types::{ErrorRecord, EventRecord};

use crate::merge::MergeIter;

/// Denormalized journal counters.
///
/// These are caches over the live structure, updated only inside the
/// mutation API so they can never drift; there is no setter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JournalTotals {
    pub events: usize,
    pub errors: usize,
    pub nodes: usize,
    pub cleared: usize,
}

/// An error ledger slot. Removal is logical: the slot stays in place with
/// `removed` set, so no index into the ledger is ever invalidated.
#[derive(Clone, Debug)]
pub(crate) struct ErrorSlot {
    pub(crate) record: ErrorRecord,
    pub(crate) removed: bool,
}

/// The dual-ledger journal: append-ordered events and errors plus counters.
///
/// Between [`Journal::clear`] calls the structure only grows (error removal
/// is a tombstone, kept for the simulator's unresolved-error bookkeeping).
/// Records enter through parsed wire lines (`load_*`) or the direct append
/// API; validation happens in the codec before records get here, so appends
/// are infallible.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    events: Vec<EventRecord>,
    errors: Vec<ErrorSlot>,
    total_events: usize,
    total_errors: usize,
    total_cleared: usize,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event. O(1), never fails on validated input.
    pub fn add_event(&mut self, record: EventRecord) {
        self.events.push(record);
        self.total_events += 1;
        self.debug_check_totals();
    }

    /// Append one error. O(1), never fails on validated input.
    pub fn add_error(&mut self, record: ErrorRecord) {
        if record.cleared {
            self.total_cleared += 1;
        }
        self.errors.push(ErrorSlot {
            record,
            removed: false,
        });
        self.total_errors += 1;
        self.debug_check_totals();
    }

    /// Decode one event payload and append it. Returns `false` and leaves
    /// the journal untouched when the line does not decode.
    pub fn load_event_line(&mut self, payload: &str) -> bool {
        match LineCodec::decode_event_fields(payload) {
            Ok(record) => {
                self.add_event(record);
                true
            }
            Err(reason) => {
                warn!(payload, %reason, "event line rejected");
                false
            }
        }
    }

    /// Decode one error payload and append it.
    pub fn load_error_line(&mut self, payload: &str) -> bool {
        match LineCodec::decode_error_fields(payload) {
            Ok(record) => {
                self.add_error(record);
                true
            }
            Err(reason) => {
                warn!(payload, %reason, "error line rejected");
                false
            }
        }
    }

    /// Decode an event dump payload and append every admitted segment.
    /// Returns `true` iff at least one record was admitted.
    pub fn load_event_dump(&mut self, payload: &str) -> bool {
        match LineCodec::decode_event_dump(payload) {
            Ok(records) => {
                for record in records {
                    self.add_event(record);
                }
                true
            }
            Err(reason) => {
                warn!(payload, %reason, "event dump rejected");
                false
            }
        }
    }

    /// Decode an error dump payload and append every admitted segment.
    pub fn load_error_dump(&mut self, payload: &str) -> bool {
        match LineCodec::decode_error_dump(payload) {
            Ok(records) => {
                for record in records {
                    self.add_error(record);
                }
                true
            }
            Err(reason) => {
                warn!(payload, %reason, "error dump rejected");
                false
            }
        }
    }

    /// Mark the first live error with this id as cleared.
    ///
    /// Returns `true` whenever a match exists, including when it was already
    /// cleared; the cleared counter only moves on the false→true transition.
    /// Duplicate ids within the ledger are not disallowed by the wire format;
    /// only the first match is ever affected.
    pub fn clear_error(&mut self, id: u64) -> bool {
        let Some(slot) = self
            .errors
            .iter_mut()
            .find(|s| !s.removed && s.record.id == id)
        else {
            return false;
        };
        if !slot.record.cleared {
            slot.record.cleared = true;
            self.total_cleared += 1;
        }
        self.debug_check_totals();
        true
    }

    /// Id of the live error at this 0-indexed position, in append order.
    pub fn error_id_at(&self, pos: usize) -> Option<u64> {
        self.errors
            .iter()
            .filter(|s| !s.removed)
            .nth(pos)
            .map(|s| s.record.id)
    }

    /// Logically remove the first live error with this id.
    ///
    /// The slot is tombstoned, not relinked; it no longer participates in
    /// counters, traversal, or lookup. Used by the simulator to retire
    /// entries from its unresolved-error bookkeeping.
    pub fn remove_error(&mut self, id: u64) -> bool {
        let Some(slot) = self
            .errors
            .iter_mut()
            .find(|s| !s.removed && s.record.id == id)
        else {
            return false;
        };
        slot.removed = true;
        self.total_errors -= 1;
        if slot.record.cleared {
            self.total_cleared -= 1;
        }
        self.debug_check_totals();
        true
    }

    /// Discard both ledgers and zero every counter. Freeing is total; there
    /// is no partial free in the public contract.
    pub fn clear(&mut self) {
        self.events.clear();
        self.errors.clear();
        self.total_events = 0;
        self.total_errors = 0;
        self.total_cleared = 0;
    }

    pub fn totals(&self) -> JournalTotals {
        JournalTotals {
            events: self.total_events,
            errors: self.total_errors,
            nodes: self.total_events + self.total_errors,
            cleared: self.total_cleared,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.totals().nodes == 0
    }

    /// Merge-by-id traversal over both ledgers.
    pub fn iter_merged(&self) -> MergeIter<'_> {
        MergeIter::new(&self.events, &self.errors)
    }

    #[cfg(debug_assertions)]
    fn debug_check_totals(&self) {
        let live = self.errors.iter().filter(|s| !s.removed);
        debug_assert_eq!(self.total_events, self.events.len());
        debug_assert_eq!(self.total_errors, live.clone().count());
        debug_assert_eq!(
            self.total_cleared,
            live.filter(|s| s.record.cleared).count()
        );
    }

    #[cfg(not(debug_assertions))]
    fn debug_check_totals(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn event(id: u64) -> EventRecord {
        EventRecord::new(id, "10:00:00", format!("event {id}"))
    }

    fn error(id: u64, cleared: bool) -> ErrorRecord {
        ErrorRecord::new(id, "10:00:01", format!("error {id}"), cleared)
    }

    #[test]
    fn appends_update_totals() {
        let mut journal = Journal::new();
        journal.add_event(event(1));
        journal.add_error(error(2, false));
        journal.add_error(error(3, true));

        let totals = journal.totals();
        assert_eq!(totals.events, 1);
        assert_eq!(totals.errors, 2);
        assert_eq!(totals.nodes, 3);
        assert_eq!(totals.cleared, 1);
    }

    #[test]
    fn clear_error_is_idempotent_for_the_counter() {
        let mut journal = Journal::new();
        journal.add_error(error(5, false));

        assert!(journal.clear_error(5));
        assert_eq!(journal.totals().cleared, 1);

        // A second clear still reports success but the counter stays put.
        assert!(journal.clear_error(5));
        assert_eq!(journal.totals().cleared, 1);
    }

    #[test]
    fn clear_error_misses_absent_id() {
        let mut journal = Journal::new();
        journal.add_error(error(5, false));
        assert!(!journal.clear_error(99));
        assert_eq!(journal.totals().cleared, 0);
    }

    #[test]
    fn clear_error_with_duplicate_ids_affects_first_only() {
        let mut journal = Journal::new();
        journal.add_error(error(7, false));
        journal.add_error(error(7, false));

        assert!(journal.clear_error(7));
        let cleared: Vec<bool> = journal
            .iter_merged()
            .map(|e| match e {
                crate::MergedEntry::Error(r) => r.cleared,
                crate::MergedEntry::Event(_) => unreachable!(),
            })
            .collect();
        assert_eq!(cleared, vec![true, false]);
    }

    #[test]
    fn error_id_at_walks_live_errors() {
        let mut journal = Journal::new();
        journal.add_error(error(10, false));
        journal.add_error(error(20, false));
        journal.add_error(error(30, false));

        assert_eq!(journal.error_id_at(0), Some(10));
        assert_eq!(journal.error_id_at(2), Some(30));
        assert_eq!(journal.error_id_at(3), None);

        journal.remove_error(20);
        assert_eq!(journal.error_id_at(1), Some(30));
    }

    #[test]
    fn remove_error_tombstones_and_adjusts_counters() {
        let mut journal = Journal::new();
        journal.add_error(error(1, true));
        journal.add_error(error(2, false));

        assert!(journal.remove_error(1));
        let totals = journal.totals();
        assert_eq!(totals.errors, 1);
        assert_eq!(totals.cleared, 0);

        // The tombstoned id is gone for lookup purposes.
        assert!(!journal.remove_error(1));
        assert!(!journal.clear_error(1));
    }

    #[test]
    fn load_lines_reject_without_mutation() {
        let mut journal = Journal::new();
        assert!(!journal.load_event_line("name, 17"));
        assert!(!journal.load_error_line("name,16,29,yes"));
        assert!(journal.is_empty());

        assert!(journal.load_event_line("ignition,12:00,4"));
        assert!(journal.load_error_line("coolant,12:01,5,0"));
        assert_eq!(journal.totals().nodes, 2);
    }

    #[test]
    fn load_dump_admits_partial() {
        let mut journal = Journal::new();
        assert!(journal.load_event_dump("name,16,29,,name_two,14,12"));
        assert_eq!(journal.totals().events, 2);

        assert!(!journal.load_event_dump("garbage"));
        assert_eq!(journal.totals().events, 2);
    }

    #[test]
    fn clear_resets_everything() {
        let mut journal = Journal::new();
        journal.add_event(event(1));
        journal.add_error(error(2, true));
        journal.clear();

        assert!(journal.is_empty());
        assert_eq!(journal.totals(), JournalTotals::default());
        assert_eq!(journal.error_id_at(0), None);
    }

    proptest! {
        /// After any sequence of appends, clears, and removals the cached
        /// counters equal a live recount.
        #[test]
        fn totals_always_match_recount(ops in prop::collection::vec(0u8..5, 0..60)) {
            let mut journal = Journal::new();
            let mut next_id = 0u64;
            for op in ops {
                match op {
                    0 => {
                        journal.add_event(event(next_id));
                        next_id += 1;
                    }
                    1 => {
                        journal.add_error(error(next_id, false));
                        next_id += 1;
                    }
                    2 => {
                        journal.add_error(error(next_id, next_id % 2 == 0));
                        next_id += 1;
                    }
                    3 => {
                        let target = next_id / 2;
                        journal.clear_error(target);
                    }
                    _ => {
                        let target = next_id / 3;
                        journal.remove_error(target);
                    }
                }
            }

            let recount_events = journal.iter_merged().filter(|e| !e.is_error()).count();
            let recount_errors = journal.iter_merged().filter(|e| e.is_error()).count();
            let recount_cleared = journal
                .iter_merged()
                .filter(|e| matches!(e, crate::MergedEntry::Error(r) if r.cleared))
                .count();

            let totals = journal.totals();
            prop_assert_eq!(totals.events, recount_events);
            prop_assert_eq!(totals.errors, recount_errors);
            prop_assert_eq!(totals.nodes, recount_events + recount_errors);
            prop_assert_eq!(totals.cleared, recount_cleared);
        }
    }
}
