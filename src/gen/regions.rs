//! Exception region descriptors for one try construct.
//!
//! While the statement generator walks a try/catch/finally it learns the
//! label identifiers that bound each protected range. The table is owned by
//! the try frame that created it and is consumed by `flush`, so it is
//! written to the log exactly once, after every marker is known, in original
//! region order.
//!
//! Marker invariants (exercised by the scenario tests):
//! - sibling catch entries share the try body's start/end labels;
//! - each entry's handler-end is the next entry's handler-start;
//! - the last entry's handler-end is the first instruction after the whole
//!   construct;
//! - a finally entry's try-end is its own handler-start.

use super::log::EmissionLog;
use crate::spelling;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    Catch,
    Finally,
}

#[derive(Clone, Debug)]
pub struct RegionEntry {
    pub kind: RegionKind,
    pub catch_type: Option<String>,
    pub try_start: String,
    pub try_end: String,
    pub handler_start: String,
    pub handler_end: String,
}

impl Default for RegionEntry {
    fn default() -> Self {
        Self {
            kind: RegionKind::Catch,
            catch_type: None,
            try_start: String::new(),
            try_end: String::new(),
            handler_start: String::new(),
            handler_end: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct RegionTable {
    entries: Vec<RegionEntry>,
    catch_count: usize,
}

impl RegionTable {
    pub fn new(catch_count: usize, has_finally: bool) -> Self {
        let total = catch_count + usize::from(has_finally);
        Self {
            entries: vec![RegionEntry::default(); total],
            catch_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The label opening the protected block; shared by every entry.
    pub fn set_try_start(&mut self, label: &str) {
        if let Some(first) = self.entries.first_mut() {
            first.try_start = label.to_string();
        }
    }

    /// The first instruction after the whole construct: the last entry's
    /// handler-end. Known before any handler is visited.
    pub fn set_exit(&mut self, label: &str) {
        if let Some(last) = self.entries.last_mut() {
            last.handler_end = label.to_string();
        }
    }

    /// Record catch handler `index` opening at `handler_start`. The first
    /// catch also closes the try body; every later catch closes its
    /// predecessor's handler.
    pub fn begin_catch(&mut self, index: usize, handler_start: &str, catch_type: &str) {
        if index == 0 {
            self.entries[0].try_end = handler_start.to_string();
        } else {
            self.entries[index - 1].handler_end = handler_start.to_string();
        }
        let (try_start, try_end) = (self.entries[0].try_start.clone(), self.entries[0].try_end.clone());
        let entry = &mut self.entries[index];
        entry.kind = RegionKind::Catch;
        entry.catch_type = Some(catch_type.to_string());
        entry.handler_start = handler_start.to_string();
        entry.try_start = try_start;
        entry.try_end = try_end;
    }

    /// Record the finally handler opening at `handler_start`. A finally's
    /// try-end is its own handler-start; with catches present it also closes
    /// the last catch handler, and without any it closes the try body.
    pub fn begin_finally(&mut self, handler_start: &str) {
        let index = self.entries.len() - 1;
        if self.catch_count > 0 {
            self.entries[index - 1].handler_end = handler_start.to_string();
        } else {
            self.entries[0].try_end = handler_start.to_string();
        }
        let try_start = self.entries[0].try_start.clone();
        let entry = &mut self.entries[index];
        entry.kind = RegionKind::Finally;
        entry.catch_type = None;
        entry.try_start = try_start;
        entry.try_end = handler_start.to_string();
        entry.handler_start = handler_start.to_string();
    }

    pub fn entries(&self) -> &[RegionEntry] {
        &self.entries
    }

    /// Write one descriptor record per entry, in original region order.
    /// Consuming `self` makes a second flush unrepresentable.
    pub fn flush(self, method_var: &str, log: &mut EmissionLog) {
        for entry in &self.entries {
            debug_assert!(
                !entry.try_start.is_empty()
                    && !entry.try_end.is_empty()
                    && !entry.handler_start.is_empty()
                    && !entry.handler_end.is_empty(),
                "region descriptor flushed with an unbound marker"
            );
            let record = match (&entry.kind, &entry.catch_type) {
                (RegionKind::Catch, Some(catch_type)) => spelling::region_catch(
                    method_var,
                    catch_type,
                    &entry.try_start,
                    &entry.try_end,
                    &entry.handler_start,
                    &entry.handler_end,
                ),
                _ => spelling::region_finally(
                    method_var,
                    &entry.try_start,
                    &entry.try_end,
                    &entry.handler_start,
                    &entry.handler_end,
                ),
            };
            log.emit(record);
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn two_catches_and_finally() -> RegionTable {
        let mut table = RegionTable::new(2, true);
        table.set_try_start("lbl_try_0");
        table.set_exit("lbl_after_1");
        table.begin_catch(0, "lbl_catch_2", "typeref(\"ArgError\")");
        table.begin_catch(1, "lbl_catch_3", "typeref(\"Error\")");
        table.begin_finally("lbl_fin_4");
        table
    }

    #[test]
    fn test_catches_share_try_bounds() {
        let table = two_catches_and_finally();
        let entries = table.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].try_start, entries[1].try_start);
        assert_eq!(entries[0].try_end, entries[1].try_end);
        assert_eq!(entries[0].try_end, "lbl_catch_2");
    }

    #[test]
    fn test_handler_chain() {
        let table = two_catches_and_finally();
        let entries = table.entries();
        // Each handler-end is the next handler-start.
        assert_eq!(entries[0].handler_end, entries[1].handler_start);
        assert_eq!(entries[1].handler_end, entries[2].handler_start);
        // The last entry exits past the construct.
        assert_eq!(entries[2].handler_end, "lbl_after_1");
    }

    #[test]
    fn test_finally_try_end_is_own_handler_start() {
        let table = two_catches_and_finally();
        let fin = &table.entries()[2];
        assert_eq!(fin.kind, RegionKind::Finally);
        assert_eq!(fin.try_end, fin.handler_start);
        assert_eq!(fin.try_start, "lbl_try_0");
    }

    #[test]
    fn test_finally_only_closes_try_body() {
        let mut table = RegionTable::new(0, true);
        table.set_try_start("lbl_try_0");
        table.set_exit("lbl_after_1");
        table.begin_finally("lbl_fin_2");
        let entry = &table.entries()[0];
        assert_eq!(entry.kind, RegionKind::Finally);
        assert_eq!(entry.try_end, "lbl_fin_2");
        assert_eq!(entry.handler_end, "lbl_after_1");
    }

    #[test]
    fn test_flush_preserves_region_order() {
        let table = two_catches_and_finally();
        let mut log = EmissionLog::new();
        table.flush("m_run_9", &mut log);
        let lines: Vec<&str> = log.iter().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Region::catch(typeref(\"ArgError\")"));
        assert!(lines[1].contains("Region::catch(typeref(\"Error\")"));
        assert!(lines[2].contains("Region::finally(lbl_try_0, lbl_fin_4, lbl_fin_4, lbl_after_1)"));
    }
}
