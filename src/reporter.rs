//! C11 — Reporter.
//!
//! Owns the only mutable shared state in the core: run-time counters.
//! Mutated only from the main thread (§5), so no locking is needed. Exposes
//! monotonic increment operations only — no decrements, preserving the
//! invariant that `auto_saved + required_validation + empty_rows +
//! not_found + errors <= processed` for the lifetime of a run.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub total_rows: usize,
    pub processed: usize,
    pub auto_saved: usize,
    pub required_validation: usize,
    pub empty_rows: usize,
    pub not_found: usize,
    pub errors: usize,
}

impl ProcessingStats {
    /// Fraction of processed rows that auto-saved cleanly.
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.auto_saved as f64 / self.processed as f64
        }
    }

    /// Percentage of `total_rows` processed so far, in `[0, 100]`.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total_rows as f64) * 100.0
        }
    }

    pub fn pending(&self) -> usize {
        self.total_rows.saturating_sub(self.processed)
    }
}

/// Owns a `ProcessingStats` and the only API that may mutate it.
#[derive(Debug, Default)]
pub struct Reporter {
    stats: ProcessingStats,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter::default()
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    pub fn set_total(&mut self, total: usize) {
        self.stats.total_rows = total;
    }

    pub fn increment_processed(&mut self) {
        self.stats.processed += 1;
    }

    pub fn increment_auto_saved(&mut self) {
        self.stats.auto_saved += 1;
    }

    pub fn increment_required_validation(&mut self) {
        self.stats.required_validation += 1;
    }

    pub fn increment_empty_rows(&mut self) {
        self.stats.empty_rows += 1;
    }

    pub fn increment_not_found(&mut self) {
        self.stats.not_found += 1;
    }

    pub fn increment_errors(&mut self) {
        self.stats.errors += 1;
    }

    /// Human-readable one-line progress message for row `row_number`.
    pub fn progress_message(&self, row_number: usize) -> String {
        format!(
            "row {}/{} ({:.0}%) — auto-saved {}, needs validation {}, not found {}, empty {}, errors {}",
            row_number,
            self.stats.total_rows,
            self.stats.progress_percentage(),
            self.stats.auto_saved,
            self.stats.required_validation,
            self.stats.not_found,
            self.stats.empty_rows,
            self.stats.errors,
        )
    }

    /// Multi-line final summary table, printed even on partial runs (§7).
    pub fn summary_table(&self) -> String {
        let s = &self.stats;
        format!(
            "\
Processing summary
──────────────────
Total rows          : {}
Processed            : {}
Auto-saved           : {}
Required validation  : {}
Empty rows           : {}
Not found            : {}
Errors               : {}
Success rate         : {:.1}%
Pending              : {}",
            s.total_rows,
            s.processed,
            s.auto_saved,
            s.required_validation,
            s.empty_rows,
            s.not_found,
            s.errors,
            s.success_rate() * 100.0,
            s.pending(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_invariant_holds() {
        let mut r = Reporter::new();
        r.set_total(5);
        r.increment_auto_saved();
        r.increment_processed();
        r.increment_required_validation();
        r.increment_processed();
        r.increment_errors();
        r.increment_processed();
        let s = r.stats();
        assert!(s.auto_saved + s.required_validation + s.empty_rows + s.not_found + s.errors <= s.processed);
    }

    #[test]
    fn progress_percentage_and_pending() {
        let mut r = Reporter::new();
        r.set_total(4);
        r.increment_processed();
        assert_eq!(r.stats().progress_percentage(), 25.0);
        assert_eq!(r.stats().pending(), 3);
    }

    #[test]
    fn success_rate_zero_when_nothing_processed() {
        let r = Reporter::new();
        assert_eq!(r.stats().success_rate(), 0.0);
    }

    #[test]
    fn summary_table_reports_even_on_zero_rows() {
        let r = Reporter::new();
        let table = r.summary_table();
        assert!(table.contains("Total rows"));
    }
}
