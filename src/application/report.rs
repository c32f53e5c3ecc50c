use colored::Colorize;
use supports_color::Stream;

use crate::script::{Operation, Outcome};

/// Formats operation outcomes for the terminal.
#[derive(Debug, Clone, Copy)]
pub struct Report {
    colorize: bool,
}

impl Report {
    pub fn new(colorize: bool) -> Self {
        Self { colorize }
    }

    pub fn for_stdout() -> Self {
        Self::new(supports_color::on(Stream::Stdout).is_some())
    }

    pub fn outcome_line(&self, step: usize, operation: &Operation, outcome: &Outcome) -> String {
        let status = if outcome.is_failure() { "err" } else { "ok" };
        let status = match (self.colorize, outcome.is_failure()) {
            (false, _) => status.to_string(),
            (true, false) => status.green().to_string(),
            (true, true) => status.red().bold().to_string(),
        };
        format!("[{step:>3}] {status:<3} {operation} => {outcome}")
    }

    pub fn dump_block(&self, dump: Option<&str>) -> String {
        let header = if self.colorize {
            "final tree:".bold().to_string()
        } else {
            "final tree:".to_string()
        };
        match dump {
            Some("") => format!("{header} (empty)"),
            Some(dump) => format!("{header}\n{}", dump.trim_end()),
            None => format!("{header} (not initialized)"),
        }
    }

    pub fn summary_line(&self, operations: usize, failures: usize) -> String {
        let failures_text = format!("{failures} failed");
        let failures_text = match (self.colorize, failures) {
            (false, _) => failures_text,
            (true, 0) => failures_text.green().to_string(),
            (true, _) => failures_text.yellow().to_string(),
        };
        format!("{operations} operations, {failures_text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftree::FileTreeError;

    #[test]
    fn plain_outcome_line() {
        let report = Report::new(false);
        let line = report.outcome_line(
            4,
            &Operation::ContainsFile { path: "/a".into() },
            &Outcome::Answer(false),
        );
        assert_eq!(line, "[  4] ok  containsFile /a => false");
    }

    #[test]
    fn plain_failure_line() {
        let report = Report::new(false);
        let line = report.outcome_line(
            12,
            &Operation::InsertDirectory { path: "/".into() },
            &Outcome::Failed(FileTreeError::NotInitialized),
        );
        assert!(line.starts_with("[ 12] err insertDirectory / => "));
    }

    #[test]
    fn dump_block_variants() {
        let report = Report::new(false);
        assert_eq!(report.dump_block(Some("a\na/b\n")), "final tree:\na\na/b");
        assert_eq!(report.dump_block(Some("")), "final tree: (empty)");
        assert_eq!(
            report.dump_block(None),
            "final tree: (not initialized)"
        );
    }

    #[test]
    fn summary_counts_failures() {
        assert_eq!(Report::new(false).summary_line(7, 2), "7 operations, 2 failed");
    }
}
