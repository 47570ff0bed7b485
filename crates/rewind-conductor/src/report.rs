use crate::results::ResultsTable;
use rewind_core::REPORT_FILENAME;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Heading for one report block: `hw1-Doe-Jane` → `Doe, Jane`.
pub fn block_label(display_name: &str, assignment: &str) -> String {
    let prefix = format!("{assignment}-");
    display_name
        .strip_prefix(&prefix)
        .unwrap_or(display_name)
        .replace('-', ", ")
}

/// The report text: assignment header, blank line, one block per result in
/// display-name order.
pub fn render_report(assignment: &str, table: &ResultsTable) -> String {
    let mut out = format!("{assignment}\n\n");
    for (name, average) in table.iter() {
        let _ = write!(
            out,
            "{}\n    Average Insertions: {average:.2}\n\n",
            block_label(name, assignment)
        );
    }
    out
}

/// Write `avgLinesInserted.txt` under `assignment_dir`, atomically.
pub fn write_report(
    assignment_dir: &Path,
    assignment: &str,
    table: &ResultsTable,
) -> anyhow::Result<PathBuf> {
    let path = assignment_dir.join(REPORT_FILENAME);
    rewind_store::write_atomic(&path, render_report(assignment, table).as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(block_label("hw1-Doe-Jane", "hw1"), "Doe, Jane");
        assert_eq!(block_label("hw1-jdoe", "hw1"), "jdoe");
        assert_eq!(block_label("other", "hw1"), "other");
    }

    #[test]
    fn blocks_are_sorted_and_two_decimal() {
        let mut t = ResultsTable::new();
        t.insert("hw1-Smith-Sam", 12.5).unwrap();
        t.insert("hw1-Doe-Jane", 5.0).unwrap();
        assert_eq!(
            render_report("hw1", &t),
            "hw1\n\nDoe, Jane\n    Average Insertions: 5.00\n\nSmith, Sam\n    Average Insertions: 12.50\n\n"
        );
    }

    #[test]
    fn empty_table_is_header_only() {
        assert_eq!(render_report("hw1", &ResultsTable::new()), "hw1\n\n");
    }

    #[test]
    fn written_under_assignment_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = ResultsTable::new();
        t.insert("hw1-a", 1.0).unwrap();
        let path = write_report(dir.path(), "hw1", &t).unwrap();
        assert_eq!(path, dir.path().join("avgLinesInserted.txt"));
        assert!(std::fs::read_to_string(path).unwrap().contains("a\n    Average Insertions: 1.00"));
    }
}
