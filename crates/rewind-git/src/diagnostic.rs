/// Severity prefix git puts at the start of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
    Warning,
    Fatal,
}

impl DiagnosticKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error:",
            DiagnosticKind::Warning => "warning:",
            DiagnosticKind::Fatal => "fatal:",
        }
    }
}

/// A tool output line that marks its operation as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: String,
}

const KINDS: [DiagnosticKind; 3] = [
    DiagnosticKind::Error,
    DiagnosticKind::Warning,
    DiagnosticKind::Fatal,
];

/// Classify one line of tool output.
///
/// Only a line that *starts* with `error:`, `warning:` or `fatal:` counts; the
/// same words elsewhere in a line (a commit subject, a path) do not.
pub fn classify_line(line: &str) -> Option<Diagnostic> {
    let line = line.trim_end_matches(['\r', '\n']);
    KINDS
        .iter()
        .find(|kind| line.starts_with(kind.prefix()))
        .map(|kind| Diagnostic {
            kind: *kind,
            line: line.to_string(),
        })
}

/// First diagnostic line in a block of output, if any.
pub fn first_diagnostic(text: &str) -> Option<Diagnostic> {
    text.lines().find_map(classify_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_recognized() {
        let d = classify_line("fatal: bad revision 'origin/main'\n").unwrap();
        assert_eq!(d.kind, DiagnosticKind::Fatal);
        assert_eq!(d.line, "fatal: bad revision 'origin/main'");

        assert_eq!(
            classify_line("error: pathspec 'x' did not match").map(|d| d.kind),
            Some(DiagnosticKind::Error)
        );
        assert_eq!(
            classify_line("warning: You appear to have cloned an empty repository.")
                .map(|d| d.kind),
            Some(DiagnosticKind::Warning)
        );
    }

    #[test]
    fn prefix_must_lead_the_line() {
        assert_eq!(classify_line("a1b2c3d fix error: off by one"), None);
        assert_eq!(classify_line("HEAD is now at a1b2c3d fatal: typo"), None);
        assert_eq!(classify_line("  error: indented"), None);
        assert_eq!(classify_line("Error: capitalised"), None);
        assert_eq!(classify_line("Cloning into 'hw1-alice'..."), None);
    }

    #[test]
    fn first_diagnostic_scans_all_lines() {
        let out = "Cloning into 'x'...\nremote: Enumerating objects\nfatal: repository not found\n";
        let d = first_diagnostic(out).unwrap();
        assert_eq!(d.line, "fatal: repository not found");
        assert_eq!(first_diagnostic("ok\nfine\n"), None);
    }
}
