use std::fmt;

/// How bad a diagnostic is. The ordering is meaningful: `Info < Warning < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Cosmetic, never affects output.
    Info,
    /// Output is still produced, but should be looked at.
    Warning,
    /// The line produces no output and the unit should be left out of the final package.
    Error,
    /// The whole run should be aborted.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// The line in the source file, starting at 1.
    pub line: usize,
}

impl Diagnostic {
    pub fn new(severity: Severity, line: usize, message: impl Into<String>) -> Self {
        Self { severity, line, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: line {}: {}", self.severity, self.line, self.message)
    }
}

/// The diagnostics of a single source line.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    line: usize,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(line: usize) -> Self {
        Self { line, items: Vec::new() }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.items.push(Diagnostic::new(severity, self.line, message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn fatal(&mut self, message: impl Into<String>) {
        self.push(Severity::Fatal, message);
    }

    /// The worst severity, or `None` if empty.
    pub fn worst(&self) -> Option<Severity> {
        self.items.iter().map(|d| d.severity).max()
    }

    /// If any diagnostic is at least as bad as `severity`.
    pub fn any_at_least(&self, severity: Severity) -> bool {
        self.worst().map_or(false, |worst| worst >= severity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Consume in ascending severity order, keeping the insertion order within a severity.
    pub fn into_sorted(self) -> impl Iterator<Item = Diagnostic> {
        let mut items = self.items;
        items.sort_by_key(|d| d.severity);
        items.into_iter()
    }
}

/// Merge the diagnostics of every line into a single list for a unit. Each line contributes its
/// diagnostics by ascending severity, then the whole list is stably sorted by source line.
pub fn aggregate(lines: impl IntoIterator<Item = Diagnostics>) -> Vec<Diagnostic> {
    let mut out: Vec<Diagnostic> = lines
        .into_iter()
        .flat_map(Diagnostics::into_sorted)
        .collect();
    out.sort_by_key(|d| d.line);
    out
}

/// The worst severity of a list of diagnostics.
pub fn worst(diags: &[Diagnostic]) -> Option<Severity> {
    diags.iter().map(|d| d.severity).max()
}
