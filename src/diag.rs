use std::collections::HashSet;

use serde::Serialize;

use crate::lint::{Lint, LintCategory};
use crate::options::Options;
use crate::source::{SourceId, Sources, Span};
use crate::style::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A structured diagnostic. `key` identifies the message
/// (`compiler.err.*`, `compiler.warn.*`, `dc.*`); localization of keys to
/// text is an external collaborator, so the core only carries the key and
/// its pre-rendered arguments.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub key: &'static str,
    pub args: Vec<String>,
    pub source: Option<SourceId>,
    pub span: Span,
    pub category: Option<LintCategory>,
    pub mandatory: bool,
    pub from_class_file: bool,
}

impl Diagnostic {
    /// Raw formatter contract: `<source>:<line>:<col>: <key>: <arg>, …`,
    /// `-` for unsourced diagnostics, `-:-:-` for class-file ones.
    pub fn raw_format(&self, sources: &Sources) -> String {
        let prefix = if self.from_class_file {
            "-:-:-".to_string()
        } else {
            match self.source {
                Some(id) if !self.span.is_none() => {
                    let src = sources.get(id);
                    let (line, col) = src.line_col(self.span.start);
                    format!("{}:{}:{}", src.name, line, col)
                }
                _ => "-".to_string(),
            }
        };
        if self.args.is_empty() {
            format!("{}: {}", prefix, self.key)
        } else {
            format!("{}: {}: {}", prefix, self.key, self.args.join(", "))
        }
    }

    /// Human-oriented rendering: the offending line with a caret
    /// underline, ANSI-colored.
    pub fn display_with_source(&self, sources: &Sources) -> String {
        let Some(id) = self.source else {
            return format!("{}: {}", Style::bold_red("error"), self.key);
        };
        let src = sources.get(id);
        let (line_num, col) = src.line_col(self.span.start);
        let line_content = src.line_text(self.span.start);
        let len = self.span.end.saturating_sub(self.span.start).max(1);
        let underline = format!("{}{}", " ".repeat(col - 1), "^".repeat(len));

        let label = match self.severity {
            Severity::Error => Style::bold_red("error"),
            Severity::Warning => Style::yellow("warning"),
            Severity::Note => Style::cyan("note"),
        };
        let line_num_str = Style::blue(&format!("{:4}", line_num));
        let pipe = Style::blue("|");

        format!(
            "{}: {}\n\n{} {} {}\n     {} {}",
            label,
            self.key,
            line_num_str,
            pipe,
            line_content,
            pipe,
            Style::red(&underline)
        )
    }
}

/// The diagnostic pipeline. Dedupes by `(source, position, severity)`,
/// counts errors and warnings, honors `-Xmaxerrs`/`-Xmaxwarns` caps,
/// `-nowarn`, and `-Werror`, and suppresses warning categories named by
/// the innermost `Lint` on the reporting stack.
pub struct Log {
    diagnostics: Vec<Diagnostic>,
    recorded: HashSet<(Option<SourceId>, usize, Severity)>,
    nerrors: usize,
    nwarnings: usize,
    max_errors: usize,
    max_warnings: usize,
    werror: bool,
    nowarn: bool,
    lint_stack: Vec<Lint>,
}

impl Log {
    pub fn new() -> Self {
        Log {
            diagnostics: Vec::new(),
            recorded: HashSet::new(),
            nerrors: 0,
            nwarnings: 0,
            max_errors: 100,
            max_warnings: 100,
            werror: false,
            nowarn: false,
            lint_stack: Vec::new(),
        }
    }

    pub fn from_options(options: &Options) -> Self {
        let mut log = Log::new();
        if let Some(n) = options.get("-Xmaxerrs").and_then(|v| v.parse().ok()) {
            log.max_errors = n;
        }
        if let Some(n) = options.get("-Xmaxwarns").and_then(|v| v.parse().ok()) {
            log.max_warnings = n;
        }
        log.werror = options.is_set("-Werror");
        log.nowarn = options.is_set("-nowarn");
        log
    }

    /// Installs `lint` as the innermost warning-suppression state; callers
    /// pair this with [`Log::pop_lint`] around each declaration body.
    pub fn push_lint(&mut self, lint: Lint) {
        self.lint_stack.push(lint);
    }

    pub fn pop_lint(&mut self) {
        self.lint_stack.pop();
    }

    fn innermost_lint(&self) -> Option<&Lint> {
        self.lint_stack.last()
    }

    pub fn error(&mut self, source: Option<SourceId>, span: Span, key: &'static str, args: Vec<String>) {
        self.report(Diagnostic {
            severity: Severity::Error,
            key,
            args,
            source,
            span,
            category: None,
            mandatory: false,
            from_class_file: false,
        });
    }

    pub fn warning(
        &mut self,
        category: Option<LintCategory>,
        source: Option<SourceId>,
        span: Span,
        key: &'static str,
        args: Vec<String>,
    ) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            key,
            args,
            source,
            span,
            category,
            mandatory: false,
            from_class_file: false,
        });
    }

    /// Mandatory warnings bypass `-nowarn`, not category suppression.
    pub fn mandatory_warning(
        &mut self,
        category: Option<LintCategory>,
        source: Option<SourceId>,
        span: Span,
        key: &'static str,
        args: Vec<String>,
    ) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            key,
            args,
            source,
            span,
            category,
            mandatory: true,
            from_class_file: false,
        });
    }

    pub fn note(&mut self, source: Option<SourceId>, span: Span, key: &'static str, args: Vec<String>) {
        self.report(Diagnostic {
            severity: Severity::Note,
            key,
            args,
            source,
            span,
            category: None,
            mandatory: false,
            from_class_file: false,
        });
    }

    pub fn report(&mut self, diag: Diagnostic) {
        if diag.severity == Severity::Warning {
            if let (Some(cat), Some(lint)) = (diag.category, self.innermost_lint()) {
                if lint.is_suppressed(cat) || !lint.is_enabled(cat) {
                    return;
                }
            }
            if self.nowarn && !diag.mandatory {
                return;
            }
        }
        let dedup_key = (diag.source, diag.span.start, diag.severity);
        if !diag.span.is_none() && !self.recorded.insert(dedup_key) {
            return;
        }
        match diag.severity {
            Severity::Error => {
                if self.nerrors >= self.max_errors {
                    return;
                }
                self.nerrors += 1;
            }
            Severity::Warning => {
                if self.nwarnings >= self.max_warnings {
                    return;
                }
                self.nwarnings += 1;
            }
            Severity::Note => {}
        }
        self.diagnostics.push(diag);
    }

    pub fn err_count(&self) -> usize {
        self.nerrors
    }

    pub fn warn_count(&self) -> usize {
        self.nwarnings
    }

    /// Whether the compilation has failed, counting warnings as errors
    /// under `-Werror`.
    pub fn has_errors(&self) -> bool {
        self.nerrors > 0 || (self.werror && self.nwarnings > 0)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn by_key(&self, key: &str) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.key == key).collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.diagnostics).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}
