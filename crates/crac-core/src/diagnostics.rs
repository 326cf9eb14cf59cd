//! Non-fatal findings about a built Crac.
//!
//! Builders reject anything that breaks an invariant; what remains legal but
//! suspicious (an action that can never be used, a cnec nobody looks at) is
//! reported here by [`Crac::validate_into`](crate::Crac::validate_into).
//!
//! # Example
//!
//! ```
//! use crac_core::diagnostics::{Category, Diagnostics};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning(Category::UsageRule, "no usage rule", "topo-1");
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.summary(), "1 warning");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Legal, but probably not what the author meant
    Warning,
    /// The entity cannot be evaluated as built
    Error,
}

/// What part of the model an issue is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    UsageRule,
    Range,
    Monitoring,
    Contingency,
    Threshold,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::UsageRule => "usage_rule",
            Category::Range => "range",
            Category::Monitoring => "monitoring",
            Category::Contingency => "contingency",
            Category::Threshold => "threshold",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    /// Id of the cnec, remedial action or contingency concerned
    pub entity: String,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: Category,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            entity: entity.into(),
        }
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}:{}] {} ({})", severity, self.category, self.message, self.entity)
    }
}

/// Issues collected over one or more validation passes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: Category, message: impl Into<String>, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message, entity));
    }

    pub fn add_error(&mut self, category: Category, message: impl Into<String>, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message, entity));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn issues_by_category(&self, category: Category) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Issues about one entity id
    pub fn issues_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.entity == entity)
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn clear(&mut self) {
        self.issues.clear();
    }

    /// e.g. `"2 warnings, 1 error"`
    pub fn summary(&self) -> String {
        fn plural(count: usize, word: &str) -> String {
            format!("{} {}{}", count, word, if count == 1 { "" } else { "s" })
        }

        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}
