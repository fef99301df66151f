//! Country name reconciliation.
//!
//! The Monkeypox series spells some countries differently from the location
//! reference table. Names are normalized through an ordered table of
//! substring rules before the join; the first matching rule wins.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EtlError, Result};

/// Replace the whole name with `replacement` when it contains `pattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRule {
    pub pattern: String,
    pub replacement: String,
}

impl CountryRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        name.contains(self.pattern.as_str())
    }
}

/// Built-in rules, in priority order
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("Bosnia and Herzegovina", "Bosnia And Herzegovina"),
    ("United States", "USA"),
    ("Democratic Republic of Congo", "Democratic Republic Of The Congo"),
    ("Czechia", "Czech Republic"),
    ("United Kingdom", "UK"),
    ("Vietnam", "Viet Nam"),
];

/// Ordered pattern/replacement table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<CountryRule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTable {
    pub fn builtin() -> Self {
        Self {
            rules: BUILTIN_RULES
                .iter()
                .map(|(pattern, replacement)| CountryRule::new(*pattern, *replacement))
                .collect(),
        }
    }

    /// Built-in rules followed by `extra`, so built-ins keep priority
    pub fn with_extra_rules(extra: &[CountryRule]) -> Result<Self> {
        let mut table = Self::builtin();
        table.rules.extend(extra.iter().cloned());
        table.validate()?;
        if !extra.is_empty() {
            debug!(extra = extra.len(), total = table.rules.len(), "Extended reconciliation rules");
        }
        Ok(table)
    }

    /// Reject empty patterns and replacements that another rule would rewrite
    /// again; either would make `reconcile` non-idempotent.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.rules {
            if rule.pattern.is_empty() {
                return Err(EtlError::InvalidRule(format!(
                    "empty pattern for replacement '{}'",
                    rule.replacement
                )));
            }
        }
        for rule in &self.rules {
            if let Some(first) = self.first_match(&rule.replacement) {
                if first.replacement != rule.replacement {
                    return Err(EtlError::InvalidRule(format!(
                        "replacement '{}' is rewritten again by pattern '{}'",
                        rule.replacement, first.pattern
                    )));
                }
            }
        }
        Ok(())
    }

    fn first_match(&self, name: &str) -> Option<&CountryRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    /// Total: unmatched names come back unchanged
    pub fn reconcile(&self, name: &str) -> String {
        match self.first_match(name) {
            Some(rule) => rule.replacement.clone(),
            None => name.to_string(),
        }
    }

    pub fn rules(&self) -> &[CountryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Reconcile with the built-in table
pub fn reconcile(name: &str) -> String {
    RuleTable::builtin().reconcile(name)
}
