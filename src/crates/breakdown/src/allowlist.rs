//! Pre-approved stage codes
//!
//! Each non-open stage has its own fixed set of codes. The sets are built once
//! from configuration and never change while the server runs.

use std::collections::HashSet;

use crate::config::AllowlistConfig;
use crate::ticket::Stage;

/// A fixed set of approved codes
#[derive(Debug, Clone, Default)]
pub struct CodeSet {
    codes: HashSet<String>,
}

impl CodeSet {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            codes: codes
                .into_iter()
                .map(|code| code.as_ref().trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code.trim())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Allowlists for the temporary, closure and approval stages
#[derive(Debug, Clone, Default)]
pub struct Allowlists {
    maintenance: CodeSet,
    closure: CodeSet,
    approval: CodeSet,
}

impl Allowlists {
    pub fn new(maintenance: CodeSet, closure: CodeSet, approval: CodeSet) -> Self {
        Self {
            maintenance,
            closure,
            approval,
        }
    }

    /// Code set guarding a stage. The open stage has none.
    pub fn for_stage(&self, stage: Stage) -> Option<&CodeSet> {
        match stage {
            Stage::Open => None,
            Stage::Temporary => Some(&self.maintenance),
            Stage::Closure => Some(&self.closure),
            Stage::Approval => Some(&self.approval),
        }
    }

    /// Whether `code` is approved for `stage`
    pub fn is_approved(&self, stage: Stage, code: &str) -> bool {
        self.for_stage(stage)
            .map_or(false, |codes| codes.contains(code))
    }
}

impl From<&AllowlistConfig> for Allowlists {
    fn from(config: &AllowlistConfig) -> Self {
        Self::new(
            CodeSet::new(&config.maintenance),
            CodeSet::new(&config.closure),
            CodeSet::new(&config.approval),
        )
    }
}
