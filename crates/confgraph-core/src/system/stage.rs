//! # Build Stages
//!
//! One build walks the stages below in order, exactly once:
//!
//! | Stage | Name | Input | Output |
//! |-------|------|-------|--------|
//! | Discover | Discovery | resources | candidate definitions |
//! | Resolve | Reachability | candidates + root | active definitions |
//! | Sort | Ordering | active definitions | dependency-first order |
//! | Schema | Schema Merge | order | configuration with schemas |
//! | Init | Initialization | configuration | seeded configuration |
//! | Configure | Configuration | configuration | shaped configuration |
//! | Validate | Validation | configuration | validated configuration |
//!
//! A failure in any stage ends the build; nothing is retried.

use serde::{Deserialize, Serialize};

// =============================================================================
// STAGE ENUM
// =============================================================================

/// A stage of the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Gather and deduplicate definitions.
    Discover,
    /// Restrict to the root's dependency closure.
    Resolve,
    /// Order dependency-first, rejecting missing modules and cycles.
    Sort,
    /// Collect schemas and initialize the configuration.
    Schema,
    /// Apply initializers, dependencies first.
    Init,
    /// Apply configure functions, dependents first.
    Configure,
    /// Final validation.
    Validate,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::Discover,
        Stage::Resolve,
        Stage::Sort,
        Stage::Schema,
        Stage::Init,
        Stage::Configure,
        Stage::Validate,
    ];

    /// Get the stage name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Discover => "Discovery",
            Stage::Resolve => "Reachability",
            Stage::Sort => "Ordering",
            Stage::Schema => "Schema Merge",
            Stage::Init => "Initialization",
            Stage::Configure => "Configuration",
            Stage::Validate => "Validation",
        }
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Discover => Some(Stage::Resolve),
            Stage::Resolve => Some(Stage::Sort),
            Stage::Sort => Some(Stage::Schema),
            Stage::Schema => Some(Stage::Init),
            Stage::Init => Some(Stage::Configure),
            Stage::Configure => Some(Stage::Validate),
            Stage::Validate => None,
        }
    }

    /// Get the previous stage, if any.
    #[must_use]
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Discover => None,
            Stage::Resolve => Some(Stage::Discover),
            Stage::Sort => Some(Stage::Resolve),
            Stage::Schema => Some(Stage::Sort),
            Stage::Init => Some(Stage::Schema),
            Stage::Configure => Some(Stage::Init),
            Stage::Validate => Some(Stage::Configure),
        }
    }

    /// Check if this stage is terminal (Validate).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Validate)
    }

    /// True for the stages that invoke module callbacks.
    #[must_use]
    pub fn runs_callbacks(&self) -> bool {
        matches!(self, Stage::Schema | Stage::Init | Stage::Configure)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self, self.name())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering() {
        assert!(Stage::Discover < Stage::Resolve);
        assert!(Stage::Init < Stage::Configure);
        assert!(Stage::Configure < Stage::Validate);
    }

    #[test]
    fn next_walks_all_stages() {
        let mut walked = vec![Stage::Discover];
        let mut current = Stage::Discover;
        while let Some(next) = current.next() {
            walked.push(next);
            current = next;
        }
        assert_eq!(walked, Stage::ALL.to_vec());
        assert!(current.is_terminal());
    }

    #[test]
    fn previous_inverts_next() {
        for stage in Stage::ALL {
            if let Some(next) = stage.next() {
                assert_eq!(next.previous(), Some(stage));
            }
        }
        assert_eq!(Stage::Discover.previous(), None);
    }

    #[test]
    fn callback_stages() {
        let callback: Vec<_> = Stage::ALL
            .into_iter()
            .filter(Stage::runs_callbacks)
            .collect();
        assert_eq!(callback, vec![Stage::Schema, Stage::Init, Stage::Configure]);
    }

    #[test]
    fn display_includes_name() {
        assert_eq!(Stage::Init.to_string(), "Init: Initialization");
    }
}
