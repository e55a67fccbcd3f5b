//! Acceptance policies

/// Policy for handling records that fail to transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptancePolicy {
    /// Abort the batch on the first failing record
    #[default]
    FailFast,

    /// Set failing records aside and continue with the rest
    SkipInvalid,
}

impl AcceptancePolicy {
    /// Whether a failing record aborts the batch
    pub fn aborts_on_failure(self) -> bool {
        matches!(self, Self::FailFast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_fails_fast() {
        assert_eq!(AcceptancePolicy::default(), AcceptancePolicy::FailFast);
        assert!(AcceptancePolicy::FailFast.aborts_on_failure());
        assert!(!AcceptancePolicy::SkipInvalid.aborts_on_failure());
    }
}
