pub use crate::bdd::BddConfig;
use crate::search::DEFAULT_MAX_ATTEMPTS;

/// Knobs of a full [`Analyzer`][crate::analysis::Analyzer] run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Stop explicit search after this many markings; `None` explores everything.
    pub explicit_limit: Option<usize>,
    /// Cap on candidates checked per cutting-plane search.
    pub max_attempts: usize,
    /// Compare the symbolic result against the explicit one when both exist.
    pub cross_validate: bool,
    /// Also compare the sets themselves, not only their sizes.
    pub check_set_equality: bool,
    pub bdd: BddConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            explicit_limit: Some(1_000_000),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cross_validate: true,
            check_set_equality: true,
            bdd: BddConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_explicit_limit(mut self, explicit_limit: Option<usize>) -> Self {
        self.explicit_limit = explicit_limit;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_cross_validate(mut self, cross_validate: bool) -> Self {
        self.cross_validate = cross_validate;
        self
    }

    pub fn with_check_set_equality(mut self, check_set_equality: bool) -> Self {
        self.check_set_equality = check_set_equality;
        self
    }

    pub fn with_bdd(mut self, bdd: BddConfig) -> Self {
        self.bdd = bdd;
        self
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_builder() {
        let config = AnalysisConfig::default()
            .with_explicit_limit(None)
            .with_max_attempts(5)
            .with_bdd(BddConfig::default().with_cache_bits(10));
        assert_eq!(config.explicit_limit, None);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.bdd.cache_bits, 10);
        assert!(config.cross_validate);
        assert!(config.check_set_equality);
    }
}
