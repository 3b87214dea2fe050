/*!
 * Feature toggles consulted by the description pipeline
 */

/// Named toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Pick a uniformly random description instead of the first one
    RandomDescription,
}

/// Read-only toggle query
pub trait FeatureToggle: Send + Sync {
    fn is_enabled(&self, feature: Feature) -> bool;
}

impl<F> FeatureToggle for F
where
    F: Fn(Feature) -> bool + Send + Sync,
{
    fn is_enabled(&self, feature: Feature) -> bool {
        self(feature)
    }
}

/// Toggles fixed at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticFeatures {
    pub random_description: bool,
}

impl StaticFeatures {
    pub fn new(random_description: bool) -> Self {
        Self { random_description }
    }
}

impl FeatureToggle for StaticFeatures {
    fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::RandomDescription => self.random_description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_features() {
        assert!(!StaticFeatures::default().is_enabled(Feature::RandomDescription));
        assert!(StaticFeatures::new(true).is_enabled(Feature::RandomDescription));
    }

    #[test]
    fn test_closure_toggle() {
        let toggle = |feature: Feature| feature == Feature::RandomDescription;
        assert!(toggle.is_enabled(Feature::RandomDescription));
    }
}
