//! Strategy lookup by name, for configuration.

use std::sync::Arc;

use super::{CdSignalStrategy, MaCrossStrategy, Strategy, VolumeSurgeStrategy};

/// Names accepted by [`build`].
pub const NAMES: [&str; 3] = ["CDSignalStrategy", "MACrossStrategy", "VolumeSurgeStrategy"];

/// Build a built-in strategy from its name.
pub fn build(name: &str) -> Option<Arc<dyn Strategy>> {
    match name {
        "VolumeSurgeStrategy" => Some(Arc::new(VolumeSurgeStrategy)),
        "MACrossStrategy" => Some(Arc::new(MaCrossStrategy)),
        "CDSignalStrategy" => Some(Arc::new(CdSignalStrategy::default())),
        _ => None,
    }
}

/// Names of all built-in strategies.
pub fn names() -> &'static [&'static str] {
    &NAMES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_builds_itself() {
        for name in names() {
            let strategy = build(name).unwrap();
            assert_eq!(strategy.name(), *name);
            assert!(!strategy.description().is_empty());
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(build("RsiStrategy").is_none());
        assert!(build("volumesurgestrategy").is_none());
    }
}
