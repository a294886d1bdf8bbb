use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use splitscan_result::{Error, Result};

use super::text::TextScanner;
use super::{Scanner, ScannerKind};

/// Builds a fresh scanner for one scan range.
pub type ScannerConstructor = Arc<dyn Fn() -> Box<dyn Scanner> + Send + Sync>;

/// Constructors for each scanner kind available in this process.
///
/// Only the text scanner is built in. Other formats are registered by the
/// embedder at startup.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    constructors: FxHashMap<ScannerKind, ScannerConstructor>,
}

impl ScannerRegistry {
    /// A registry with no scanners at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        Self::empty().with(ScannerKind::Text, || {
            Box::new(TextScanner::new()) as Box<dyn Scanner>
        })
    }

    pub fn with<F>(mut self, kind: ScannerKind, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Scanner> + Send + Sync + 'static,
    {
        self.register(kind, constructor);
        self
    }

    /// Register `constructor` for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: ScannerKind, constructor: F)
    where
        F: Fn() -> Box<dyn Scanner> + Send + Sync + 'static,
    {
        self.constructors.insert(kind, Arc::new(constructor));
    }

    pub fn contains(&self, kind: ScannerKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Construct a scanner of `kind`.
    pub fn construct(&self, kind: ScannerKind) -> Result<Box<dyn Scanner>> {
        let constructor = self.constructors.get(&kind).ok_or_else(|| {
            Error::ScannerPrepareFailure(format!("no scanner registered for {kind} files"))
        })?;
        Ok(constructor())
    }
}

impl fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.constructors.keys().map(|k| k.to_string()).collect();
        kinds.sort();
        f.debug_struct("ScannerRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_only_text() {
        let registry = ScannerRegistry::with_builtin();
        assert!(registry.contains(ScannerKind::Text));
        assert!(!registry.contains(ScannerKind::Parquet));

        let scanner = registry.construct(ScannerKind::Text).unwrap();
        assert_eq!(scanner.kind(), ScannerKind::Text);
    }

    #[test]
    fn missing_plugin_is_a_prepare_failure() {
        let registry = ScannerRegistry::with_builtin();
        let err = registry.construct(ScannerKind::LzoText).err().unwrap();
        assert_eq!(
            err.to_string(),
            "failed to prepare scanner: no scanner registered for LZO text files"
        );
    }
}
