// Dialect context
//
// The pass manager does not define dialects; it only needs a registry to
// resolve dependent-dialect names against and a record of which dialects
// have been loaded. The context must outlive every run that borrows it.

use indexmap::IndexSet;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("dialect '{0}' is not registered")]
pub struct UnknownDialect(pub String);

/// The set of dialect names available for loading.
#[derive(Debug, Default, Clone)]
pub struct DialectRegistry {
    dialects: IndexSet<String>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialects<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dialects: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.dialects.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dialects.contains(name)
    }
}

/// Owns the dialect registry and tracks loaded dialects across runs.
#[derive(Debug, Default)]
pub struct Context {
    registry: DialectRegistry,
    loaded: IndexSet<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: DialectRegistry) -> Self {
        Self {
            registry,
            loaded: IndexSet::new(),
        }
    }

    pub fn append_registry(&mut self, registry: &DialectRegistry) {
        for dialect in &registry.dialects {
            self.registry.insert(dialect.clone());
        }
    }

    /// Loads a registered dialect. Idempotent for already-loaded dialects.
    pub fn load_dialect(&mut self, name: &str) -> Result<(), UnknownDialect> {
        if !self.registry.contains(name) {
            return Err(UnknownDialect(name.to_string()));
        }
        self.loaded.insert(name.to_string());
        Ok(())
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    pub fn loaded_dialects(&self) -> impl Iterator<Item = &str> {
        self.loaded.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_requires_registration() {
        let mut ctx = Context::with_registry(DialectRegistry::with_dialects(["func"]));
        assert!(ctx.load_dialect("func").is_ok());
        assert!(ctx.is_loaded("func"));

        let err = ctx.load_dialect("nonexistent").unwrap_err();
        assert_eq!(err.to_string(), "dialect 'nonexistent' is not registered");
        assert!(!ctx.is_loaded("nonexistent"));
    }

    #[test]
    fn loading_is_idempotent() {
        let mut ctx = Context::with_registry(DialectRegistry::with_dialects(["arith"]));
        ctx.load_dialect("arith").unwrap();
        ctx.load_dialect("arith").unwrap();
        assert_eq!(ctx.loaded_dialects().count(), 1);
    }
}
