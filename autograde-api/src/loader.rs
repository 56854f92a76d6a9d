//! In-memory loader
//!
//! One [`Loader`] per grading attempt. It holds the runtime classes (and so
//! the static state) of the units defined in it, answers the interpreter's
//! class lookups, and hands the engine cached member tables. Names that are
//! not defined here fall back to the ambient library.

use crate::compiler::CompiledUnit;
use crate::error::GradingError;
use autograde_core::{ClassImage, ClassResolver, RuntimeClass, TypeInfo};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, trace};

static NEXT_LOADER: AtomicU64 = AtomicU64::new(1);

pub struct Loader {
    id: u64,
    /// Defined classes by qualified name
    classes: RwLock<HashMap<String, Arc<RuntimeClass>>>,
    /// Member tables by qualified name
    tables: Mutex<HashMap<String, Arc<TypeInfo>>>,
}

impl Loader {
    pub fn new() -> Arc<Loader> {
        let id = NEXT_LOADER.fetch_add(1, Ordering::Relaxed);
        debug!(target: "autograde::loader", loader = id, "new loader");
        Arc::new(Loader {
            id,
            classes: RwLock::new(HashMap::new()),
            tables: Mutex::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, Arc<TypeInfo>>> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register one class image; a name can only be defined once
    pub fn define(&self, image: ClassImage) -> Result<Arc<RuntimeClass>, GradingError> {
        let mut classes = self
            .classes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if classes.contains_key(&image.qualified_name) {
            return Err(GradingError::DuplicateDefinition {
                name: image.qualified_name,
            });
        }
        let class = RuntimeClass::new(image);
        debug!(target: "autograde::loader", loader = self.id, class = class.name(), "defined");
        classes.insert(class.name().to_string(), Arc::clone(&class));
        Ok(class)
    }

    /// Define every class of a compiled unit
    pub fn define_unit(&self, unit: &CompiledUnit) -> Result<(), GradingError> {
        for image in &unit.classes {
            self.define(image.clone())?;
        }
        Ok(())
    }

    pub fn defined_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Defined class by qualified name, or by simple name when exactly one
    /// defined class has it
    fn lookup(&self, name: &str) -> Option<Arc<RuntimeClass>> {
        let classes = self
            .classes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(class) = classes.get(name) {
            return Some(Arc::clone(class));
        }
        if name.contains('.') {
            return None;
        }
        let mut matches = classes.values().filter(|c| c.simple_name() == name);
        match (matches.next(), matches.next()) {
            (Some(class), None) => Some(Arc::clone(class)),
            _ => None,
        }
    }

    /// Member table for `name`, preferring defined classes over the ambient
    /// library
    pub fn resolve(&self, name: &str) -> Result<Arc<TypeInfo>, GradingError> {
        if let Some(class) = self.lookup(name) {
            let mut tables = self.tables();
            let info = tables
                .entry(class.name().to_string())
                .or_insert_with(|| {
                    trace!(target: "autograde::loader", class = class.name(), "building member table");
                    Arc::new(TypeInfo::introspect(&class))
                });
            return Ok(Arc::clone(info));
        }
        if let Some(info) = TypeInfo::ambient(name) {
            let mut tables = self.tables();
            let info = tables
                .entry(info.name.clone())
                .or_insert_with(|| Arc::new(info));
            return Ok(Arc::clone(info));
        }
        debug!(target: "autograde::loader", loader = self.id, name, "type not found");
        Err(GradingError::TypeNotFound {
            name: name.to_string(),
        })
    }
}

impl ClassResolver for Loader {
    fn find_class(&self, name: &str) -> Option<Arc<RuntimeClass>> {
        self.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autograde_core::{EmbeddedToolchain, Toolchain, ToolchainSource, TypeOrigin};

    fn images(namespace: &str, source: &str) -> Vec<ClassImage> {
        let text = format!("package {namespace}; {source}");
        EmbeddedToolchain
            .compile(&[ToolchainSource::new("Calc.java", text)], &[])
            .unwrap()
            .classes
    }

    #[test]
    fn test_resolve_prefers_defined_types() {
        let loader = Loader::new();
        for image in images("hw", "public class Math { static int max(int a, int b) { return 0; } }") {
            loader.define(image).unwrap();
        }
        let info = loader.resolve("Math").unwrap();
        assert_eq!(info.origin, TypeOrigin::Defined);
        assert_eq!(info.name, "hw.Math");
        let ambient = loader.resolve("java.lang.Math").unwrap();
        assert_eq!(ambient.origin, TypeOrigin::Ambient);
    }

    #[test]
    fn test_tables_are_cached() {
        let loader = Loader::new();
        for image in images("hw", "public class Calc {}") {
            loader.define(image).unwrap();
        }
        let a = loader.resolve("hw.Calc").unwrap();
        let b = loader.resolve("Calc").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_definition() {
        let loader = Loader::new();
        let image = images("hw", "public class Calc {}").remove(0);
        loader.define(image.clone()).unwrap();
        let err = loader.define(image).unwrap_err();
        assert_eq!(err, GradingError::DuplicateDefinition { name: "hw.Calc".into() });
    }

    #[test]
    fn test_fresh_loader_allows_redefinition() {
        let image = images("hw", "public class Calc {}").remove(0);
        let first = Loader::new();
        first.define(image.clone()).unwrap();
        let second = Loader::new();
        assert!(second.define(image).is_ok());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_ambiguous_simple_name() {
        let loader = Loader::new();
        for image in images("a", "public class Calc {}").into_iter().chain(images("b", "public class Calc {}")) {
            loader.define(image).unwrap();
        }
        assert!(loader.find_class("Calc").is_none());
        assert!(loader.find_class("a.Calc").is_some());
        assert_eq!(loader.defined_names(), vec!["a.Calc", "b.Calc"]);
    }

    #[test]
    fn test_unknown_type() {
        let loader = Loader::new();
        assert_eq!(
            loader.resolve("Nope").unwrap_err(),
            GradingError::TypeNotFound { name: "Nope".into() }
        );
    }
}
