//! Unit compiler
//!
//! Turns [`SourceUnit`]s into class images through a [`Toolchain`] located in
//! a [`ToolchainRegistry`]. Build output is never persisted: the toolchain
//! returns images in memory. Sources staged on disk for a toolchain are
//! recorded in the [`ByproductRegistry`] and left for the orchestrator to
//! clean up.

use crate::error::GradingError;
use crate::source::SourceUnit;
use autograde_config::{CollisionPolicy, CompilerConfig, NamespacePolicy};
use autograde_core::{ClassImage, Diagnostic, EmbeddedToolchain, Toolchain, ToolchainSource};
use autograde_vfs::{VfsError, VirtualFileSystem};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Prefix of the private per-run namespaces
pub const PRIVATE_NAMESPACE_PREFIX: &str = "autograde.run";

/// Namespaces held by compiled units that are still alive, process-wide
static ACTIVE_NAMESPACES: Lazy<Mutex<HashSet<String>>> = Lazy::new(Default::default);

static NEXT_RUN: AtomicU64 = AtomicU64::new(1);

fn active_namespaces() -> MutexGuard<'static, HashSet<String>> {
    ACTIVE_NAMESPACES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reservation of a namespace, released on drop
#[derive(Debug)]
pub struct NamespaceLease {
    namespace: String,
}

impl NamespaceLease {
    /// Reserve `namespace` unless another live unit holds it
    fn acquire(namespace: &str) -> Option<NamespaceLease> {
        active_namespaces()
            .insert(namespace.to_string())
            .then(|| NamespaceLease {
                namespace: namespace.to_string(),
            })
    }

    /// A fresh `autograde.run<N>` namespace
    fn private() -> NamespaceLease {
        loop {
            let run = NEXT_RUN.fetch_add(1, Ordering::Relaxed);
            if let Some(lease) = Self::acquire(&format!("{PRIVATE_NAMESPACE_PREFIX}{run}")) {
                return lease;
            }
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Drop for NamespaceLease {
    fn drop(&mut self) {
        active_namespaces().remove(&self.namespace);
    }
}

/// Whether some live compiled unit holds `namespace`
pub fn namespace_in_use(namespace: &str) -> bool {
    active_namespaces().contains(namespace)
}

/// Toolchains by name and version
#[derive(Clone)]
pub struct ToolchainRegistry {
    toolchains: Vec<Arc<dyn Toolchain>>,
}

impl ToolchainRegistry {
    pub fn empty() -> Self {
        Self {
            toolchains: Vec::new(),
        }
    }

    /// Later registrations shadow earlier ones with the same name
    pub fn register(&mut self, toolchain: Arc<dyn Toolchain>) {
        self.toolchains.push(toolchain);
    }

    pub fn names(&self) -> Vec<String> {
        self.toolchains.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn locate(&self, name: &str, version: Option<&str>) -> Result<Arc<dyn Toolchain>, GradingError> {
        self.toolchains
            .iter()
            .rev()
            .find(|t| t.name() == name && version.map_or(true, |v| t.version() == v))
            .cloned()
            .ok_or_else(|| GradingError::ToolchainUnavailable {
                name: name.to_string(),
                version: version.map(str::to_string),
            })
    }
}

impl Default for ToolchainRegistry {
    /// Registry holding the embedded toolchain
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(EmbeddedToolchain::new()));
        registry
    }
}

/// Files written as a side effect of compiling
///
/// The engine only records paths; deleting them is up to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ByproductRegistry {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl ByproductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(target: "autograde::compiler", path = %path.display(), "byproduct recorded");
        self.lock().push(path);
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every recorded path, leaving the registry empty
    pub fn drain(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.lock())
    }

    /// Remove every recorded file from `fs`; returns the failures
    pub fn cleanup(&self, fs: &dyn VirtualFileSystem) -> Vec<(PathBuf, VfsError)> {
        self.drain()
            .into_iter()
            .filter_map(|path| fs.remove_file(&path).err().map(|err| (path, err)))
            .collect()
    }
}

/// Class images of one primary unit and its ancillaries, all in one namespace
///
/// Holds the namespace reservation until dropped.
#[derive(Debug)]
pub struct CompiledUnit {
    /// Simple name of the entry type
    pub entry_name: String,
    pub classes: Vec<ClassImage>,
    pub warnings: Vec<Diagnostic>,
    /// Imports declared by the primary unit
    pub imports: Vec<String>,
    lease: NamespaceLease,
}

impl CompiledUnit {
    pub fn namespace(&self) -> &str {
        self.lease.namespace()
    }

    /// `namespace.Entry`
    pub fn entry_qualified_name(&self) -> String {
        format!("{}.{}", self.namespace(), self.entry_name)
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.qualified_name.as_str()).collect()
    }
}

pub struct UnitCompiler {
    config: CompilerConfig,
    toolchains: ToolchainRegistry,
    fs: Arc<dyn VirtualFileSystem>,
    byproducts: ByproductRegistry,
}

impl UnitCompiler {
    pub fn new(config: CompilerConfig, fs: Arc<dyn VirtualFileSystem>) -> Self {
        Self {
            config,
            toolchains: ToolchainRegistry::default(),
            fs,
            byproducts: ByproductRegistry::new(),
        }
    }

    pub fn with_toolchains(mut self, toolchains: ToolchainRegistry) -> Self {
        self.toolchains = toolchains;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn byproducts(&self) -> &ByproductRegistry {
        &self.byproducts
    }

    pub fn fs(&self) -> &Arc<dyn VirtualFileSystem> {
        &self.fs
    }

    /// Read a unit from the file system
    pub fn read_source(&self, path: &Path) -> Result<SourceUnit, GradingError> {
        let text = self.fs.read_to_string(path)?;
        Ok(SourceUnit::new(path.to_string_lossy(), text))
    }

    pub fn compile(&self, unit: SourceUnit) -> Result<CompiledUnit, GradingError> {
        self.compile_with(unit, Vec::new())
    }

    /// Compile `primary` together with `ancillary` units; all of them end
    /// up in the primary's effective namespace
    pub fn compile_with(
        &self,
        mut primary: SourceUnit,
        mut ancillary: Vec<SourceUnit>,
    ) -> Result<CompiledUnit, GradingError> {
        let entry_name = primary
            .entry_name
            .clone()
            .ok_or_else(|| GradingError::NameInferenceFailed {
                origin: primary.origin.clone(),
            })?;
        let toolchain = self
            .toolchains
            .locate(&self.config.toolchain, self.config.toolchain_version.as_deref())?;
        let lease = self.reserve_namespace(&primary)?;
        info!(
            target: "autograde::compiler",
            entry = %entry_name,
            namespace = lease.namespace(),
            toolchain = toolchain.name(),
            units = 1 + ancillary.len(),
            "compiling unit"
        );

        primary.rewrite_namespace(lease.namespace());
        for unit in &mut ancillary {
            unit.rewrite_namespace(lease.namespace());
        }

        let mut sources = Vec::with_capacity(1 + ancillary.len());
        for unit in std::iter::once(&primary).chain(&ancillary) {
            let mut source = ToolchainSource::new(unit.file_name(), unit.text.clone());
            if toolchain.requires_staging() || self.config.stage_sources {
                source.staged_path = Some(self.stage(unit, lease.namespace())?);
            }
            sources.push(source);
        }

        let output = toolchain
            .compile(&sources, &self.config.toolchain_args)
            .map_err(|diagnostics| {
                debug!(target: "autograde::compiler", errors = diagnostics.len(), "compile failure");
                GradingError::CompileFailure { diagnostics }
            })?;
        for warning in &output.warnings {
            warn!(target: "autograde::compiler", "{warning}");
        }
        debug!(
            target: "autograde::compiler",
            classes = output.classes.len(),
            warnings = output.warnings.len(),
            "compiled"
        );

        Ok(CompiledUnit {
            entry_name,
            classes: output.classes,
            warnings: output.warnings,
            imports: primary.imports,
            lease,
        })
    }

    fn reserve_namespace(&self, unit: &SourceUnit) -> Result<NamespaceLease, GradingError> {
        let declared = match (&unit.declared_namespace, self.config.namespace) {
            (Some(declared), NamespacePolicy::Preserve) => declared,
            _ => return Ok(NamespaceLease::private()),
        };
        if let Some(lease) = NamespaceLease::acquire(declared) {
            return Ok(lease);
        }
        match self.config.collision {
            CollisionPolicy::Rename => {
                let lease = NamespaceLease::private();
                debug!(
                    target: "autograde::compiler",
                    declared = %declared,
                    renamed = lease.namespace(),
                    "namespace collision, renaming"
                );
                Ok(lease)
            }
            CollisionPolicy::Reject => Err(GradingError::NamespaceCollision {
                namespace: declared.clone(),
            }),
        }
    }

    /// Write `unit` under `staging_dir/<namespace as path>/`
    fn stage(&self, unit: &SourceUnit, namespace: &str) -> Result<PathBuf, GradingError> {
        let dir = namespace
            .split('.')
            .fold(self.config.staging_dir.clone(), |dir, part| dir.join(part));
        self.fs.create_dir_all(&dir)?;
        let path = dir.join(unit.file_name());
        self.fs.write_file(&path, unit.text.as_bytes())?;
        self.byproducts.record(&path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autograde_vfs::MemoryFileSystem;

    fn compiler(config: CompilerConfig) -> (UnitCompiler, MemoryFileSystem) {
        let fs = MemoryFileSystem::new();
        (UnitCompiler::new(config, Arc::new(fs.clone())), fs)
    }

    #[test]
    fn test_private_namespace_is_synthesized() {
        let (compiler, _) = compiler(CompilerConfig::default());
        let unit = compiler
            .compile(SourceUnit::from_memory("public class Calc { int f() { return 1; } }"))
            .unwrap();
        assert!(unit.namespace().starts_with(PRIVATE_NAMESPACE_PREFIX));
        assert_eq!(unit.entry_qualified_name(), format!("{}.Calc", unit.namespace()));
        assert!(namespace_in_use(unit.namespace()));
        let namespace = unit.namespace().to_string();
        drop(unit);
        assert!(!namespace_in_use(&namespace));
    }

    #[test]
    fn test_name_inference_failure_is_distinct() {
        let (compiler, _) = compiler(CompilerConfig::default());
        let err = compiler.compile(SourceUnit::from_memory("class Hidden {}")).unwrap_err();
        assert!(matches!(err, GradingError::NameInferenceFailed { .. }));
    }

    #[test]
    fn test_compile_failure_carries_diagnostics() {
        let (compiler, _) = compiler(CompilerConfig::default());
        let err = compiler
            .compile(SourceUnit::from_memory("public class Calc {\n  int f() { return y; }\n}"))
            .unwrap_err();
        let GradingError::CompileFailure { diagnostics } = err else {
            panic!("expected compile failure");
        };
        assert_eq!(diagnostics[0].to_string(), "Calc.java:2:20: error: cannot find symbol: variable y");
    }

    #[test]
    fn test_unknown_toolchain() {
        let config = CompilerConfig {
            toolchain: "javac".into(),
            ..CompilerConfig::default()
        };
        let (compiler, _) = compiler(config);
        let err = compiler.compile(SourceUnit::from_memory("public class A {}")).unwrap_err();
        assert!(matches!(err, GradingError::ToolchainUnavailable { ref name, .. } if name == "javac"));
    }

    #[test]
    fn test_version_mismatch() {
        let registry = ToolchainRegistry::default();
        assert!(registry.locate("javalite", Some("0.0.0-none")).is_err());
        assert!(registry.locate("javalite", None).is_ok());
        assert_eq!(registry.names(), vec!["javalite"]);
    }

    #[test]
    fn test_preserve_then_reject_collision() {
        let config = CompilerConfig {
            namespace: NamespacePolicy::Preserve,
            collision: CollisionPolicy::Reject,
            ..CompilerConfig::default()
        };
        let (compiler, _) = compiler(config);
        let source = "package hw.reject.one;\npublic class A {}";
        let first = compiler.compile(SourceUnit::from_memory(source)).unwrap();
        assert_eq!(first.namespace(), "hw.reject.one");
        let err = compiler.compile(SourceUnit::from_memory(source)).unwrap_err();
        assert!(matches!(err, GradingError::NamespaceCollision { .. }));
        drop(first);
        assert!(compiler.compile(SourceUnit::from_memory(source)).is_ok());
    }

    #[test]
    fn test_preserve_then_rename_collision() {
        let config = CompilerConfig {
            namespace: NamespacePolicy::Preserve,
            ..CompilerConfig::default()
        };
        let (compiler, _) = compiler(config);
        let source = "package hw.rename.one;\npublic class A {}";
        let first = compiler.compile(SourceUnit::from_memory(source)).unwrap();
        let second = compiler.compile(SourceUnit::from_memory(source)).unwrap();
        assert_eq!(first.namespace(), "hw.rename.one");
        assert!(second.namespace().starts_with(PRIVATE_NAMESPACE_PREFIX));
    }

    #[test]
    fn test_ancillary_units_share_namespace() {
        let (compiler, _) = compiler(CompilerConfig::default());
        let unit = compiler
            .compile_with(
                SourceUnit::from_memory("public class Main { int f() { return new Helper().g(); } }"),
                vec![SourceUnit::new("Helper.java", "package elsewhere;\nclass Helper { int g() { return 2; } }")],
            )
            .unwrap();
        let ns = unit.namespace().to_string();
        assert_eq!(unit.class_names(), vec![format!("{ns}.Main"), format!("{ns}.Helper")]);
    }

    #[test]
    fn test_staging_records_byproducts() {
        let config = CompilerConfig {
            stage_sources: true,
            staging_dir: PathBuf::from("/stage"),
            ..CompilerConfig::default()
        };
        let (compiler, fs) = compiler(config);
        let unit = compiler
            .compile(SourceUnit::new("/subs/Calc.java", "public class Calc {}"))
            .unwrap();
        let paths = compiler.byproducts().paths();
        assert_eq!(paths.len(), 1);
        let expected = unit
            .namespace()
            .split('.')
            .fold(PathBuf::from("/stage"), |dir, part| dir.join(part))
            .join("Calc.java");
        assert_eq!(paths[0], expected);
        assert!(fs.is_file(&expected));

        let failures = compiler.byproducts().cleanup(&fs);
        assert!(failures.is_empty());
        assert!(!fs.exists(&expected));
        assert!(compiler.byproducts().is_empty());
    }

    #[test]
    fn test_read_source() {
        let (compiler, fs) = compiler(CompilerConfig::default());
        fs.write_file(Path::new("/subs/Calc.java"), b"public class Calc {}").unwrap();
        let unit = compiler.read_source(Path::new("/subs/Calc.java")).unwrap();
        assert_eq!(unit.entry_name.as_deref(), Some("Calc"));
        assert_eq!(unit.file_name(), "Calc.java");
        let err = compiler.read_source(Path::new("/subs/Missing.java")).unwrap_err();
        assert!(matches!(err, GradingError::Io(VfsError::NotFound { .. })));
    }
}
