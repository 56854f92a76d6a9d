//! Compiled classes and their per-loader runtime state

use super::lock;
use super::types::Ty;
use super::value::Value;
use crate::compiler::ast::ClassDecl;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The artifact a toolchain produces for one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassImage {
    /// `namespace.Name`, or `Name` in the unnamed namespace
    pub qualified_name: String,
    pub namespace: String,
    /// File name diagnostics and traces refer to (`Calc.java`)
    pub origin: String,
    pub decl: Arc<ClassDecl>,
    /// Record line numbers in fault traces
    pub line_numbers: bool,
}

impl ClassImage {
    pub fn new(decl: ClassDecl, namespace: &str, origin: &str, line_numbers: bool) -> Self {
        let qualified_name = if namespace.is_empty() {
            decl.name.clone()
        } else {
            format!("{namespace}.{}", decl.name)
        };
        Self {
            qualified_name,
            namespace: namespace.to_string(),
            origin: origin.to_string(),
            decl: Arc::new(decl),
            line_numbers,
        }
    }

    pub fn simple_name(&self) -> &str {
        &self.decl.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Pending,
    Running,
    Done,
    Failed,
}

/// What a caller of [`RuntimeClass::begin_init`] has to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitClaim {
    Run,
    Ready,
    /// A previous initialization failed
    Erroneous,
}

/// A class defined in a loader: the image plus its static fields
pub struct RuntimeClass {
    image: ClassImage,
    statics: Mutex<HashMap<String, Value>>,
    init: Mutex<InitState>,
}

impl RuntimeClass {
    pub fn new(image: ClassImage) -> Arc<Self> {
        let statics = image
            .decl
            .fields
            .iter()
            .filter(|f| f.modifiers.is_static)
            .map(|f| {
                let ty = Ty::resolve(&f.ty, &image.namespace);
                (f.name.clone(), Value::default_for(&ty))
            })
            .collect();
        Arc::new(Self {
            image,
            statics: Mutex::new(statics),
            init: Mutex::new(InitState::Pending),
        })
    }

    pub fn image(&self) -> &ClassImage {
        &self.image
    }

    pub fn decl(&self) -> &Arc<ClassDecl> {
        &self.image.decl
    }

    pub fn name(&self) -> &str {
        &self.image.qualified_name
    }

    pub fn simple_name(&self) -> &str {
        self.image.simple_name()
    }

    pub fn namespace(&self) -> &str {
        &self.image.namespace
    }

    /// Declared type of a field
    pub fn field_ty(&self, name: &str) -> Option<Ty> {
        self.image
            .decl
            .field(name)
            .map(|f| Ty::resolve(&f.ty, &self.image.namespace))
    }

    pub fn static_value(&self, name: &str) -> Option<Value> {
        lock(&self.statics).get(name).cloned()
    }

    pub fn set_static(&self, name: &str, value: Value) -> bool {
        let ty = match self.field_ty(name) {
            Some(ty) => ty,
            None => return false,
        };
        match lock(&self.statics).get_mut(name) {
            Some(slot) => {
                *slot = value.coerce(&ty);
                true
            }
            None => false,
        }
    }

    /// Claim static initialization.
    /// A class already being initialized counts as initialized, as on the JVM.
    pub(crate) fn begin_init(&self) -> InitClaim {
        let mut state = lock(&self.init);
        match *state {
            InitState::Pending => {
                *state = InitState::Running;
                InitClaim::Run
            }
            InitState::Running | InitState::Done => InitClaim::Ready,
            InitState::Failed => InitClaim::Erroneous,
        }
    }

    pub(crate) fn finish_init(&self, succeeded: bool) {
        *lock(&self.init) = if succeeded {
            InitState::Done
        } else {
            InitState::Failed
        };
    }
}

impl std::fmt::Debug for RuntimeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeClass")
            .field("name", &self.image.qualified_name)
            .finish()
    }
}
