//! Tree-walking interpreter
//!
//! One `Interpreter` runs one invocation on the calling thread. It consults
//! the [`ExecEnv`] for classes, console streams, process exit and
//! cancellation; the cancellation flag is checked on every call and loop
//! iteration.

mod expr;
mod stmt;

use super::builtins;
use super::class::{InitClaim, RuntimeClass};
use super::env::{Console, ExecEnv};
use super::error::{ExecResult, Raised, Throwable, TraceFrame};
use super::types::{select_overload, Ty};
use super::value::{JArray, NativeObject, ObjectRef, Value};
use super::lock;
use crate::compiler::ast::{ClassDecl, MethodDecl};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

pub(crate) use stmt::Flow;

/// Frames kept in a fault trace
const MAX_TRACE_FRAMES: usize = 64;

struct Local {
    ty: Ty,
    value: Value,
}

struct Frame {
    class: Arc<RuntimeClass>,
    this: Option<ObjectRef>,
    method: String,
    scopes: Vec<HashMap<String, Local>>,
    line: usize,
}

/// A class named in an expression position (`Math.max`, `Calc.count`)
enum ClassRef {
    Unit(Arc<RuntimeClass>),
    Library(String),
}

pub struct Interpreter<'e> {
    env: &'e ExecEnv,
    frames: Vec<Frame>,
}

impl<'e> Interpreter<'e> {
    pub fn new(env: &'e ExecEnv) -> Self {
        Self {
            env,
            frames: Vec::new(),
        }
    }

    pub fn env(&self) -> &ExecEnv {
        self.env
    }

    pub fn console(&self) -> &dyn Console {
        self.env.console.as_ref()
    }

    // ===== entry points =====

    /// Construct an instance, choosing the constructor by argument types
    pub fn instantiate(&mut self, class: &Arc<RuntimeClass>, args: Vec<Value>) -> ExecResult<Value> {
        let decl = Arc::clone(class.decl());
        if decl.constructors.is_empty() {
            if !args.is_empty() {
                return Err(self.no_such_method(class, "<init>", &args));
            }
            return self.construct_with(class, None, args);
        }
        let index = self
            .select_constructor(class, &args)
            .ok_or_else(|| self.no_such_method(class, "<init>", &args))?;
        self.construct_with(class, Some(index), args)
    }

    /// Construct an instance with a specific constructor (`None` = implicit default)
    pub fn construct_with(
        &mut self,
        class: &Arc<RuntimeClass>,
        constructor: Option<usize>,
        args: Vec<Value>,
    ) -> ExecResult<Value> {
        self.ensure_initialized(class)?;
        let object = super::value::Instance::new(Arc::clone(class));
        let decl = Arc::clone(class.decl());

        self.push_frame(class, Some(Arc::clone(&object)), "<init>", decl.pos.line)?;
        let mut result = Ok(());
        for field in decl.fields.iter().filter(|f| !f.modifiers.is_static) {
            if let Some(init) = &field.init {
                self.set_line(field.pos.line);
                match self.eval(init) {
                    Ok(value) => {
                        object.set_field(&field.name, value);
                    }
                    Err(raised) => {
                        result = Err(self.attach_trace(raised));
                        break;
                    }
                }
            }
        }
        self.frames.pop();
        result?;

        if let Some(index) = constructor {
            let ctor = decl
                .constructors
                .get(index)
                .ok_or_else(|| self.no_such_method(class, "<init>", &args))?;
            self.invoke_decl(class, ctor, Some(Arc::clone(&object)), args)?;
        }
        Ok(Value::Object(object))
    }

    /// Call the `index`-th declared method
    pub fn invoke_method(
        &mut self,
        class: &Arc<RuntimeClass>,
        index: usize,
        receiver: Option<ObjectRef>,
        args: Vec<Value>,
    ) -> ExecResult<Value> {
        let decl = Arc::clone(class.decl());
        let method = decl
            .methods
            .get(index)
            .ok_or_else(|| self.no_such_method(class, "?", &args))?;
        let receiver = if method.modifiers.is_static {
            None
        } else {
            Some(receiver.ok_or_else(|| {
                Raised::null_pointer(format!(
                    "Cannot invoke \"{}.{}()\" without an instance",
                    class.simple_name(),
                    method.name
                ))
            })?)
        };
        self.invoke_decl(class, method, receiver, args)
    }

    /// Call a method by name, choosing the overload by argument types
    pub fn call_by_name(
        &mut self,
        class: &Arc<RuntimeClass>,
        receiver: Option<ObjectRef>,
        name: &str,
        args: Vec<Value>,
    ) -> ExecResult<Value> {
        let index = self
            .select_method(class, name, &args, receiver.is_none())
            .ok_or_else(|| self.no_such_method(class, name, &args))?;
        self.invoke_method(class, index, receiver, args)
    }

    /// Run `static void main(String[] args)`
    pub fn run_main(&mut self, class: &Arc<RuntimeClass>, args: Vec<String>) -> ExecResult<Value> {
        let argv = JArray::new(Ty::String, args.into_iter().map(Value::from).collect());
        self.call_by_name(class, None, "main", vec![Value::Array(argv)])
    }

    /// Read a field of an instance, or a static field when `receiver` is `None`
    pub fn read_field(
        &mut self,
        class: &Arc<RuntimeClass>,
        receiver: Option<&ObjectRef>,
        name: &str,
    ) -> ExecResult<Value> {
        let is_static = class
            .decl()
            .field(name)
            .map(|f| f.modifiers.is_static)
            .ok_or_else(|| no_such_field(class.simple_name(), name))?;
        if is_static {
            self.ensure_initialized(class)?;
            return class
                .static_value(name)
                .ok_or_else(|| no_such_field(class.simple_name(), name));
        }
        receiver
            .and_then(|object| object.get_field(name))
            .ok_or_else(|| Raised::null_pointer(format!("Cannot read field \"{name}\" without an instance")))
    }

    /// Write a field of an instance, or a static field when `receiver` is `None`
    pub fn write_field(
        &mut self,
        class: &Arc<RuntimeClass>,
        receiver: Option<&ObjectRef>,
        name: &str,
        value: Value,
    ) -> ExecResult<()> {
        let is_static = class
            .decl()
            .field(name)
            .map(|f| f.modifiers.is_static)
            .ok_or_else(|| no_such_field(class.simple_name(), name))?;
        if is_static {
            self.ensure_initialized(class)?;
            class.set_static(name, value);
            return Ok(());
        }
        match receiver {
            Some(object) => {
                object.set_field(name, value);
                Ok(())
            }
            None => Err(Raised::null_pointer(format!(
                "Cannot assign field \"{name}\" without an instance"
            ))),
        }
    }

    /// `String.valueOf(v)`, calling a user-defined `toString()` when present
    pub fn stringify(&mut self, value: &Value) -> ExecResult<String> {
        match value {
            Value::Object(object) => {
                let class = Arc::clone(&object.class);
                match self.select_method(&class, "toString", &[], false) {
                    Some(index) => {
                        let result = self.invoke_method(&class, index, Some(Arc::clone(object)), Vec::new())?;
                        Ok(result.display())
                    }
                    None => Ok(value.display()),
                }
            }
            Value::Native(native) => match native.as_ref() {
                NativeObject::List(items) => {
                    let items = lock(items).clone();
                    let mut parts = Vec::with_capacity(items.len());
                    for item in &items {
                        parts.push(self.stringify(item)?);
                    }
                    Ok(format!("[{}]", parts.join(", ")))
                }
                _ => Ok(value.display()),
            },
            _ => Ok(value.display()),
        }
    }

    /// `a.equals(b)`, calling a user-defined `equals(Object)` when present
    pub fn values_equal(&mut self, a: &Value, b: &Value) -> ExecResult<bool> {
        if let Value::Object(object) = a {
            let class = Arc::clone(&object.class);
            if let Some(index) = self.select_method(&class, "equals", &[Value::Null], false) {
                let result = self.invoke_method(&class, index, Some(Arc::clone(object)), vec![b.clone()])?;
                return Ok(result.as_bool().unwrap_or(false));
            }
        }
        Ok(a.same(b))
    }

    // ===== invocation machinery =====

    fn invoke_decl(
        &mut self,
        class: &Arc<RuntimeClass>,
        method: &MethodDecl,
        receiver: Option<ObjectRef>,
        args: Vec<Value>,
    ) -> ExecResult<Value> {
        self.ensure_initialized(class)?;
        let namespace = class.namespace().to_string();
        let mut scope = HashMap::new();
        for (param, arg) in method.params.iter().zip(args) {
            let ty = Ty::resolve(&param.ty, &namespace);
            let value = arg.coerce(&ty);
            scope.insert(param.name.clone(), Local { ty, value });
        }

        self.push_frame(class, receiver, &method.name, method.pos.line)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.push(scope);
        }
        trace!(target: "autograde::runtime", class = class.simple_name(), method = %method.name, depth = self.frames.len(), "call");

        let result = match &method.body {
            Some(body) => self.exec_stmts(body),
            None => Err(Raised::exception(
                "AbstractMethodError",
                Some(format!("{}.{}", class.simple_name(), method.name)),
            )),
        };
        let result = result.map_err(|raised| self.attach_trace(raised));
        self.frames.pop();

        match result? {
            Flow::Return(value) => {
                let returns = Ty::resolve(&method.returns, &namespace);
                Ok(value.coerce(&returns))
            }
            _ => Ok(Value::Void),
        }
    }

    fn push_frame(
        &mut self,
        class: &Arc<RuntimeClass>,
        this: Option<ObjectRef>,
        method: &str,
        line: usize,
    ) -> ExecResult<()> {
        self.check_cancel()?;
        if self.frames.len() >= self.env.limits.max_call_depth {
            let raised = Raised::exception("StackOverflowError", None::<String>);
            return Err(self.attach_trace(raised));
        }
        self.frames.push(Frame {
            class: Arc::clone(class),
            this,
            method: method.to_string(),
            scopes: vec![HashMap::new()],
            line,
        });
        Ok(())
    }

    /// Run static field initializers once per loader. A class whose
    /// initialization failed stays unusable, as on the JVM.
    fn ensure_initialized(&mut self, class: &Arc<RuntimeClass>) -> ExecResult<()> {
        match class.begin_init() {
            InitClaim::Run => {}
            InitClaim::Ready => return Ok(()),
            InitClaim::Erroneous => {
                let raised = Raised::exception(
                    "NoClassDefFoundError",
                    Some(format!("Could not initialize class {}", class.name())),
                );
                return Err(self.attach_trace(raised));
            }
        }
        let decl = Arc::clone(class.decl());
        let result = if decl.fields.iter().any(|f| f.modifiers.is_static && f.init.is_some()) {
            self.run_static_initializers(class, &decl)
        } else {
            Ok(())
        };
        class.finish_init(result.is_ok());
        result
    }

    fn run_static_initializers(&mut self, class: &Arc<RuntimeClass>, decl: &ClassDecl) -> ExecResult<()> {
        self.push_frame(class, None, "<clinit>", decl.pos.line)?;
        let mut result = Ok(());
        for field in decl.fields.iter().filter(|f| f.modifiers.is_static) {
            if let Some(init) = &field.init {
                self.set_line(field.pos.line);
                match self.eval(init) {
                    Ok(value) => {
                        class.set_static(&field.name, value);
                    }
                    Err(raised) => {
                        result = Err(self.attach_trace(raised));
                        break;
                    }
                }
            }
        }
        self.frames.pop();
        result
    }

    pub(crate) fn check_cancel(&self) -> ExecResult<()> {
        if self.env.cancel.is_cancelled() {
            Err(Raised::Cancelled)
        } else {
            Ok(())
        }
    }

    fn select_constructor(&self, class: &RuntimeClass, args: &[Value]) -> Option<usize> {
        let namespace = class.namespace();
        let candidates: Vec<Vec<Ty>> = class
            .decl()
            .constructors
            .iter()
            .map(|c| c.params.iter().map(|p| Ty::resolve(&p.ty, namespace)).collect())
            .collect();
        let arg_tys: Vec<Ty> = args.iter().map(Value::ty).collect();
        select_overload(candidates.iter().map(Vec::as_slice), &arg_tys)
    }

    fn select_method(
        &self,
        class: &RuntimeClass,
        name: &str,
        args: &[Value],
        static_only: bool,
    ) -> Option<usize> {
        let namespace = class.namespace();
        let candidates: Vec<(usize, Vec<Ty>)> = class
            .decl()
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == name && (!static_only || m.modifiers.is_static))
            .map(|(i, m)| (i, m.params.iter().map(|p| Ty::resolve(&p.ty, namespace)).collect()))
            .collect();
        let arg_tys: Vec<Ty> = args.iter().map(Value::ty).collect();
        select_overload(candidates.iter().map(|(_, p)| p.as_slice()), &arg_tys)
            .map(|k| candidates[k].0)
    }

    fn no_such_method(&self, class: &RuntimeClass, name: &str, args: &[Value]) -> Raised {
        let types: Vec<String> = args.iter().map(|a| a.ty().to_string()).collect();
        Raised::exception(
            "NoSuchMethodError",
            Some(format!("{}.{name}({})", class.simple_name(), types.join(", "))),
        )
    }

    /// Look a class up relative to the running class's namespace
    fn find_class(&self, name: &str) -> Option<Arc<RuntimeClass>> {
        if let Some(frame) = self.frames.last() {
            let namespace = frame.class.namespace();
            if !namespace.is_empty() && !name.contains('.') {
                if let Some(class) = self.env.classes.find_class(&format!("{namespace}.{name}")) {
                    return Some(class);
                }
            }
        }
        self.env.classes.find_class(name)
    }

    // ===== frames and scopes =====

    fn frame(&self) -> ExecResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| Raised::exception("VerifyError", Some("no active frame".to_string())))
    }

    fn frame_mut(&mut self) -> ExecResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| Raised::exception("VerifyError", Some("no active frame".to_string())))
    }

    fn set_line(&mut self, line: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line = line;
        }
    }

    fn push_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.push(HashMap::new());
        }
    }

    fn pop_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.scopes.pop();
        }
    }

    fn declare(&mut self, name: &str, ty: Ty, value: Value) -> ExecResult<()> {
        let value = value.coerce(&ty);
        let frame = self.frame_mut()?;
        if let Some(scope) = frame.scopes.last_mut() {
            scope.insert(name.to_string(), Local { ty, value });
        }
        Ok(())
    }

    fn local(&self, name: &str) -> Option<&Local> {
        self.frames
            .last()?
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
    }

    fn local_mut(&mut self, name: &str) -> Option<&mut Local> {
        self.frames
            .last_mut()?
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// Current stack, innermost first
    fn trace(&self) -> Vec<TraceFrame> {
        self.frames
            .iter()
            .rev()
            .take(MAX_TRACE_FRAMES)
            .map(|frame| TraceFrame {
                class: frame.class.simple_name().to_string(),
                method: frame.method.clone(),
                line: frame.class.image().line_numbers.then_some(frame.line),
            })
            .collect()
    }

    /// Give a fault created by the runtime the trace of where it surfaced
    fn attach_trace(&self, raised: Raised) -> Raised {
        match raised {
            Raised::Exception(t) if t.trace.is_empty() => {
                let with_trace = (*t).clone().with_trace(self.trace());
                Raised::Exception(Arc::new(with_trace))
            }
            other => other,
        }
    }

    /// A fresh throwable carrying the current trace
    pub(crate) fn new_throwable(&self, class: &str, message: Option<String>, cause: Option<Arc<Throwable>>) -> Value {
        let mut throwable = Throwable::new(class, message).with_trace(self.trace());
        throwable.cause = cause;
        Value::Throwable(Arc::new(throwable))
    }

    fn class_ref_for_name(&self, name: &str) -> Option<ClassRef> {
        if self.local(name).is_some() {
            return None;
        }
        if let Some(frame) = self.frames.last() {
            if frame.class.decl().field(name).is_some() {
                return None;
            }
        }
        if let Some(class) = self.find_class(name) {
            return Some(ClassRef::Unit(class));
        }
        builtins::library_class(name).map(|n| ClassRef::Library(n.to_string()))
    }
}

fn no_such_field(class: &str, name: &str) -> Raised {
    Raised::exception("NoSuchFieldError", Some(format!("{class}.{name}")))
}

/// Runtime type confusion the checker does not catch
pub(crate) fn verify_error(message: impl Into<String>) -> Raised {
    Raised::exception("VerifyError", Some(message.into()))
}
