//! Member tables for runtime-type-driven invocation
//!
//! A [`TypeInfo`] lists the constructors, methods and fields of one type,
//! each member carrying its signature and an invoker closure. Tables are
//! built from a loaded [`RuntimeClass`] or from the ambient library table.
//! Overload choice goes through [`select_overload`], the same function the
//! interpreter uses for calls inside submitted code.

use crate::compiler::ast::Visibility;
use crate::runtime::builtins::{self, library_methods};
use crate::runtime::types::{library_simple_name, same_class, select_overload};
use crate::runtime::{ExecResult, Interpreter, Raised, RuntimeClass, Throwable, Ty, Value};
use std::fmt;
use std::sync::Arc;

type Invoker = Arc<dyn Fn(&mut Interpreter<'_>, Option<Value>, Vec<Value>) -> ExecResult<Value> + Send + Sync>;

fn invoker<F>(f: F) -> Invoker
where
    F: Fn(&mut Interpreter<'_>, Option<Value>, Vec<Value>) -> ExecResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Constructor,
    Method,
}

/// A constructor or method with its invoker
#[derive(Clone)]
pub struct Member {
    /// Simple name of the declaring type
    pub owner: String,
    pub name: String,
    pub kind: MemberKind,
    pub is_static: bool,
    pub params: Vec<Ty>,
    pub returns: Ty,
    pub visibility: Visibility,
    invoker: Invoker,
}

impl Member {
    /// `Calc#add(int, int)`, `Calc.max(int, int)` or `Calc#<init>(int)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(Ty::name).collect();
        let separator = if self.is_static { '.' } else { '#' };
        let name = match self.kind {
            MemberKind::Constructor => "<init>",
            MemberKind::Method => &self.name,
        };
        format!("{}{separator}{name}({})", self.owner, params.join(", "))
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Call the member the way reflection does: exceptions raised inside
    /// come back wrapped in one `InvocationTargetException` layer
    pub fn invoke(
        &self,
        interp: &mut Interpreter<'_>,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> ExecResult<Value> {
        let args = args
            .into_iter()
            .zip(&self.params)
            .map(|(arg, ty)| arg.coerce(ty))
            .collect();
        (self.invoker)(interp, receiver, args).map_err(|raised| match raised {
            Raised::Exception(cause) => Raised::Exception(Throwable::wrap_invocation(cause)),
            other => other,
        })
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.visibility, self.returns, self.signature())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Ty,
    pub is_static: bool,
    pub visibility: Visibility,
}

/// Where a type came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Compiled from a submitted unit
    Defined,
    /// Part of the ambient library
    Ambient,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Qualified name (`autograde.run3.Calc`, `java.lang.Math`)
    pub name: String,
    pub simple_name: String,
    pub origin: TypeOrigin,
    pub constructors: Vec<Member>,
    pub methods: Vec<Member>,
    pub fields: Vec<FieldInfo>,
    class: Option<Arc<RuntimeClass>>,
}

impl TypeInfo {
    /// Member table of a loaded unit class
    pub fn introspect(class: &Arc<RuntimeClass>) -> TypeInfo {
        let decl = class.decl();
        let namespace = class.namespace();
        let owner = class.simple_name().to_string();
        let resolve_params = |params: &[crate::compiler::ast::Param]| -> Vec<Ty> {
            params.iter().map(|p| Ty::resolve(&p.ty, namespace)).collect()
        };

        let mut constructors = Vec::new();
        if decl.constructors.is_empty() {
            let target = Arc::clone(class);
            constructors.push(Member {
                owner: owner.clone(),
                name: owner.clone(),
                kind: MemberKind::Constructor,
                is_static: false,
                params: Vec::new(),
                returns: Ty::Class(class.name().to_string()),
                visibility: Visibility::Public,
                invoker: invoker(move |interp, _, args| interp.construct_with(&target, None, args)),
            });
        }
        for (index, ctor) in decl.constructors.iter().enumerate() {
            let target = Arc::clone(class);
            constructors.push(Member {
                owner: owner.clone(),
                name: owner.clone(),
                kind: MemberKind::Constructor,
                is_static: false,
                params: resolve_params(&ctor.params),
                returns: Ty::Class(class.name().to_string()),
                visibility: ctor.modifiers.visibility,
                invoker: invoker(move |interp, _, args| interp.construct_with(&target, Some(index), args)),
            });
        }

        let methods = decl
            .methods
            .iter()
            .enumerate()
            .map(|(index, method)| {
                let target = Arc::clone(class);
                Member {
                    owner: owner.clone(),
                    name: method.name.clone(),
                    kind: MemberKind::Method,
                    is_static: method.modifiers.is_static,
                    params: resolve_params(&method.params),
                    returns: Ty::resolve(&method.returns, namespace),
                    visibility: method.modifiers.visibility,
                    invoker: invoker(move |interp, receiver, args| {
                        let object = match receiver {
                            Some(Value::Object(object)) => Some(object),
                            _ => None,
                        };
                        interp.invoke_method(&target, index, object, args)
                    }),
                }
            })
            .collect();

        let fields = decl
            .fields
            .iter()
            .map(|field| FieldInfo {
                name: field.name.clone(),
                ty: Ty::resolve(&field.ty, namespace),
                is_static: field.modifiers.is_static,
                visibility: field.modifiers.visibility,
            })
            .collect();

        TypeInfo {
            name: class.name().to_string(),
            simple_name: owner,
            origin: TypeOrigin::Defined,
            constructors,
            methods,
            fields,
            class: Some(Arc::clone(class)),
        }
    }

    /// Member table of an ambient library class (`Math`, `java.lang.Integer`)
    pub fn ambient(name: &str) -> Option<TypeInfo> {
        if !builtins::is_ambient_class(name) {
            return None;
        }
        let simple = library_simple_name(name).to_string();
        let methods = library_methods(&simple)
            .into_iter()
            .map(|method| {
                let (class, member) = (method.class, method.name);
                let call = if method.is_static {
                    invoker(move |interp, _, args| builtins::call_static(interp, class, member, args))
                } else {
                    invoker(move |interp, receiver, args| match receiver {
                        Some(receiver) => builtins::call_method(interp, &receiver, member, args),
                        None => Err(Raised::null_pointer(format!(
                            "Cannot invoke \"{class}.{member}()\" without an instance"
                        ))),
                    })
                };
                Member {
                    owner: simple.clone(),
                    name: member.to_string(),
                    kind: MemberKind::Method,
                    is_static: method.is_static,
                    params: method.params.clone(),
                    returns: method.returns.clone(),
                    visibility: Visibility::Public,
                    invoker: call,
                }
            })
            .collect();
        Some(TypeInfo {
            name: format!("java.lang.{simple}"),
            simple_name: simple,
            origin: TypeOrigin::Ambient,
            constructors: Vec::new(),
            methods,
            fields: Vec::new(),
            class: None,
        })
    }

    /// The loaded class behind a defined type
    pub fn class(&self) -> Option<&Arc<RuntimeClass>> {
        self.class.as_ref()
    }

    /// Best method for `name` and the runtime argument types; without a
    /// receiver only static methods are candidates
    pub fn select_method(&self, name: &str, args: &[Ty], has_receiver: bool) -> Option<&Member> {
        let candidates: Vec<&Member> = self
            .methods
            .iter()
            .filter(|m| m.name == name && (has_receiver || m.is_static))
            .collect();
        select_overload(candidates.iter().map(|m| m.params.as_slice()), args).map(|i| candidates[i])
    }

    pub fn select_constructor(&self, args: &[Ty]) -> Option<&Member> {
        select_overload(self.constructors.iter().map(|m| m.params.as_slice()), args)
            .map(|i| &self.constructors[i])
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `value` can be the receiver of this type's instance members
    pub fn is_instance(&self, value: &Value) -> bool {
        match (self.origin, value) {
            (TypeOrigin::Defined, Value::Object(object)) => same_class(object.class.name(), &self.name),
            (TypeOrigin::Ambient, Value::Str(_)) => self.simple_name == "String",
            _ => false,
        }
    }

    /// Type of values of this type, as expected-type checks see it
    pub fn ty(&self) -> Ty {
        match self.origin {
            TypeOrigin::Defined => Ty::Class(self.name.clone()),
            TypeOrigin::Ambient => Ty::library(&self.simple_name).unwrap_or(Ty::Object),
        }
    }
}
