use super::{no_such_field, verify_error, ClassRef, Interpreter};
use crate::compiler::ast::{BinaryOp, Expr, ExprKind, TypeExpr, UnaryOp};
use crate::runtime::builtins;
use crate::runtime::class::RuntimeClass;
use crate::runtime::error::{ExecResult, Raised};
use crate::runtime::types::{library_simple_name, Ty};
use crate::runtime::value::{ArrayRef, JArray, ObjectRef, Value};
use std::sync::Arc;

/// Something that can be assigned to
enum Place {
    Local(String),
    Field(ObjectRef, String),
    Static(Arc<RuntimeClass>, String),
    Element(ArrayRef, usize),
}

/// Binary numeric promotion result
#[derive(Clone, Copy)]
enum Numeric {
    Int,
    Long,
    Double,
}

fn promote(a: &Value, b: &Value) -> Option<Numeric> {
    let rank = |v: &Value| match v {
        Value::Char(_) | Value::Int(_) => Some(0),
        Value::Long(_) => Some(1),
        Value::Double(_) => Some(2),
        _ => None,
    };
    Some(match rank(a)?.max(rank(b)?) {
        0 => Numeric::Int,
        1 => Numeric::Long,
        _ => Numeric::Double,
    })
}

fn divide_by_zero() -> Raised {
    Raised::exception("ArithmeticException", Some("/ by zero".to_string()))
}

fn index_out_of_bounds(index: i64, len: usize) -> Raised {
    Raised::exception(
        "ArrayIndexOutOfBoundsException",
        Some(format!("Index {index} out of bounds for length {len}")),
    )
}

impl Interpreter<'_> {
    pub(super) fn eval(&mut self, expr: &Expr) -> ExecResult<Value> {
        match &expr.kind {
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Long(l) => Ok(Value::Long(*l)),
            ExprKind::Double(d) => Ok(Value::Double(*d)),
            ExprKind::Char(c) => Ok(Value::Char(*c)),
            ExprKind::Str(s) => Ok(Value::string(s)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::This => self
                .frame()?
                .this
                .clone()
                .map(Value::Object)
                .ok_or_else(|| verify_error("'this' in a static context")),
            ExprKind::Name(name) => self.load_name(name),
            ExprKind::Field { target, name } => self.eval_field(target, name),
            ExprKind::Index { .. } => {
                let place = self.place(expr)?;
                self.load(&place)
            }
            ExprKind::Call { target, name, args } => self.eval_call(target.as_deref(), name, args),
            ExprKind::New { class, args } => self.eval_new(class, args),
            ExprKind::NewArray { ty, dims } => {
                let mut sizes = Vec::with_capacity(dims.len());
                for dim in dims {
                    let size = self
                        .eval(dim)?
                        .as_i64()
                        .ok_or_else(|| verify_error("array size is not an integer"))?;
                    if size < 0 {
                        return Err(Raised::exception(
                            "NegativeArraySizeException",
                            Some(size.to_string()),
                        ));
                    }
                    sizes.push(size as usize);
                }
                let ty = self.resolve_ty(ty);
                Ok(make_array(&ty, &sizes))
            }
            ExprKind::ArrayLit { ty, items } => {
                let elem = match self.resolve_ty(ty) {
                    Ty::Array(elem) => *elem,
                    other => return Err(verify_error(format!("array initializer for {other}"))),
                };
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?.coerce(&elem));
                }
                Ok(Value::Array(JArray::new(elem, values)))
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value)
            }
            ExprKind::IncDec {
                target,
                increment,
                prefix,
            } => {
                let place = self.place(target)?;
                let old = self.load(&place)?;
                let delta = if *increment { 1 } else { -1 };
                let new = match &old {
                    Value::Int(i) => Value::Int(i.wrapping_add(delta)),
                    Value::Long(l) => Value::Long(l.wrapping_add(delta as i64)),
                    Value::Double(d) => Value::Double(d + delta as f64),
                    Value::Char(c) => {
                        let code = (*c as i32 + delta) as u32 & 0xFFFF;
                        Value::Char(char::from_u32(code).unwrap_or('\u{FFFD}'))
                    }
                    other => {
                        return Err(verify_error(format!(
                            "bad operand type {} for unary operator '++'",
                            other.ty()
                        )))
                    }
                };
                self.store(&place, new.clone())?;
                Ok(if *prefix { new } else { old })
            }
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    if !self.eval_condition(left)? {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.eval_condition(right)?))
                }
                BinaryOp::Or => {
                    if self.eval_condition(left)? {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.eval_condition(right)?))
                }
                _ => {
                    let l = self.eval(left)?;
                    let r = self.eval(right)?;
                    self.binary(*op, l, r)
                }
            },
            ExprKind::Assign { target, op, value } => {
                let place = self.place(target)?;
                let new = match op {
                    None => {
                        let ty = self.place_ty(&place);
                        self.eval(value)?.coerce(&ty)
                    }
                    Some(op) => {
                        let current = self.load(&place)?;
                        let rhs = self.eval(value)?;
                        let result = self.binary(*op, current.clone(), rhs)?;
                        // compound assignment narrows back to the target type
                        let ty = current.ty();
                        if ty.is_primitive() {
                            result.cast(&ty).unwrap_or(result)
                        } else {
                            result
                        }
                    }
                };
                self.store(&place, new.clone())?;
                Ok(new)
            }
            ExprKind::Cast { ty, operand } => {
                let value = self.eval(operand)?;
                let ty = self.resolve_ty(ty);
                value.cast(&ty).ok_or_else(|| {
                    Raised::exception(
                        "ClassCastException",
                        Some(format!("{} cannot be cast to {ty}", value.ty())),
                    )
                })
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_condition(cond)? {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    /// Apply a non-short-circuit binary operator
    pub(crate) fn binary(&mut self, op: BinaryOp, l: Value, r: Value) -> ExecResult<Value> {
        match op {
            BinaryOp::Add if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
                let mut text = self.stringify(&l)?;
                text.push_str(&self.stringify(&r)?);
                Ok(Value::from(text))
            }
            BinaryOp::Eq => Ok(Value::Bool(l.same(&r))),
            BinaryOp::Ne => Ok(Value::Bool(!l.same(&r))),
            BinaryOp::And | BinaryOp::Or => match (l.as_bool(), r.as_bool()) {
                (Some(a), Some(b)) => Ok(Value::Bool(if op == BinaryOp::And { a && b } else { a || b })),
                _ => Err(bad_operands(op, &l, &r)),
            },
            _ => {
                let kind = promote(&l, &r).ok_or_else(|| bad_operands(op, &l, &r))?;
                match kind {
                    Numeric::Int => {
                        let (a, b) = (l.as_i64().unwrap_or(0) as i32, r.as_i64().unwrap_or(0) as i32);
                        Ok(match op {
                            BinaryOp::Add => Value::Int(a.wrapping_add(b)),
                            BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
                            BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
                            BinaryOp::Div if b == 0 => return Err(divide_by_zero()),
                            BinaryOp::Div => Value::Int(a.wrapping_div(b)),
                            BinaryOp::Rem if b == 0 => return Err(divide_by_zero()),
                            BinaryOp::Rem => Value::Int(a.wrapping_rem(b)),
                            _ => Value::Bool(compare(op, a, b)),
                        })
                    }
                    Numeric::Long => {
                        let (a, b) = (l.as_i64().unwrap_or(0), r.as_i64().unwrap_or(0));
                        Ok(match op {
                            BinaryOp::Add => Value::Long(a.wrapping_add(b)),
                            BinaryOp::Sub => Value::Long(a.wrapping_sub(b)),
                            BinaryOp::Mul => Value::Long(a.wrapping_mul(b)),
                            BinaryOp::Div if b == 0 => return Err(divide_by_zero()),
                            BinaryOp::Div => Value::Long(a.wrapping_div(b)),
                            BinaryOp::Rem if b == 0 => return Err(divide_by_zero()),
                            BinaryOp::Rem => Value::Long(a.wrapping_rem(b)),
                            _ => Value::Bool(compare(op, a, b)),
                        })
                    }
                    Numeric::Double => {
                        let (a, b) = (l.as_f64().unwrap_or(0.0), r.as_f64().unwrap_or(0.0));
                        Ok(match op {
                            BinaryOp::Add => Value::Double(a + b),
                            BinaryOp::Sub => Value::Double(a - b),
                            BinaryOp::Mul => Value::Double(a * b),
                            BinaryOp::Div => Value::Double(a / b),
                            BinaryOp::Rem => Value::Double(a % b),
                            _ => Value::Bool(compare(op, a, b)),
                        })
                    }
                }
            }
        }
    }

    fn load_name(&mut self, name: &str) -> ExecResult<Value> {
        if let Some(local) = self.local(name) {
            return Ok(local.value.clone());
        }
        let place = self.field_place(name)?;
        self.load(&place)
    }

    /// A bare name that is not a local: a field of the running class
    fn field_place(&mut self, name: &str) -> ExecResult<Place> {
        let (class, this) = {
            let frame = self.frame()?;
            (Arc::clone(&frame.class), frame.this.clone())
        };
        let field = class
            .decl()
            .field(name)
            .ok_or_else(|| no_such_field(class.simple_name(), name))?;
        if field.modifiers.is_static {
            self.ensure_initialized(&class)?;
            return Ok(Place::Static(class, name.to_string()));
        }
        match this {
            Some(object) => Ok(Place::Field(object, name.to_string())),
            None => Err(verify_error(format!(
                "non-static variable {name} cannot be referenced from a static context"
            ))),
        }
    }

    fn class_ref(&self, target: &Expr) -> Option<ClassRef> {
        match &target.kind {
            ExprKind::Name(name) => self.class_ref_for_name(name),
            _ => None,
        }
    }

    fn eval_field(&mut self, target: &Expr, name: &str) -> ExecResult<Value> {
        if let Some(ClassRef::Library(class)) = self.class_ref(target) {
            return builtins::static_field(&class, name).ok_or_else(|| no_such_field(&class, name));
        }
        if let Some(ClassRef::Unit(class)) = self.class_ref(target) {
            self.ensure_initialized(&class)?;
            return class
                .static_value(name)
                .ok_or_else(|| no_such_field(class.simple_name(), name));
        }
        match self.eval(target)? {
            Value::Array(array) if name == "length" => Ok(Value::Int(array.len() as i32)),
            Value::Object(object) => match object.get_field(name) {
                Some(value) => Ok(value),
                None => {
                    let class = Arc::clone(&object.class);
                    self.ensure_initialized(&class)?;
                    class
                        .static_value(name)
                        .ok_or_else(|| no_such_field(class.simple_name(), name))
                }
            },
            Value::Null => Err(Raised::null_pointer(format!(
                "Cannot read field \"{name}\" because value is null"
            ))),
            other => Err(no_such_field(&other.ty().to_string(), name)),
        }
    }

    fn place(&mut self, expr: &Expr) -> ExecResult<Place> {
        match &expr.kind {
            ExprKind::Name(name) => {
                if self.local(name).is_some() {
                    Ok(Place::Local(name.clone()))
                } else {
                    self.field_place(name)
                }
            }
            ExprKind::Field { target, name } => {
                match self.class_ref(target) {
                    Some(ClassRef::Unit(class)) => {
                        self.ensure_initialized(&class)?;
                        if class.static_value(name).is_none() {
                            return Err(no_such_field(class.simple_name(), name));
                        }
                        return Ok(Place::Static(class, name.clone()));
                    }
                    Some(ClassRef::Library(class)) => {
                        return Err(verify_error(format!(
                            "cannot assign a value to final variable {class}.{name}"
                        )))
                    }
                    None => {}
                }
                match self.eval(target)? {
                    Value::Object(object) => {
                        if object.get_field(name).is_some() {
                            Ok(Place::Field(object, name.clone()))
                        } else if object.class.static_value(name).is_some() {
                            Ok(Place::Static(Arc::clone(&object.class), name.clone()))
                        } else {
                            Err(no_such_field(object.class.simple_name(), name))
                        }
                    }
                    Value::Null => Err(Raised::null_pointer(format!(
                        "Cannot assign field \"{name}\" because value is null"
                    ))),
                    other => Err(verify_error(format!(
                        "cannot assign field {name} of {}",
                        other.ty()
                    ))),
                }
            }
            ExprKind::Index { target, index } => {
                let array = match self.eval(target)? {
                    Value::Array(array) => array,
                    Value::Null => {
                        return Err(Raised::null_pointer(
                            "Cannot load from array because value is null",
                        ))
                    }
                    other => return Err(verify_error(format!("{} is not an array", other.ty()))),
                };
                let index = self
                    .eval(index)?
                    .as_i64()
                    .ok_or_else(|| verify_error("array index is not an integer"))?;
                if index < 0 || index as usize >= array.len() {
                    return Err(index_out_of_bounds(index, array.len()));
                }
                Ok(Place::Element(array, index as usize))
            }
            _ => Err(verify_error("unexpected assignment target")),
        }
    }

    fn load(&mut self, place: &Place) -> ExecResult<Value> {
        match place {
            Place::Local(name) => self
                .local(name)
                .map(|local| local.value.clone())
                .ok_or_else(|| verify_error(format!("unknown local {name}"))),
            Place::Field(object, name) => object
                .get_field(name)
                .ok_or_else(|| no_such_field(object.class.simple_name(), name)),
            Place::Static(class, name) => class
                .static_value(name)
                .ok_or_else(|| no_such_field(class.simple_name(), name)),
            Place::Element(array, index) => array
                .get(*index)
                .ok_or_else(|| index_out_of_bounds(*index as i64, array.len())),
        }
    }

    fn store(&mut self, place: &Place, value: Value) -> ExecResult<()> {
        match place {
            Place::Local(name) => {
                let local = self
                    .local_mut(name)
                    .ok_or_else(|| verify_error(format!("unknown local {name}")))?;
                local.value = value.coerce(&local.ty);
            }
            Place::Field(object, name) => {
                object.set_field(name, value);
            }
            Place::Static(class, name) => {
                class.set_static(name, value);
            }
            Place::Element(array, index) => {
                let elem = array.elem.clone();
                if !value.is_null() && elem.is_reference() && elem.accepts(&value.ty()).is_none() {
                    return Err(Raised::exception(
                        "ArrayStoreException",
                        Some(value.ty().to_string()),
                    ));
                }
                if !array.set(*index, value) {
                    return Err(index_out_of_bounds(*index as i64, array.len()));
                }
            }
        }
        Ok(())
    }

    fn place_ty(&self, place: &Place) -> Ty {
        match place {
            Place::Local(name) => self.local(name).map(|l| l.ty.clone()).unwrap_or(Ty::Object),
            Place::Field(object, name) => object.class.field_ty(name).unwrap_or(Ty::Object),
            Place::Static(class, name) => class.field_ty(name).unwrap_or(Ty::Object),
            Place::Element(array, _) => array.elem.clone(),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> ExecResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn eval_call(&mut self, target: Option<&Expr>, name: &str, args: &[Expr]) -> ExecResult<Value> {
        let Some(target) = target else {
            let argv = self.eval_args(args)?;
            let (class, this) = {
                let frame = self.frame()?;
                (Arc::clone(&frame.class), frame.this.clone())
            };
            return self.call_by_name(&class, this, name, argv);
        };

        match self.class_ref(target) {
            Some(ClassRef::Unit(class)) => {
                let argv = self.eval_args(args)?;
                return self.call_by_name(&class, None, name, argv);
            }
            Some(ClassRef::Library(class)) => {
                let argv = self.eval_args(args)?;
                return builtins::call_static(self, &class, name, argv);
            }
            None => {}
        }

        let receiver = self.eval(target)?;
        let argv = self.eval_args(args)?;
        match receiver {
            Value::Object(object) => {
                let class = Arc::clone(&object.class);
                match self.select_method(&class, name, &argv, false) {
                    Some(index) => self.invoke_method(&class, index, Some(object), argv),
                    None => builtins::call_object_method(self, &Value::Object(object), name, argv)
                        .unwrap_or_else(|| Err(self.no_such_method(&class, name, &[]))),
                }
            }
            Value::Null => Err(Raised::null_pointer(format!(
                "Cannot invoke \"{name}()\" because value is null"
            ))),
            other => builtins::call_method(self, &other, name, argv),
        }
    }

    fn eval_new(&mut self, class: &TypeExpr, args: &[Expr]) -> ExecResult<Value> {
        let argv = self.eval_args(args)?;
        if let Some(unit) = self.find_class(&class.name) {
            return self.instantiate(&unit, argv);
        }
        let name = library_simple_name(&class.name).to_string();
        builtins::construct(self, &name, argv)
            .unwrap_or_else(|| Err(verify_error(format!("cannot find symbol: class {name}"))))
    }
}

fn make_array(ty: &Ty, sizes: &[usize]) -> Value {
    let elem = match ty {
        Ty::Array(elem) => (**elem).clone(),
        other => other.clone(),
    };
    match sizes {
        [] => Value::Null,
        [len] => Value::Array(JArray::filled(elem, *len)),
        [len, rest @ ..] => {
            let items = (0..*len).map(|_| make_array(&elem, rest)).collect();
            Value::Array(JArray::new(elem, items))
        }
    }
}

fn unary(op: UnaryOp, value: Value) -> ExecResult<Value> {
    match (op, &value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (UnaryOp::Neg, Value::Char(c)) => Ok(Value::Int(-(*c as i32))),
        (UnaryOp::Neg, Value::Long(l)) => Ok(Value::Long(l.wrapping_neg())),
        (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
        (UnaryOp::Plus, Value::Char(c)) => Ok(Value::Int(*c as i32)),
        (UnaryOp::Plus, Value::Int(_) | Value::Long(_) | Value::Double(_)) => Ok(value),
        _ => Err(verify_error(format!("bad operand type {} for unary operator", value.ty()))),
    }
}

fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => false,
    }
}

fn bad_operands(op: BinaryOp, l: &Value, r: &Value) -> Raised {
    verify_error(format!(
        "bad operand types for binary operator '{}': {} and {}",
        op.symbol(),
        l.ty(),
        r.ty()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion() {
        assert!(matches!(promote(&Value::Char('a'), &Value::Int(1)), Some(Numeric::Int)));
        assert!(matches!(promote(&Value::Int(1), &Value::Long(1)), Some(Numeric::Long)));
        assert!(matches!(promote(&Value::Long(1), &Value::Double(1.0)), Some(Numeric::Double)));
        assert!(promote(&Value::Bool(true), &Value::Int(1)).is_none());
    }

    #[test]
    fn test_nested_array_shape() {
        let ty = Ty::array_of(Ty::array_of(Ty::Int));
        let Value::Array(outer) = make_array(&ty, &[2, 3]) else {
            panic!("expected array");
        };
        assert_eq!(outer.len(), 2);
        let Some(Value::Array(inner)) = outer.get(1) else {
            panic!("expected inner array");
        };
        assert_eq!(inner.len(), 3);
        assert_eq!(inner.get(0), Some(Value::Int(0)));
    }

    #[test]
    fn test_partial_dims_leave_null_rows() {
        let ty = Ty::array_of(Ty::array_of(Ty::Int));
        let Value::Array(outer) = make_array(&ty, &[2]) else {
            panic!("expected array");
        };
        assert_eq!(outer.get(0), Some(Value::Null));
    }

    #[test]
    fn test_unary_neg_wraps() {
        assert_eq!(unary(UnaryOp::Neg, Value::Int(i32::MIN)).unwrap(), Value::Int(i32::MIN));
        assert_eq!(unary(UnaryOp::Not, Value::Bool(true)).unwrap(), Value::Bool(false));
    }
}
