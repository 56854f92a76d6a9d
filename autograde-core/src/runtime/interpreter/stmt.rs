use super::{verify_error, Interpreter};
use crate::compiler::ast::{CatchClause, Expr, Stmt, StmtKind, TypeExpr};
use crate::runtime::error::{ExecResult, Raised};
use crate::runtime::lock;
use crate::runtime::types::{library_simple_name, Ty};
use crate::runtime::value::{NativeObject, Value};

/// How a statement completed
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

impl Interpreter<'_> {
    pub(super) fn exec_block(&mut self, stmts: &[Stmt]) -> ExecResult<Flow> {
        self.push_scope();
        let result = self.exec_stmts(stmts);
        self.pop_scope();
        result
    }

    pub(super) fn exec_stmts(&mut self, stmts: &[Stmt]) -> ExecResult<Flow> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> ExecResult<Flow> {
        self.set_line(stmt.pos.line);
        match &stmt.kind {
            StmtKind::Block(stmts) => self.exec_block(stmts),
            StmtKind::Local { ty, declarators } => {
                for declarator in declarators {
                    let (ty, value) = match ty {
                        Some(texpr) => {
                            let ty = self.resolve_ty(texpr);
                            let value = match &declarator.init {
                                Some(init) => self.eval(init)?,
                                None => Value::default_for(&ty),
                            };
                            (ty, value)
                        }
                        None => {
                            let init = declarator.init.as_ref().ok_or_else(|| {
                                verify_error(format!("'var' without initializer: {}", declarator.name))
                            })?;
                            let value = self.eval(init)?;
                            (value.ty(), value)
                        }
                    };
                    self.declare(&declarator.name, ty, value)?;
                }
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_condition(cond)? {
                    self.exec_nested(then)
                } else if let Some(other) = otherwise {
                    self.exec_nested(other)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While { cond, body } => {
                loop {
                    self.check_cancel()?;
                    if !self.eval_condition(cond)? {
                        break;
                    }
                    match self.exec_nested(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::DoWhile { body, cond } => {
                loop {
                    self.check_cancel()?;
                    match self.exec_nested(body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if !self.eval_condition(cond)? {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.push_scope();
                let result = self.exec_for(init, cond.as_ref(), update, body);
                self.pop_scope();
                result
            }
            StmtKind::ForEach {
                ty,
                name,
                iterable,
                body,
            } => self.exec_for_each(ty.as_ref(), name, iterable, body),
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Throw(expr) => match self.eval(expr)? {
                Value::Throwable(t) => Err(Raised::Exception(t)),
                Value::Null => Err(Raised::null_pointer(
                    "Cannot throw exception because value is null",
                )),
                other => Err(verify_error(format!("cannot throw {}", other.ty()))),
            },
            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.exec_try(body, catches, finally.as_deref()),
            StmtKind::Empty => Ok(Flow::Normal),
        }
    }

    /// A branch or loop body gets its own scope
    fn exec_nested(&mut self, stmt: &Stmt) -> ExecResult<Flow> {
        self.push_scope();
        let result = self.exec(stmt);
        self.pop_scope();
        result
    }

    fn exec_for(
        &mut self,
        init: &[Stmt],
        cond: Option<&Expr>,
        update: &[Expr],
        body: &Stmt,
    ) -> ExecResult<Flow> {
        for stmt in init {
            self.exec(stmt)?;
        }
        loop {
            self.check_cancel()?;
            if let Some(cond) = cond {
                if !self.eval_condition(cond)? {
                    break;
                }
            }
            match self.exec_nested(body)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            for expr in update {
                self.eval(expr)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_for_each(
        &mut self,
        ty: Option<&TypeExpr>,
        name: &str,
        iterable: &Expr,
        body: &Stmt,
    ) -> ExecResult<Flow> {
        let items = match self.eval(iterable)? {
            Value::Array(array) => array.snapshot(),
            Value::Native(native) => match native.as_ref() {
                NativeObject::List(items) => lock(items).clone(),
                _ => return Err(verify_error("for-each over a non-iterable value")),
            },
            Value::Null => {
                return Err(Raised::null_pointer(
                    "Cannot iterate because value is null",
                ))
            }
            other => {
                return Err(verify_error(format!("cannot iterate over {}", other.ty())))
            }
        };

        let declared = ty.map(|t| self.resolve_ty(t));
        for item in items {
            self.check_cancel()?;
            self.push_scope();
            let item_ty = declared.clone().unwrap_or_else(|| item.ty());
            let result = self
                .declare(name, item_ty, item)
                .and_then(|_| self.exec(body));
            self.pop_scope();
            match result? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        catches: &[CatchClause],
        finally: Option<&[Stmt]>,
    ) -> ExecResult<Flow> {
        let mut result = self.exec_block(body);

        if let Err(Raised::Exception(thrown)) = &result {
            let thrown = thrown.clone();
            let clause = catches.iter().find(|clause| {
                clause
                    .types
                    .iter()
                    .any(|ty| thrown.is_instance_of(library_simple_name(ty)))
            });
            if let Some(clause) = clause {
                self.set_line(clause.pos.line);
                self.push_scope();
                let caught_ty = Ty::Throwable(thrown.class.clone());
                result = self
                    .declare(&clause.name, caught_ty, Value::Throwable(thrown))
                    .and_then(|_| self.exec_stmts(&clause.body));
                self.pop_scope();
            }
        }

        if let Some(finally) = finally {
            match self.exec_block(finally) {
                Ok(Flow::Normal) => {}
                // an abrupt finally replaces whatever the try produced
                abrupt => return abrupt,
            }
        }
        result
    }

    pub(super) fn eval_condition(&mut self, expr: &Expr) -> ExecResult<bool> {
        let value = self.eval(expr)?;
        value
            .as_bool()
            .ok_or_else(|| verify_error(format!("condition of type {} is not boolean", value.ty())))
    }

    pub(super) fn resolve_ty(&self, texpr: &TypeExpr) -> Ty {
        let namespace = self
            .frames
            .last()
            .map(|frame| frame.class.namespace().to_string())
            .unwrap_or_default();
        Ty::resolve(texpr, &namespace)
    }
}
