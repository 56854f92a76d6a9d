//! Semantic checks run by the embedded toolchain after parsing
//!
//! Type checking stays dynamic: the checker only rejects what `javac` would
//! reject without needing full expression typing (unknown symbols, static
//! context violations, duplicates, misplaced jumps and missing returns).

use super::ast::*;
use super::diagnostic::Diagnostic;
use crate::kit::lexer::Coordinate;
use crate::runtime::builtins::library_class;
use crate::runtime::types::Ty;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// A parsed file together with the name diagnostics refer to
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    pub origin: &'a str,
    pub unit: &'a CompilationUnit,
}

/// Check a set of files compiled together; warnings and errors are mixed
pub fn check_units(inputs: &[CheckInput<'_>]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut classes: HashMap<&str, &ClassDecl> = HashMap::new();

    for input in inputs {
        for class in &input.unit.classes {
            if classes.insert(class.name.as_str(), class).is_some() {
                diagnostics.push(Diagnostic::error(
                    input.origin,
                    Some(class.pos),
                    format!("duplicate class: {}", class.name),
                ));
            }
        }
    }

    for input in inputs {
        for class in &input.unit.classes {
            let mut checker = Checker::new(input.origin, &classes, class);
            checker.check_class();
            diagnostics.append(&mut checker.diagnostics);
        }
    }
    trace!(
        target: "autograde::compiler",
        count = diagnostics.len(),
        "semantic check finished"
    );
    diagnostics
}

fn signature(method: &MethodDecl) -> String {
    let params: Vec<String> = method.params.iter().map(|p| p.ty.to_string()).collect();
    format!("{}({})", method.name, params.join(", "))
}

struct Checker<'a> {
    origin: &'a str,
    classes: &'a HashMap<&'a str, &'a ClassDecl>,
    class: &'a ClassDecl,
    /// Innermost scope last; cleared per member body
    scopes: Vec<HashSet<String>>,
    is_static: bool,
    method_name: String,
    returns: Option<TypeExpr>,
    loop_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn new(origin: &'a str, classes: &'a HashMap<&'a str, &'a ClassDecl>, class: &'a ClassDecl) -> Self {
        Self {
            origin,
            classes,
            class,
            scopes: Vec::new(),
            is_static: false,
            method_name: String::new(),
            returns: None,
            loop_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, pos: Coordinate, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(self.origin, Some(pos), message));
    }

    fn warning(&mut self, pos: Coordinate, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::warning(self.origin, Some(pos), message));
    }

    // ===== declarations =====

    fn check_class(&mut self) {
        let class = self.class;
        let mut fields = HashSet::new();
        for field in &class.fields {
            if !fields.insert(field.name.as_str()) {
                self.error(
                    field.pos,
                    format!("variable {} is already defined in class {}", field.name, class.name),
                );
            }
            self.check_type(&field.ty);
        }

        let mut signatures = HashSet::new();
        for method in class.constructors.iter().chain(&class.methods) {
            let key = (
                method.is_constructor,
                method.name.as_str(),
                method.params.iter().map(|p| p.ty.to_string()).collect::<Vec<_>>(),
            );
            if !signatures.insert(key) {
                let what = if method.is_constructor { "constructor" } else { "method" };
                self.error(
                    method.pos,
                    format!("{what} {} is already defined in class {}", signature(method), class.name),
                );
            }
        }

        for field in &class.fields {
            if let Some(init) = &field.init {
                self.enter_member(field.modifiers.is_static, &field.name, None);
                self.check_expr(init);
            }
        }
        for method in class.constructors.iter().chain(&class.methods) {
            self.check_method(method);
        }
    }

    fn enter_member(&mut self, is_static: bool, name: &str, returns: Option<TypeExpr>) {
        self.scopes = vec![HashSet::new()];
        self.is_static = is_static;
        self.method_name = name.to_string();
        self.returns = returns;
        self.loop_depth = 0;
    }

    fn check_method(&mut self, method: &'a MethodDecl) {
        if !method.is_constructor {
            self.check_type(&method.returns);
        }
        let returns = (!method.is_constructor).then(|| method.returns.clone());
        self.enter_member(method.modifiers.is_static, &method.name, returns);
        for param in &method.params {
            self.check_type(&param.ty);
            self.declare(&param.name, param.pos, false);
        }

        let body = match &method.body {
            Some(body) => body,
            None => {
                if !method.modifiers.is_abstract {
                    self.error(method.pos, "missing method body, or declare abstract");
                }
                return;
            }
        };
        self.check_stmts(body);
        if !method.is_constructor && !method.returns.is_void() && can_complete_normally(body) {
            self.error(method.pos, "missing return statement");
        }
    }

    // ===== names =====

    fn class_known(&self, name: &str) -> bool {
        let simple = name.rsplit('.').next().unwrap_or(name);
        self.classes.contains_key(simple) || Ty::library(name).is_some() || library_class(name).is_some()
    }

    fn check_type(&mut self, ty: &TypeExpr) {
        if !ty.is_void() && !self.class_known(&ty.name) {
            self.error(ty.pos, format!("cannot find symbol: class {}", ty.simple_name()));
        }
    }

    fn local_defined(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str, pos: Coordinate, is_local: bool) {
        if self.local_defined(name) {
            self.error(
                pos,
                format!("variable {name} is already defined in method {}", self.method_name),
            );
            return;
        }
        if is_local && self.class.field(name).is_some() {
            self.warning(pos, format!("[shadow] local variable {name} hides a field"));
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn scoped<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.scopes.push(HashSet::new());
        f(self);
        self.scopes.pop();
    }

    /// A bare name used as a value
    fn check_name(&mut self, name: &str, pos: Coordinate) {
        if self.local_defined(name) {
            return;
        }
        match self.class.field(name) {
            Some(field) if self.is_static && !field.modifiers.is_static => self.error(
                pos,
                format!("non-static variable {name} cannot be referenced from a static context"),
            ),
            Some(_) => {}
            None => self.error(pos, format!("cannot find symbol: variable {name}")),
        }
    }

    /// The left side of `.`, which may also name a class
    fn check_target(&mut self, target: &Expr) {
        if let ExprKind::Name(name) = &target.kind {
            if !self.local_defined(name) && self.class.field(name).is_none() && self.class_known(name) {
                return;
            }
        }
        self.check_expr(target);
    }

    fn check_unqualified_call(&mut self, name: &str, args: &[Expr], pos: Coordinate) {
        let class = self.class;
        let candidates: Vec<&MethodDecl> = class.methods.iter().filter(|m| m.name == name).collect();
        if candidates.is_empty() {
            self.error(pos, format!("cannot find symbol: method {name}"));
            return;
        }
        let applicable: Vec<&&MethodDecl> = candidates
            .iter()
            .filter(|m| m.params.len() == args.len())
            .collect();
        match applicable.first() {
            None => self.error(
                pos,
                format!("method {name} in class {} cannot be applied to given types", class.name),
            ),
            Some(first) if self.is_static && applicable.iter().all(|m| !m.modifiers.is_static) => {
                let message = format!(
                    "non-static method {} cannot be referenced from a static context",
                    signature(first)
                );
                self.error(pos, message);
            }
            Some(_) => {}
        }
    }

    fn check_new(&mut self, class: &TypeExpr, args: &[Expr], pos: Coordinate) {
        self.check_type(class);
        if let Some(decl) = self.classes.get(class.simple_name()) {
            let fits = if decl.constructors.is_empty() {
                args.is_empty()
            } else {
                decl.constructors.iter().any(|c| c.params.len() == args.len())
            };
            if !fits {
                self.error(
                    pos,
                    format!(
                        "constructor {0} in class {0} cannot be applied to given types",
                        decl.name
                    ),
                );
            }
        }
    }

    // ===== statements =====

    fn check_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_loop_body(&mut self, body: &Stmt) {
        self.loop_depth += 1;
        self.scoped(|c| c.check_stmt(body));
        self.loop_depth -= 1;
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(stmts) => self.scoped(|c| c.check_stmts(stmts)),
            StmtKind::Local { ty, declarators } => {
                if let Some(ty) = ty {
                    self.check_type(ty);
                }
                for declarator in declarators {
                    match &declarator.init {
                        Some(init) => self.check_expr(init),
                        None if ty.is_none() => self.error(
                            declarator.pos,
                            format!(
                                "cannot infer type for local variable {} (variable initializer is missing)",
                                declarator.name
                            ),
                        ),
                        None => {}
                    }
                    self.declare(&declarator.name, declarator.pos, true);
                }
            }
            StmtKind::Expr(expr) => self.check_expr(expr),
            StmtKind::If { cond, then, otherwise } => {
                self.check_expr(cond);
                self.scoped(|c| c.check_stmt(then));
                if let Some(otherwise) = otherwise {
                    self.scoped(|c| c.check_stmt(otherwise));
                }
            }
            StmtKind::While { cond, body } => {
                self.check_expr(cond);
                self.check_loop_body(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.check_loop_body(body);
                self.check_expr(cond);
            }
            StmtKind::For { init, cond, update, body } => self.scoped(|c| {
                c.check_stmts(init);
                if let Some(cond) = cond {
                    c.check_expr(cond);
                }
                for expr in update {
                    c.check_expr(expr);
                }
                c.check_loop_body(body);
            }),
            StmtKind::ForEach { ty, name, iterable, body } => {
                if let Some(ty) = ty {
                    self.check_type(ty);
                }
                self.check_expr(iterable);
                self.scoped(|c| {
                    c.declare(name, stmt.pos, true);
                    c.check_loop_body(body);
                });
            }
            StmtKind::Break if self.loop_depth == 0 => self.error(stmt.pos, "break outside switch or loop"),
            StmtKind::Continue if self.loop_depth == 0 => self.error(stmt.pos, "continue outside of loop"),
            StmtKind::Return(value) => self.check_return(value.as_ref(), stmt.pos),
            StmtKind::Throw(expr) => self.check_expr(expr),
            StmtKind::Try { body, catches, finally } => {
                self.scoped(|c| c.check_stmts(body));
                for catch in catches {
                    for ty in &catch.types {
                        if !crate::runtime::types::is_throwable_class(
                            crate::runtime::types::library_simple_name(ty),
                        ) {
                            let simple = ty.rsplit('.').next().unwrap_or(ty);
                            self.error(catch.pos, format!("cannot find symbol: class {simple}"));
                        }
                    }
                    self.scoped(|c| {
                        c.declare(&catch.name, catch.pos, true);
                        c.check_stmts(&catch.body);
                    });
                }
                if let Some(finally) = finally {
                    self.scoped(|c| c.check_stmts(finally));
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }

    fn check_return(&mut self, value: Option<&Expr>, pos: Coordinate) {
        let void = self.returns.as_ref().map_or(true, TypeExpr::is_void);
        match value {
            Some(expr) => {
                self.check_expr(expr);
                if void {
                    self.error(pos, "incompatible types: unexpected return value");
                }
            }
            None if !void => self.error(pos, "incompatible types: missing return value"),
            None => {}
        }
    }

    // ===== expressions =====

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Long(_)
            | ExprKind::Double(_)
            | ExprKind::Char(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Null => {}
            ExprKind::This if self.is_static => self.error(
                expr.pos,
                "non-static variable this cannot be referenced from a static context",
            ),
            ExprKind::This => {}
            ExprKind::Name(name) => self.check_name(name, expr.pos),
            ExprKind::Field { target, .. } => self.check_target(target),
            ExprKind::Index { target, index } => {
                self.check_expr(target);
                self.check_expr(index);
            }
            ExprKind::Call { target, name, args } => {
                match target {
                    Some(target) => self.check_target(target),
                    None => self.check_unqualified_call(name, args, expr.pos),
                }
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::New { class, args } => {
                self.check_new(class, args, expr.pos);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::NewArray { ty, dims } => {
                self.check_type(ty);
                for dim in dims {
                    self.check_expr(dim);
                }
            }
            ExprKind::ArrayLit { ty, items } => {
                self.check_type(ty);
                for item in items {
                    self.check_expr(item);
                }
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand),
            ExprKind::IncDec { target, .. } => self.check_expr(target),
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.check_expr(target);
                self.check_expr(value);
            }
            ExprKind::Cast { ty, operand } => {
                self.check_type(ty);
                self.check_expr(operand);
            }
            ExprKind::Conditional { cond, then, otherwise } => {
                self.check_expr(cond);
                self.check_expr(then);
                self.check_expr(otherwise);
            }
        }
    }
}

// ===== reachability =====

fn is_true(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Bool(true))
}

/// Whether a `break` inside `stmt` targets the enclosing loop
fn breaks_out(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::Block(stmts) => stmts.iter().any(breaks_out),
        StmtKind::If { then, otherwise, .. } => {
            breaks_out(then) || otherwise.as_deref().is_some_and(breaks_out)
        }
        StmtKind::Try { body, catches, finally } => {
            body.iter().any(breaks_out)
                || catches.iter().any(|c| c.body.iter().any(breaks_out))
                || finally.as_ref().is_some_and(|f| f.iter().any(breaks_out))
        }
        _ => false,
    }
}

fn stmt_completes(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Throw(_) | StmtKind::Break | StmtKind::Continue => false,
        StmtKind::Block(stmts) => can_complete_normally(stmts),
        StmtKind::If {
            then,
            otherwise: Some(otherwise),
            ..
        } => stmt_completes(then) || stmt_completes(otherwise),
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            !is_true(cond) || breaks_out(body)
        }
        StmtKind::For { cond, body, .. } => cond.as_ref().is_some_and(|c| !is_true(c)) || breaks_out(body),
        StmtKind::Try { body, catches, finally } => {
            let finally_completes = finally.as_deref().map_or(true, can_complete_normally);
            finally_completes
                && (can_complete_normally(body) || catches.iter().any(|c| can_complete_normally(&c.body)))
        }
        _ => true,
    }
}

/// Whether control can fall off the end of `stmts`
pub fn can_complete_normally(stmts: &[Stmt]) -> bool {
    stmts.iter().all(stmt_completes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::parse_source;

    fn check(source: &str) -> Vec<String> {
        let unit = parse_source(source).expect("parse");
        check_units(&[CheckInput {
            origin: "Test.java",
            unit: &unit,
        }])
        .into_iter()
        .map(|d| d.to_string())
        .collect()
    }

    fn assert_error(source: &str, needle: &str) {
        let messages = check(source);
        assert!(
            messages.iter().any(|m| m.contains(needle)),
            "expected `{needle}` in {messages:?}"
        );
    }

    #[test]
    fn test_clean_class() {
        let messages = check(
            "public class Calc {
                private int total;
                public Calc(int start) { total = start; }
                public int add(int a, int b) { return a + b; }
                public static int max(int a, int b) { if (a > b) { return a; } else { return b; } }
                public static void main(String[] args) {
                    Calc c = new Calc(1);
                    System.out.println(c.add(2, 3) + Math.max(1, 2));
                    for (int i = 0; i < 3; i++) { if (i == 1) { break; } }
                }
            }",
        );
        assert!(messages.is_empty(), "{messages:?}");
    }

    #[test]
    fn test_unknown_symbols() {
        assert_error(
            "class A { void f() { int y = x + 1; } }",
            "Test.java:1:30: error: cannot find symbol: variable x",
        );
        assert_error("class A { Widget w; }", "cannot find symbol: class Widget");
        assert_error("class A { void f() { g(); } }", "cannot find symbol: method g");
        assert_error(
            "class A { void f(int a) { } void g() { f(); } }",
            "method f in class A cannot be applied to given types",
        );
    }

    #[test]
    fn test_static_context() {
        assert_error(
            "class A { int count; static void f() { count = 1; } }",
            "non-static variable count cannot be referenced from a static context",
        );
        assert_error(
            "class A { int g(int x) { return x; } static void f() { g(1); } }",
            "non-static method g(int) cannot be referenced from a static context",
        );
        assert_error(
            "class A { static void f() { this.toString(); } }",
            "non-static variable this cannot be referenced from a static context",
        );
    }

    #[test]
    fn test_duplicates() {
        assert_error("class A { int x; int x; }", "variable x is already defined in class A");
        assert_error(
            "class A { void f(int a) { int a = 1; } }",
            "variable a is already defined in method f",
        );
        assert_error(
            "class A { void f() {} void f() {} }",
            "method f() is already defined in class A",
        );
        assert_error("class A {} class A {}", "duplicate class: A");
    }

    #[test]
    fn test_missing_return() {
        assert_error(
            "class A { int f(int x) { if (x > 0) { return 1; } } }",
            "missing return statement",
        );
        let messages = check("class A { int f() { while (true) { } } int g() { throw new RuntimeException(); } }");
        assert!(messages.is_empty(), "{messages:?}");
    }

    #[test]
    fn test_jumps_outside_loops() {
        assert_error("class A { void f() { break; } }", "break outside switch or loop");
        assert_error("class A { void f() { continue; } }", "continue outside of loop");
    }

    #[test]
    fn test_return_values() {
        assert_error("class A { void f() { return 1; } }", "unexpected return value");
        assert_error("class A { int f() { return; } }", "missing return value");
    }

    #[test]
    fn test_shadow_warning_for_locals_only() {
        let messages = check("class A { int x; A(int x) { this.x = x; } void f() { int x = 2; } }");
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].contains("warning: [shadow] local variable x hides a field"));
    }

    #[test]
    fn test_can_complete_normally() {
        let unit = parse_source(
            "class A { void f() { try { return; } finally { } } void g() { for (;;) { break; } } }",
        )
        .expect("parse");
        let f = unit.classes[0].methods[0].body.as_ref().expect("body");
        let g = unit.classes[0].methods[1].body.as_ref().expect("body");
        assert!(!can_complete_normally(f));
        assert!(can_complete_normally(g));
    }
}
