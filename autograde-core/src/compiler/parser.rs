//! Recursive descent parser for the unit language
//!
//! Works over the full token vector so that declarations can be told apart
//! from expressions by looking ahead and backtracking.

use super::ast::*;
use super::error::{ParseResult, ParserError, ParserErrorKind};
use crate::kit::lexer::{Coordinate, Lexer, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parse a whole source text
pub fn parse_source(source: &str) -> ParseResult<CompilationUnit> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> ParseResult<CompilationUnit> {
        self.parse_unit()
    }

    // ===== token helpers =====

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Position of the current token, or of the last one at end of input
    fn here(&self) -> Coordinate {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.span.start)
            .unwrap_or_default()
    }

    fn found_text(&self) -> String {
        match self.peek() {
            Some(token) => token.display_text(),
            None => "<EOF>".to_string(),
        }
    }

    fn error_here(&self, kind: ParserErrorKind) -> ParserError {
        match self.peek() {
            Some(token) => ParserError::at(kind, token.span.start),
            None => ParserError::at_eof(kind),
        }
    }

    fn unexpected(&self, expected: &[&str]) -> ParserError {
        if self.peek().is_none() {
            return ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput);
        }
        self.error_here(ParserErrorKind::UnexpectedToken {
            found: self.found_text(),
            expected: expected.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn unsupported(&self, what: &str) -> ParserError {
        self.error_here(ParserErrorKind::Unsupported(what.to_string()))
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            self.advance()
                .ok_or_else(|| ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput))
        } else {
            Err(self.unexpected(&[kind.describe()]))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                let name = token.text.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(_) => Err(self.error_here(ParserErrorKind::ExpectedIdentifier {
                found: self.found_text(),
            })),
            None => Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput)),
        }
    }

    fn qualified_name(&mut self) -> ParseResult<String> {
        let mut name = self.expect_identifier()?;
        while self.check(TokenKind::Dot) && self.peek_kind_at(1) == Some(TokenKind::Identifier) {
            self.pos += 1;
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    // ===== declarations =====

    fn parse_unit(&mut self) -> ParseResult<CompilationUnit> {
        self.skip_annotations()?;
        let package = if self.match_token(TokenKind::Package) {
            let name = self.qualified_name()?;
            self.expect(TokenKind::Semicolon)?;
            Some(name)
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.match_token(TokenKind::Import) {
            self.match_token(TokenKind::Static);
            let mut path = self.qualified_name()?;
            if self.match_token(TokenKind::Dot) {
                self.expect(TokenKind::Star)?;
                path.push_str(".*");
            }
            self.expect(TokenKind::Semicolon)?;
            imports.push(path);
        }

        let mut classes = Vec::new();
        while self.peek().is_some() {
            if self.match_token(TokenKind::Semicolon) {
                continue;
            }
            classes.push(self.parse_class()?);
        }

        Ok(CompilationUnit {
            package,
            imports,
            classes,
        })
    }

    fn skip_annotations(&mut self) -> ParseResult<()> {
        while self.check(TokenKind::At) && self.peek_kind_at(1) != Some(TokenKind::Interface) {
            self.pos += 1;
            self.qualified_name()?;
            if self.check(TokenKind::LeftParen) {
                self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen)?;
            }
        }
        Ok(())
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> ParseResult<()> {
        let mut depth = 0usize;
        loop {
            let token = self
                .advance()
                .ok_or_else(|| ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput))?;
            if token.kind == open {
                depth += 1;
            } else if token.kind == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }

    fn parse_modifiers(&mut self) -> ParseResult<Modifiers> {
        let mut modifiers = Modifiers::default();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Public) => modifiers.visibility = Visibility::Public,
                Some(TokenKind::Private) => modifiers.visibility = Visibility::Private,
                Some(TokenKind::Protected) => modifiers.visibility = Visibility::Protected,
                Some(TokenKind::Static) => modifiers.is_static = true,
                Some(TokenKind::Final) => modifiers.is_final = true,
                Some(TokenKind::Abstract) => modifiers.is_abstract = true,
                Some(TokenKind::At) if self.peek_kind_at(1) != Some(TokenKind::Interface) => {
                    self.skip_annotations()?;
                    continue;
                }
                Some(TokenKind::Identifier)
                    if matches!(
                        self.peek().map(|t| t.text.as_str()),
                        Some("synchronized" | "strictfp" | "transient" | "volatile" | "native")
                    ) && self.peek_kind_at(1) != Some(TokenKind::LeftParen) =>
                {
                    // accepted and ignored
                }
                _ => return Ok(modifiers),
            }
            self.pos += 1;
        }
    }

    fn reject_type_declaration(&self, nested: bool) -> ParseResult<()> {
        let what = match self.peek_kind() {
            Some(TokenKind::Interface) => "interface",
            Some(TokenKind::Enum) => "enum",
            Some(TokenKind::At) => "annotation type",
            Some(TokenKind::Class) if nested => "nested class",
            _ => return Ok(()),
        };
        Err(self.unsupported(what))
    }

    fn parse_class(&mut self) -> ParseResult<ClassDecl> {
        let modifiers = self.parse_modifiers()?;
        self.reject_type_declaration(false)?;
        let pos = self.here();
        self.expect(TokenKind::Class)?;
        let name = self.expect_identifier()?;

        if self.check(TokenKind::Less) {
            return Err(self.unsupported("generic class declaration"));
        }
        if self.check(TokenKind::Extends) {
            return Err(self.unsupported("inheritance (extends)"));
        }
        if self.check(TokenKind::Implements) {
            return Err(self.unsupported("interface implementation (implements)"));
        }

        self.expect(TokenKind::LeftBrace)?;
        let mut class = ClassDecl {
            name,
            modifiers,
            fields: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            pos,
        };
        while !self.check(TokenKind::RightBrace) {
            if self.peek().is_none() {
                return Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput));
            }
            if self.match_token(TokenKind::Semicolon) {
                continue;
            }
            self.parse_member(&mut class)?;
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(class)
    }

    fn parse_member(&mut self, class: &mut ClassDecl) -> ParseResult<()> {
        let modifiers = self.parse_modifiers()?;
        self.reject_type_declaration(true)?;
        if self.check(TokenKind::Less) {
            return Err(self.unsupported("generic method declaration"));
        }
        if self.check(TokenKind::LeftBrace) {
            return Err(self.unsupported("initializer block"));
        }

        let pos = self.here();
        let is_constructor = self.peek().is_some_and(|t| {
            t.kind == TokenKind::Identifier && t.text == class.name
        }) && self.peek_kind_at(1) == Some(TokenKind::LeftParen);

        if is_constructor {
            self.pos += 1;
            let method = self.parse_method_rest(class.name.clone(), modifiers, TypeExpr::void(pos), true, pos)?;
            class.constructors.push(method);
            return Ok(());
        }

        let ty = if self.match_token(TokenKind::Void) {
            TypeExpr::void(pos)
        } else {
            self.parse_type()?
        };
        let name_pos = self.here();
        let name = self.expect_identifier()?;

        if self.check(TokenKind::LeftParen) {
            let method = self.parse_method_rest(name, modifiers, ty, false, name_pos)?;
            class.methods.push(method);
            return Ok(());
        }

        if ty.is_void() {
            return Err(self.unexpected(&["("]));
        }
        let mut field_name = name;
        let mut field_pos = name_pos;
        loop {
            let field_ty = self.trailing_dims(ty.clone())?;
            let init = if self.match_token(TokenKind::Equal) {
                Some(self.parse_var_init(&field_ty)?)
            } else {
                None
            };
            class.fields.push(FieldDecl {
                name: field_name,
                ty: field_ty,
                modifiers,
                init,
                pos: field_pos,
            });
            if !self.match_token(TokenKind::Comma) {
                break;
            }
            field_pos = self.here();
            field_name = self.expect_identifier()?;
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(())
    }

    fn parse_method_rest(
        &mut self,
        name: String,
        modifiers: Modifiers,
        returns: TypeExpr,
        is_constructor: bool,
        pos: Coordinate,
    ) -> ParseResult<MethodDecl> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                self.parse_modifiers()?;
                let mut ty = self.parse_type()?;
                if self.match_token(TokenKind::Ellipsis) {
                    ty.dims += 1;
                }
                let param_pos = self.here();
                let param_name = self.expect_identifier()?;
                let ty = self.trailing_dims(ty)?;
                params.push(Param {
                    name: param_name,
                    ty,
                    pos: param_pos,
                });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        let returns = self.trailing_dims(returns)?;

        if self.match_token(TokenKind::Throws) {
            loop {
                self.qualified_name()?;
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        let body = if self.match_token(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_block_body()?)
        };

        Ok(MethodDecl {
            name,
            modifiers,
            params,
            returns,
            body,
            is_constructor,
            pos,
        })
    }

    /// C-style dimensions after a name: `int a[]`
    fn trailing_dims(&mut self, mut ty: TypeExpr) -> ParseResult<TypeExpr> {
        while self.check(TokenKind::LeftBracket) && self.peek_kind_at(1) == Some(TokenKind::RightBracket) {
            self.pos += 2;
            ty.dims += 1;
        }
        Ok(ty)
    }

    // ===== types =====

    fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let start = self.pos;
        match self.try_parse_type() {
            Some(ty) => Ok(ty),
            None => {
                self.pos = start;
                Err(self.error_here(ParserErrorKind::ExpectedIdentifier {
                    found: self.found_text(),
                }))
            }
        }
    }

    /// Parse a type without reporting errors; the caller restores the position
    fn try_parse_type(&mut self) -> Option<TypeExpr> {
        let pos = self.here();
        let token = self.peek()?.clone();
        let name = if token.kind.is_primitive() {
            self.pos += 1;
            token.kind.describe().to_string()
        } else if token.kind == TokenKind::Identifier {
            let mut name = token.text;
            self.pos += 1;
            while self.check(TokenKind::Dot) && self.peek_kind_at(1) == Some(TokenKind::Identifier) {
                self.pos += 1;
                name.push('.');
                name.push_str(&self.advance()?.text);
            }
            if self.check(TokenKind::Less) && !self.skip_type_arguments() {
                return None;
            }
            name
        } else {
            return None;
        };

        let mut dims = 0;
        while self.check(TokenKind::LeftBracket) && self.peek_kind_at(1) == Some(TokenKind::RightBracket) {
            self.pos += 2;
            dims += 1;
        }
        Some(TypeExpr::new(name, dims, pos))
    }

    /// Skip `<...>`; generic arguments are erased
    fn skip_type_arguments(&mut self) -> bool {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Less) => depth += 1,
                Some(TokenKind::Greater) => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return true;
                    }
                }
                Some(
                    TokenKind::Identifier
                    | TokenKind::Comma
                    | TokenKind::Dot
                    | TokenKind::Question
                    | TokenKind::Extends
                    | TokenKind::Super
                    | TokenKind::LeftBracket
                    | TokenKind::RightBracket
                    | TokenKind::Boolean
                    | TokenKind::Char
                    | TokenKind::Int
                    | TokenKind::Long
                    | TokenKind::Double,
                ) => {}
                _ => return false,
            }
            self.pos += 1;
        }
    }

    /// Does a local variable declaration start here?
    fn is_local_declaration(&mut self) -> bool {
        let start = self.pos;
        let result = match self.try_parse_type() {
            Some(_) => {
                self.check(TokenKind::Identifier)
                    && matches!(
                        self.peek_kind_at(1),
                        Some(
                            TokenKind::Equal
                                | TokenKind::Semicolon
                                | TokenKind::Comma
                                | TokenKind::Colon
                                | TokenKind::LeftBracket
                        )
                    )
            }
            None => false,
        };
        self.pos = start;
        result
    }

    // ===== statements =====

    fn parse_block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::LeftBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            if self.peek().is_none() {
                return Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput));
            }
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let pos = self.here();
        let kind = match self.peek_kind() {
            None => return Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput)),
            Some(TokenKind::LeftBrace) => StmtKind::Block(self.parse_block_body()?),
            Some(TokenKind::Semicolon) => {
                self.pos += 1;
                StmtKind::Empty
            }
            Some(TokenKind::If) => self.parse_if()?,
            Some(TokenKind::While) => {
                self.pos += 1;
                let cond = self.parse_paren_expr()?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { cond, body }
            }
            Some(TokenKind::Do) => {
                self.pos += 1;
                let body = Box::new(self.parse_statement()?);
                self.expect(TokenKind::While)?;
                let cond = self.parse_paren_expr()?;
                self.expect(TokenKind::Semicolon)?;
                StmtKind::DoWhile { body, cond }
            }
            Some(TokenKind::For) => self.parse_for()?,
            Some(TokenKind::Break) => {
                self.pos += 1;
                if self.check(TokenKind::Identifier) {
                    return Err(self.unsupported("labeled break"));
                }
                self.expect(TokenKind::Semicolon)?;
                StmtKind::Break
            }
            Some(TokenKind::Continue) => {
                self.pos += 1;
                if self.check(TokenKind::Identifier) {
                    return Err(self.unsupported("labeled continue"));
                }
                self.expect(TokenKind::Semicolon)?;
                StmtKind::Continue
            }
            Some(TokenKind::Return) => {
                self.pos += 1;
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semicolon)?;
                StmtKind::Return(value)
            }
            Some(TokenKind::Throw) => {
                self.pos += 1;
                let value = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                StmtKind::Throw(value)
            }
            Some(TokenKind::Try) => self.parse_try()?,
            Some(TokenKind::Switch) => return Err(self.unsupported("switch")),
            Some(TokenKind::Class | TokenKind::Interface | TokenKind::Enum) => {
                return Err(self.unsupported("local class"))
            }
            Some(TokenKind::Identifier) if self.peek_kind_at(1) == Some(TokenKind::Colon) => {
                return Err(self.unsupported("labeled statement"))
            }
            Some(TokenKind::Final) => {
                self.pos += 1;
                self.parse_modifiers()?;
                let kind = self.parse_local_declaration()?;
                self.expect(TokenKind::Semicolon)?;
                kind
            }
            _ => {
                if self.is_var_declaration() || self.is_local_declaration() {
                    let kind = self.parse_local_declaration()?;
                    self.expect(TokenKind::Semicolon)?;
                    kind
                } else {
                    let expr = self.parse_expression()?;
                    self.expect_statement_expression(&expr)?;
                    self.expect(TokenKind::Semicolon)?;
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt { kind, pos })
    }

    fn is_var_declaration(&self) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Var)
            && self.peek_kind_at(1) == Some(TokenKind::Identifier)
    }

    fn expect_statement_expression(&self, expr: &Expr) -> ParseResult<()> {
        match expr.kind {
            ExprKind::Assign { .. }
            | ExprKind::IncDec { .. }
            | ExprKind::Call { .. }
            | ExprKind::New { .. } => Ok(()),
            _ => Err(ParserError::at(
                ParserErrorKind::Custom("not a statement".to_string()),
                expr.pos,
            )),
        }
    }

    /// `Type a = 1, b;` or `var a = 1;` (without the trailing semicolon)
    fn parse_local_declaration(&mut self) -> ParseResult<StmtKind> {
        let ty = if self.is_var_declaration() {
            self.pos += 1;
            None
        } else {
            Some(self.parse_type()?)
        };
        let mut declarators = Vec::new();
        let mut declared_ty = None;
        loop {
            let pos = self.here();
            let name = self.expect_identifier()?;
            let decl_ty = match &ty {
                Some(ty) => Some(self.trailing_dims(ty.clone())?),
                None => None,
            };
            let init = if self.match_token(TokenKind::Equal) {
                match &decl_ty {
                    Some(ty) => Some(self.parse_var_init(ty)?),
                    None => Some(self.parse_expression()?),
                }
            } else {
                if ty.is_none() {
                    return Err(self.error_here(ParserErrorKind::Custom(
                        "cannot infer type for local variable without initializer".to_string(),
                    )));
                }
                None
            };
            declarators.push(Declarator { name, init, pos });
            // C-style dims on the first declarator decide the shared type
            if declared_ty.is_none() {
                declared_ty = decl_ty;
            }
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(StmtKind::Local {
            ty: declared_ty,
            declarators,
        })
    }

    fn parse_var_init(&mut self, ty: &TypeExpr) -> ParseResult<Expr> {
        if self.check(TokenKind::LeftBrace) {
            if ty.dims == 0 {
                return Err(self.error_here(ParserErrorKind::Custom(
                    "illegal initializer for ".to_string() + &ty.to_string(),
                )));
            }
            self.parse_array_literal(ty.clone())
        } else {
            self.parse_expression()
        }
    }

    fn parse_array_literal(&mut self, ty: TypeExpr) -> ParseResult<Expr> {
        let pos = self.here();
        self.expect(TokenKind::LeftBrace)?;
        let mut items = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let item = if self.check(TokenKind::LeftBrace) {
                if ty.dims < 2 {
                    return Err(self.error_here(ParserErrorKind::Custom(format!(
                        "illegal initializer for {}",
                        ty.element()
                    ))));
                }
                self.parse_array_literal(ty.element())?
            } else {
                self.parse_expression()?
            };
            items.push(item);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(Expr::new(ExprKind::ArrayLit { ty, items }, pos))
    }

    fn parse_paren_expr(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::LeftParen)?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> ParseResult<StmtKind> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_paren_expr()?;
        let then = Box::new(self.parse_statement()?);
        let otherwise = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_for(&mut self) -> ParseResult<StmtKind> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LeftParen)?;

        let mut init = Vec::new();
        if !self.check(TokenKind::Semicolon) {
            let pos = self.here();
            if self.match_token(TokenKind::Final) {
                self.parse_modifiers()?;
            }
            if self.is_var_declaration() || self.is_local_declaration() {
                // enhanced for: `for (T x : items)`
                let save = self.pos;
                let ty = if self.is_var_declaration() {
                    self.pos += 1;
                    None
                } else {
                    Some(self.parse_type()?)
                };
                let name = self.expect_identifier()?;
                if self.match_token(TokenKind::Colon) {
                    let iterable = self.parse_expression()?;
                    self.expect(TokenKind::RightParen)?;
                    let body = Box::new(self.parse_statement()?);
                    return Ok(StmtKind::ForEach {
                        ty,
                        name,
                        iterable,
                        body,
                    });
                }
                self.pos = save;
                let kind = self.parse_local_declaration()?;
                init.push(Stmt { kind, pos });
            } else {
                loop {
                    let expr = self.parse_expression()?;
                    self.expect_statement_expression(&expr)?;
                    init.push(Stmt {
                        pos: expr.pos,
                        kind: StmtKind::Expr(expr),
                    });
                    if !self.match_token(TokenKind::Comma) {
                        break;
                    }
                }
            }
        }
        self.expect(TokenKind::Semicolon)?;

        let cond = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let mut update = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let expr = self.parse_expression()?;
                self.expect_statement_expression(&expr)?;
                update.push(expr);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> ParseResult<StmtKind> {
        self.expect(TokenKind::Try)?;
        if self.check(TokenKind::LeftParen) {
            return Err(self.unsupported("try-with-resources"));
        }
        let body = self.parse_block_body()?;
        let mut catches = Vec::new();
        while self.check(TokenKind::Catch) {
            let pos = self.here();
            self.pos += 1;
            self.expect(TokenKind::LeftParen)?;
            self.parse_modifiers()?;
            let mut types = vec![self.qualified_name()?];
            while self.match_token(TokenKind::Bar) {
                types.push(self.qualified_name()?);
            }
            let name = self.expect_identifier()?;
            self.expect(TokenKind::RightParen)?;
            let body = self.parse_block_body()?;
            catches.push(CatchClause {
                types,
                name,
                body,
                pos,
            });
        }
        let finally = if self.match_token(TokenKind::Finally) {
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            return Err(self.error_here(ParserErrorKind::Custom(
                "'try' without 'catch' or 'finally'".to_string(),
            )));
        }
        Ok(StmtKind::Try {
            body,
            catches,
            finally,
        })
    }

    // ===== expressions =====

    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let target = self.parse_conditional()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Equal) => None,
            Some(TokenKind::PlusEqual) => Some(BinaryOp::Add),
            Some(TokenKind::MinusEqual) => Some(BinaryOp::Sub),
            Some(TokenKind::StarEqual) => Some(BinaryOp::Mul),
            Some(TokenKind::SlashEqual) => Some(BinaryOp::Div),
            Some(TokenKind::PercentEqual) => Some(BinaryOp::Rem),
            Some(TokenKind::Arrow) => return Err(self.unsupported("lambda expression")),
            _ => return Ok(target),
        };
        if !is_assignable(&target) {
            return Err(ParserError::at(
                ParserErrorKind::Custom("unexpected type: required variable".to_string()),
                target.pos,
            ));
        }
        self.pos += 1;
        let value = self.parse_assignment()?;
        let pos = target.pos;
        Ok(Expr::new(
            ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            pos,
        ))
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let cond = self.parse_binary(0)?;
        if !self.match_token(TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.parse_conditional()?;
        let pos = cond.pos;
        Ok(Expr::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            pos,
        ))
    }

    /// Precedence climbing over the binary operators
    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            if self.check(TokenKind::Instanceof) {
                return Err(self.unsupported("instanceof"));
            }
            let Some((op, prec)) = self.peek_kind().and_then(binary_op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.parse_binary(prec + 1)?;
            let pos = left.pos;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                pos,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let pos = self.here();
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                if let Some(literal) = self.min_value_literal()? {
                    return Ok(Expr::new(literal, pos));
                }
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    pos,
                ))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Plus,
                        operand: Box::new(operand),
                    },
                    pos,
                ))
            }
            Some(TokenKind::Bang) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    pos,
                ))
            }
            Some(kind @ (TokenKind::PlusPlus | TokenKind::MinusMinus)) => {
                self.pos += 1;
                let target = self.parse_unary()?;
                if !is_assignable(&target) {
                    return Err(ParserError::at(
                        ParserErrorKind::Custom("unexpected type: required variable".to_string()),
                        target.pos,
                    ));
                }
                Ok(Expr::new(
                    ExprKind::IncDec {
                        target: Box::new(target),
                        increment: kind == TokenKind::PlusPlus,
                        prefix: true,
                    },
                    pos,
                ))
            }
            Some(TokenKind::LeftParen) if self.is_primitive_cast() => {
                self.pos += 1;
                let ty = self.parse_type()?;
                self.expect(TokenKind::RightParen)?;
                let operand = self.parse_unary()?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        ty,
                        operand: Box::new(operand),
                    },
                    pos,
                ))
            }
            _ => self.parse_postfix(),
        }
    }

    /// `-2147483648` and `-9223372036854775808L` only exist negated
    fn min_value_literal(&mut self) -> ParseResult<Option<ExprKind>> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        let literal = match (token.kind, token.text.as_str()) {
            (TokenKind::IntLiteral, "2147483648") => Some(ExprKind::Int(i32::MIN)),
            (TokenKind::LongLiteral, "9223372036854775808") => Some(ExprKind::Long(i64::MIN)),
            _ => None,
        };
        if literal.is_some() {
            self.pos += 1;
        }
        Ok(literal)
    }

    fn is_primitive_cast(&self) -> bool {
        if !self.peek_kind_at(1).is_some_and(|k| k.is_primitive()) {
            return false;
        }
        let mut offset = 2;
        while self.peek_kind_at(offset) == Some(TokenKind::LeftBracket)
            && self.peek_kind_at(offset + 1) == Some(TokenKind::RightBracket)
        {
            offset += 2;
        }
        self.peek_kind_at(offset) == Some(TokenKind::RightParen)
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let pos = self.here();
            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    self.pos += 1;
                    if self.check(TokenKind::Less) {
                        return Err(self.unsupported("explicit generic method call"));
                    }
                    if self.check(TokenKind::Class) {
                        return Err(self.unsupported("class literal"));
                    }
                    let name = self.expect_identifier()?;
                    if self.check(TokenKind::LeftParen) {
                        let args = self.parse_arguments()?;
                        expr = Expr::new(
                            ExprKind::Call {
                                target: Some(Box::new(expr)),
                                name,
                                args,
                            },
                            pos,
                        );
                    } else {
                        expr = Expr::new(
                            ExprKind::Field {
                                target: Box::new(expr),
                                name,
                            },
                            pos,
                        );
                    }
                }
                Some(TokenKind::LeftBracket) => {
                    self.pos += 1;
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RightBracket)?;
                    let start = expr.pos;
                    expr = Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        start,
                    );
                }
                Some(kind @ (TokenKind::PlusPlus | TokenKind::MinusMinus)) => {
                    if !is_assignable(&expr) {
                        return Err(ParserError::at(
                            ParserErrorKind::Custom(
                                "unexpected type: required variable".to_string(),
                            ),
                            expr.pos,
                        ));
                    }
                    self.pos += 1;
                    let start = expr.pos;
                    expr = Expr::new(
                        ExprKind::IncDec {
                            target: Box::new(expr),
                            increment: kind == TokenKind::PlusPlus,
                            prefix: false,
                        },
                        start,
                    );
                }
                Some(TokenKind::ColonColon) => return Err(self.unsupported("method reference")),
                _ => return Ok(expr),
            }
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let pos = self.here();
        let Some(token) = self.peek().cloned() else {
            return Err(ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput));
        };
        let kind = match token.kind {
            TokenKind::IntLiteral => {
                self.pos += 1;
                match token.text.parse::<i32>() {
                    Ok(value) => ExprKind::Int(value),
                    Err(_) => {
                        return Err(ParserError::at(
                            ParserErrorKind::IntegerTooLarge(token.text),
                            pos,
                        ))
                    }
                }
            }
            TokenKind::LongLiteral => {
                self.pos += 1;
                match token.text.parse::<i64>() {
                    Ok(value) => ExprKind::Long(value),
                    Err(_) => {
                        return Err(ParserError::at(
                            ParserErrorKind::IntegerTooLarge(token.text),
                            pos,
                        ))
                    }
                }
            }
            TokenKind::DoubleLiteral => {
                self.pos += 1;
                match token.text.parse::<f64>() {
                    Ok(value) => ExprKind::Double(value),
                    Err(_) => {
                        return Err(ParserError::at(
                            ParserErrorKind::InvalidNumberFormat(token.text),
                            pos,
                        ))
                    }
                }
            }
            TokenKind::CharLiteral => {
                self.pos += 1;
                ExprKind::Char(token.text.chars().next().unwrap_or('\0'))
            }
            TokenKind::StringLiteral => {
                self.pos += 1;
                ExprKind::Str(token.text)
            }
            TokenKind::True => {
                self.pos += 1;
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.pos += 1;
                ExprKind::Bool(false)
            }
            TokenKind::Null => {
                self.pos += 1;
                ExprKind::Null
            }
            TokenKind::This => {
                self.pos += 1;
                if self.check(TokenKind::LeftParen) {
                    return Err(self.unsupported("constructor chaining (this(...))"));
                }
                ExprKind::This
            }
            TokenKind::Super => return Err(self.unsupported("super")),
            TokenKind::Switch => return Err(self.unsupported("switch")),
            TokenKind::LeftParen => {
                self.pos += 1;
                if self.check(TokenKind::RightParen)
                    || (self.check(TokenKind::Identifier)
                        && matches!(
                            self.peek_kind_at(1),
                            Some(TokenKind::Comma)
                        ))
                {
                    return Err(self.unsupported("lambda expression"));
                }
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                if self.check(TokenKind::Arrow) {
                    return Err(self.unsupported("lambda expression"));
                }
                return Ok(inner);
            }
            TokenKind::New => return self.parse_new(),
            TokenKind::Identifier => {
                self.pos += 1;
                if self.check(TokenKind::Arrow) {
                    return Err(self.unsupported("lambda expression"));
                }
                if self.check(TokenKind::LeftParen) {
                    let args = self.parse_arguments()?;
                    ExprKind::Call {
                        target: None,
                        name: token.text,
                        args,
                    }
                } else {
                    ExprKind::Name(token.text)
                }
            }
            _ => {
                return Err(self.error_here(ParserErrorKind::Custom(format!(
                    "illegal start of expression: '{}'",
                    token.display_text()
                ))))
            }
        };
        Ok(Expr::new(kind, pos))
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        let pos = self.here();
        self.expect(TokenKind::New)?;

        let base_pos = self.here();
        let base = match self.peek() {
            Some(token) if token.kind.is_primitive() => {
                let name = token.kind.describe().to_string();
                self.pos += 1;
                name
            }
            Some(token) if token.kind == TokenKind::Identifier => {
                let name = self.qualified_name()?;
                if self.check(TokenKind::Less) && !self.skip_type_arguments() {
                    return Err(self.unexpected(&[">"]));
                }
                name
            }
            _ => {
                return Err(self.error_here(ParserErrorKind::ExpectedIdentifier {
                    found: self.found_text(),
                }))
            }
        };

        if self.check(TokenKind::LeftBracket) {
            let mut dims = Vec::new();
            let mut rank = 0;
            while self.match_token(TokenKind::LeftBracket) {
                rank += 1;
                if self.match_token(TokenKind::RightBracket) {
                    continue;
                }
                if rank > dims.len() + 1 {
                    return Err(self.unexpected(&["]"]));
                }
                dims.push(self.parse_expression()?);
                self.expect(TokenKind::RightBracket)?;
            }
            let ty = TypeExpr::new(base, rank, base_pos);
            if dims.is_empty() {
                if !self.check(TokenKind::LeftBrace) {
                    return Err(self.error_here(ParserErrorKind::Custom(
                        "array dimension missing".to_string(),
                    )));
                }
                let mut literal = self.parse_array_literal(ty)?;
                literal.pos = pos;
                return Ok(literal);
            }
            return Ok(Expr::new(ExprKind::NewArray { ty, dims }, pos));
        }

        let args = self.parse_arguments()?;
        if self.check(TokenKind::LeftBrace) {
            return Err(self.unsupported("anonymous class"));
        }
        Ok(Expr::new(
            ExprKind::New {
                class: TypeExpr::new(base, 0, base_pos),
                args,
            },
            pos,
        ))
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Name(_) | ExprKind::Field { .. } | ExprKind::Index { .. }
    )
}

fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::EqualEqual => (BinaryOp::Eq, 3),
        TokenKind::BangEqual => (BinaryOp::Ne, 3),
        TokenKind::Less => (BinaryOp::Lt, 4),
        TokenKind::LessEqual => (BinaryOp::Le, 4),
        TokenKind::Greater => (BinaryOp::Gt, 4),
        TokenKind::GreaterEqual => (BinaryOp::Ge, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Slash => (BinaryOp::Div, 6),
        TokenKind::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    };
    Some(entry)
}
