//! Recursive descent parser for the shader language

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Lexer, Token, TokenKind};
use crate::types::Type;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// Span of the most recently consumed token
    previous: Span,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> CompileResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            previous: Span::default(),
        })
    }

    /// Parse a complete program
    pub fn parse(&mut self) -> CompileResult<Program> {
        let mut decls = Vec::new();
        while !self.at_end() {
            decls.push(self.parse_top_level()?);
        }
        Ok(Program::new(decls))
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> CompileResult<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        self.previous = prev.span;
        Ok(prev)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> CompileResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.check(&kind) {
            self.advance()
        } else {
            Err(self.error(format!("expected {}, found {}", kind, self.current.kind)))
        }
    }

    fn expect_identifier(&mut self) -> CompileResult<Identifier> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(Identifier::new(name, token.span)),
            other => Err(CompileError::parser(
                format!("expected identifier, found {}", other),
                token.span,
            )),
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::parser(message, self.current.span)
    }

    /// Span from `start` to the end of the last consumed token
    fn span_from(&self, start: Span) -> Span {
        start.merge(self.previous)
    }

    /// A type keyword followed by `(` starts a constructor, not a declaration
    fn at_declaration(&mut self) -> CompileResult<bool> {
        if self.current.kind.is_type_qualifier() {
            return Ok(true);
        }
        if !self.current.kind.is_type_specifier() {
            return Ok(false);
        }
        Ok(!matches!(self.lexer.peek()?.kind, TokenKind::LParen))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_top_level(&mut self) -> CompileResult<Decl> {
        let start = self.current.span;
        let qualifier = self.parse_qualifier()?;
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;

        if self.check(&TokenKind::LParen) {
            if qualifier.is_some() {
                return Err(CompileError::parser("functions cannot be qualified", start));
            }
            let func = self.parse_function_rest(name, ty, start)?;
            let span = func.span;
            return Ok(Decl::new(DeclKind::Func(func), span));
        }

        let var = self.parse_var_rest(qualifier, ty, name, start)?;
        let span = var.span;
        Ok(Decl::new(DeclKind::Var(var), span))
    }

    fn parse_qualifier(&mut self) -> CompileResult<Option<TypeQualifier>> {
        let qualifier = match self.current.kind {
            TokenKind::In => TypeQualifier::In,
            TokenKind::Out => TypeQualifier::Out,
            TokenKind::Const => TypeQualifier::Const,
            TokenKind::Uniform => TypeQualifier::Uniform,
            _ => return Ok(None),
        };
        self.advance()?;
        Ok(Some(qualifier))
    }

    fn parse_type(&mut self) -> CompileResult<Type> {
        match self.current.kind.as_type() {
            Some(ty) => {
                self.advance()?;
                Ok(ty)
            }
            None => Err(self.error(format!("expected type, found {}", self.current.kind))),
        }
    }

    /// Optional `[N]` suffix turning `ty` into an array type
    fn parse_array_suffix(&mut self, ty: Type) -> CompileResult<Type> {
        if !self.match_token(&TokenKind::LBracket)? {
            return Ok(ty);
        }
        let token = self.advance()?;
        let len = match token.kind {
            TokenKind::IntLiteral(n) if n > 0 => n as usize,
            other => {
                return Err(CompileError::parser(
                    format!("expected positive array length, found {}", other),
                    token.span,
                ));
            }
        };
        self.expect(TokenKind::RBracket)?;
        Ok(Type::array(ty, len))
    }

    /// Everything after `qualifier? type name` of a variable declaration
    fn parse_var_rest(
        &mut self,
        qualifier: Option<TypeQualifier>,
        ty: Type,
        name: Identifier,
        start: Span,
    ) -> CompileResult<VarDecl> {
        let ty = self.parse_array_suffix(ty)?;
        let init = if self.match_token(&TokenKind::Eq)? {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;

        let mut var = VarDecl::new(name, ty, self.span_from(start));
        if let Some(qualifier) = qualifier {
            var = var.with_qualifier(qualifier);
        }
        if let Some(init) = init {
            var = var.with_init(init);
        }
        Ok(var)
    }

    fn parse_var_decl(&mut self) -> CompileResult<VarDecl> {
        let start = self.current.span;
        let qualifier = self.parse_qualifier()?;
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        self.parse_var_rest(qualifier, ty, name, start)
    }

    fn parse_function_rest(&mut self, name: Identifier, return_type: Type, start: Span) -> CompileResult<FnDecl> {
        self.expect(TokenKind::LParen)?;
        let mut formals = Vec::new();
        if !self.check(&TokenKind::RParen) {
            // `f(void)` declares no formals
            if self.check(&TokenKind::Void) && matches!(self.lexer.peek()?.kind, TokenKind::RParen) {
                self.advance()?;
            } else {
                loop {
                    formals.push(self.parse_formal()?);
                    if !self.match_token(&TokenKind::Comma)? {
                        break;
                    }
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        Ok(FnDecl::new(name, return_type, formals, body, self.span_from(start)))
    }

    fn parse_formal(&mut self) -> CompileResult<VarDecl> {
        let start = self.current.span;
        let qualifier = self.parse_qualifier()?;
        let ty = self.parse_type()?;
        let name = self.expect_identifier()?;
        let ty = self.parse_array_suffix(ty)?;

        let mut formal = VarDecl::new(name, ty, self.span_from(start));
        if let Some(qualifier) = qualifier {
            formal = formal.with_qualifier(qualifier);
        }
        Ok(formal)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> CompileResult<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error("unterminated block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Block::new(stmts, self.span_from(start)))
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let start = self.current.span;

        if self.at_declaration()? {
            let var = self.parse_var_decl()?;
            let span = var.span;
            return Ok(Stmt::new(StmtKind::Decl(var), span));
        }

        let kind = match self.current.kind {
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Semi => {
                self.advance()?;
                StmtKind::Empty
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Switch => self.parse_switch()?,
            TokenKind::Break => {
                self.advance()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Continue
            }
            TokenKind::Return => {
                self.advance()?;
                let value = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semi)?;
                StmtKind::Return(value)
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semi)?;
                StmtKind::Expr(expr)
            }
        };

        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_if(&mut self) -> CompileResult<StmtKind> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.match_token(&TokenKind::Else)? {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> CompileResult<StmtKind> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let test = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(StmtKind::While { test, body })
    }

    fn parse_for(&mut self) -> CompileResult<StmtKind> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        let init = if self.match_token(&TokenKind::Semi)? {
            None
        } else if self.at_declaration()? {
            Some(ForInit::Decl(self.parse_var_decl()?))
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semi)?;
            Some(ForInit::Expr(expr))
        };

        let test = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi)?;

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RParen)?;

        let body = Box::new(self.parse_stmt()?);
        Ok(StmtKind::For {
            init,
            test,
            step,
            body,
        })
    }

    fn parse_switch(&mut self) -> CompileResult<StmtKind> {
        self.expect(TokenKind::Switch)?;
        self.expect(TokenKind::LParen)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;

        let mut arms = Vec::new();
        while !self.match_token(&TokenKind::RBrace)? {
            let start = self.current.span;
            let label = match self.current.kind {
                TokenKind::Case => {
                    self.advance()?;
                    Some(self.parse_expr()?)
                }
                TokenKind::Default => {
                    self.advance()?;
                    None
                }
                _ => {
                    return Err(self.error(format!(
                        "expected 'case' or 'default', found {}",
                        self.current.kind
                    )));
                }
            };
            self.expect(TokenKind::Colon)?;

            let mut body = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                body.push(self.parse_stmt()?);
            }

            arms.push(SwitchArm {
                label,
                body,
                span: self.span_from(start),
            });
        }

        Ok(StmtKind::Switch { value, arms })
    }

    // =========================================================================
    // Expressions (lowest to highest precedence)
    // =========================================================================

    pub fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> CompileResult<Expr> {
        let target = self.parse_conditional()?;

        let op = match self.current.kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            _ => return Ok(target),
        };
        self.advance()?;

        let value = self.parse_assignment()?;
        let span = target.span.merge(value.span);
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    fn parse_conditional(&mut self) -> CompileResult<Expr> {
        let test = self.parse_binary(0)?;
        if !self.match_token(&TokenKind::Question)? {
            return Ok(test);
        }
        let then_expr = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let else_expr = self.parse_conditional()?;
        let span = test.span.merge(else_expr.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// Binary operator and its precedence level (higher binds tighter)
    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let op = match self.current.kind {
            TokenKind::PipePipe => (BinaryOp::Or, 0),
            TokenKind::AmpAmp => (BinaryOp::And, 1),
            TokenKind::EqEq => (BinaryOp::Eq, 2),
            TokenKind::NotEq => (BinaryOp::Ne, 2),
            TokenKind::Lt => (BinaryOp::Lt, 3),
            TokenKind::LtEq => (BinaryOp::Le, 3),
            TokenKind::Gt => (BinaryOp::Gt, 3),
            TokenKind::GtEq => (BinaryOp::Ge, 3),
            TokenKind::Plus => (BinaryOp::Add, 4),
            TokenKind::Minus => (BinaryOp::Sub, 4),
            TokenKind::Star => (BinaryOp::Mul, 5),
            TokenKind::Slash => (BinaryOp::Div, 5),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over left-associative binary operators
    fn parse_binary(&mut self, min_level: u8) -> CompileResult<Expr> {
        let mut left = self.parse_unary()?;

        while let Some((op, level)) = self.binary_op() {
            if level < min_level {
                break;
            }
            self.advance()?;
            let right = self.parse_binary(level + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> CompileResult<Expr> {
        let op = match self.current.kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::PlusPlus => UnaryOp::Inc,
            TokenKind::MinusMinus => UnaryOp::Dec,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.advance()?.span;
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current.kind {
                TokenKind::LBracket => {
                    self.advance()?;
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    let span = self.span_from(expr.span);
                    expr = Expr::new(
                        ExprKind::ArrayAccess {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance()?;
                    let field = self.expect_identifier()?;
                    let span = expr.span.merge(field.span);
                    expr = Expr::new(
                        ExprKind::FieldAccess {
                            base: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if matches!(self.current.kind, TokenKind::PlusPlus) {
                        PostfixOp::Inc
                    } else {
                        PostfixOp::Dec
                    };
                    self.advance()?;
                    let span = self.span_from(expr.span);
                    expr = Expr::new(
                        ExprKind::Postfix {
                            op,
                            operand: Box::new(expr),
                        },
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_args(&mut self) -> CompileResult<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;

        if let Some(ty) = self.current.kind.as_type() {
            self.advance()?;
            let args = self.parse_args()?;
            return Ok(Expr::new(ExprKind::Constructor { ty, args }, self.span_from(start)));
        }

        let token = self.advance()?;
        let kind = match token.kind {
            TokenKind::IntLiteral(n) => ExprKind::IntConst(n),
            TokenKind::FloatLiteral(x) => ExprKind::FloatConst(x),
            TokenKind::True => ExprKind::BoolConst(true),
            TokenKind::False => ExprKind::BoolConst(false),
            TokenKind::Identifier(name) => {
                let ident = Identifier::new(name, token.span);
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    ExprKind::Call { callee: ident, args }
                } else {
                    ExprKind::Var(ident)
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expr::new(inner.kind, self.span_from(start)));
            }
            other => {
                return Err(CompileError::parser(
                    format!("expected expression, found {}", other),
                    token.span,
                ));
            }
        };

        Ok(Expr::new(kind, self.span_from(start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_program(source: &str) -> Program {
        Parser::new(source).unwrap().parse().unwrap()
    }

    fn parse_expr(source: &str) -> Expr {
        Parser::new(source).unwrap().parse_expr().unwrap()
    }

    #[test]
    fn test_parse_global_and_function() {
        let program = parse_program("uniform vec3 light; float f(int a, vec2 b) { return 1.0; }");
        assert_eq!(program.decls.len(), 2);

        let DeclKind::Var(var) = &program.decls[0].kind else {
            panic!("expected variable declaration");
        };
        assert_eq!(var.name.name, "light");
        assert_eq!(var.ty, Type::Vec3);
        assert_eq!(var.qualifier, Some(TypeQualifier::Uniform));

        let DeclKind::Func(func) = &program.decls[1].kind else {
            panic!("expected function declaration");
        };
        assert_eq!(func.name.name, "f");
        assert_eq!(func.return_type, Type::Float);
        assert_eq!(func.formals.len(), 2);
        assert_eq!(func.formals[1].ty, Type::Vec2);
    }

    #[test]
    fn test_parse_array_declaration() {
        let program = parse_program("int a[4];");
        let DeclKind::Var(var) = &program.decls[0].kind else {
            panic!("expected variable declaration");
        };
        assert_eq!(var.ty, Type::array(Type::Int, 4));
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let ExprKind::Binary { op: BinaryOp::Add, right, .. } = expr.kind else {
            panic!("expected addition at the root");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_expr("a - b - c");
        let ExprKind::Binary { left, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn test_assignment_right_associative() {
        let expr = parse_expr("a = b = 1");
        let ExprKind::Assign { value, .. } = expr.kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value.kind, ExprKind::Assign { .. }));
    }

    #[test]
    fn test_swizzle_and_postfix() {
        let expr = parse_expr("v.xy++");
        let ExprKind::Postfix { op: PostfixOp::Inc, operand } = expr.kind else {
            panic!("expected postfix");
        };
        let ExprKind::FieldAccess { field, .. } = &operand.kind else {
            panic!("expected field access");
        };
        assert_eq!(field.name, "xy");
    }

    #[test]
    fn test_constructor_and_call() {
        let expr = parse_expr("vec3(1.0, f(x), 2)");
        let ExprKind::Constructor { ty, args } = expr.kind else {
            panic!("expected constructor");
        };
        assert_eq!(ty, Type::Vec3);
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[1].kind, ExprKind::Call { callee, args } if callee.name == "f" && args.len() == 1));
    }

    #[test]
    fn test_conditional() {
        let expr = parse_expr("a < b ? 1 : 2");
        assert!(matches!(expr.kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn test_constructor_statement_is_not_declaration() {
        let program = parse_program("void f() { vec2(1.0, 2.0); vec2 v; }");
        let DeclKind::Func(func) = &program.decls[0].kind else {
            panic!("expected function");
        };
        assert!(matches!(func.body.stmts[0].kind, StmtKind::Expr(_)));
        assert!(matches!(func.body.stmts[1].kind, StmtKind::Decl(_)));
    }

    #[test]
    fn test_parse_control_flow() {
        let program = parse_program(
            "void f() {
                int i;
                for (i = 0; i < 10; i++) { if (i == 3) continue; else break; }
                while (true) ;
                for (;;) { }
            }",
        );
        let DeclKind::Func(func) = &program.decls[0].kind else {
            panic!("expected function");
        };
        assert_eq!(func.body.stmts.len(), 4);
        assert!(matches!(
            &func.body.stmts[3].kind,
            StmtKind::For { init: None, test: None, step: None, .. }
        ));
    }

    #[test]
    fn test_parse_switch_arms() {
        let program = parse_program(
            "void f(int x) {
                switch (x) {
                    case 1: x = 2;
                    case -2: x = 3; break;
                    default: x = 4;
                }
            }",
        );
        let DeclKind::Func(func) = &program.decls[0].kind else {
            panic!("expected function");
        };
        let StmtKind::Switch { arms, .. } = &func.body.stmts[0].kind else {
            panic!("expected switch");
        };
        assert_eq!(arms.len(), 3);
        assert_eq!(arms[1].label.as_ref().and_then(Expr::const_int), Some(-2));
        assert_eq!(arms[1].body.len(), 2);
        assert!(arms[2].is_default());
    }

    #[test]
    fn test_for_with_declaration() {
        let program = parse_program("void f() { for (int i = 0; i < 3; i++) { } }");
        let DeclKind::Func(func) = &program.decls[0].kind else {
            panic!("expected function");
        };
        assert!(matches!(
            &func.body.stmts[0].kind,
            StmtKind::For { init: Some(ForInit::Decl(_)), .. }
        ));
    }

    #[test]
    fn test_syntax_error() {
        let err = Parser::new("int x = ;").unwrap().parse().unwrap_err();
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn test_spans_cover_expression() {
        let expr = parse_expr("abc + 12");
        assert_eq!(expr.span, Span::new(0, 8));
    }
}
