//! Lexer implementation using logos

use super::token::{Token, TokenKind};
use crate::common::{CompileError, CompileResult, Span};
use logos::Logos;

/// Lexer for shader source code
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    peeked: Option<Token>,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            peeked: None,
            at_eof: false,
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> CompileResult<Token> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }

        if self.at_eof {
            let len = self.inner.source().len();
            return Ok(Token::new(TokenKind::Eof, Span::new(len, len)));
        }

        match self.inner.next() {
            Some(Ok(kind)) => Ok(Token::new(kind, self.inner.span().into())),
            Some(Err(())) => Err(CompileError::lexer(
                format!("unexpected input '{}'", self.inner.slice()),
                self.inner.span().into(),
            )),
            None => {
                self.at_eof = true;
                let len = self.inner.source().len();
                Ok(Token::new(TokenKind::Eof, Span::new(len, len)))
            }
        }
    }

    /// Peek at the next token without consuming it
    pub fn peek(&mut self) -> CompileResult<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Tokenize the entire source, ending with `Eof`
    pub fn tokenize_all(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    pub fn source(&self) -> &'a str {
        self.inner.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize_all()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_type_keywords() {
        assert_eq!(
            kinds("int float bool vec3 mat4 void"),
            vec![
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Bool,
                TokenKind::Vec3,
                TokenKind::Mat4,
                TokenKind::Void,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_not_keywords() {
        let mut lexer = Lexer::new("vec3x input _tmp");
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Identifier(s) if s == "vec3x"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Identifier(s) if s == "input"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Identifier(s) if s == "_tmp"));
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(
            kinds("42 1.5 2. .25 1e2"),
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::FloatLiteral(1.5),
                TokenKind::FloatLiteral(2.0),
                TokenKind::FloatLiteral(0.25),
                TokenKind::FloatLiteral(100.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_swizzle_tokens() {
        assert_eq!(
            kinds("v.xy"),
            vec![
                TokenKind::Identifier("v".into()),
                TokenKind::Dot,
                TokenKind::Identifier("xy".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("++ += <= && || ! ? :"),
            vec![
                TokenKind::PlusPlus,
                TokenKind::PlusEq,
                TokenKind::LtEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::Bang,
                TokenKind::Question,
                TokenKind::Colon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("int // line\n /* block */ x"),
            vec![TokenKind::Int, TokenKind::Identifier("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new("a b");
        assert!(matches!(&lexer.peek().unwrap().kind, TokenKind::Identifier(s) if s == "a"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Identifier(s) if s == "a"));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Identifier(s) if s == "b"));
    }

    #[test]
    fn test_invalid_character() {
        let mut lexer = Lexer::new("@");
        assert!(matches!(lexer.next_token(), Err(CompileError::Lexer { .. })));
    }
}
