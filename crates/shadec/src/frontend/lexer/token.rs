//! Token definitions for the shader lexer

use crate::common::Span;
use crate::types::Type;
use logos::Logos;

/// Token with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum TokenKind {
    // === Type keywords ===
    #[token("void")]
    Void,
    #[token("int")]
    Int,
    #[token("float")]
    Float,
    #[token("bool")]
    Bool,
    #[token("vec2")]
    Vec2,
    #[token("vec3")]
    Vec3,
    #[token("vec4")]
    Vec4,
    #[token("mat2")]
    Mat2,
    #[token("mat3")]
    Mat3,
    #[token("mat4")]
    Mat4,

    // === Qualifiers ===
    #[token("in")]
    In,
    #[token("out")]
    Out,
    #[token("const")]
    Const,
    #[token("uniform")]
    Uniform,

    // === Statement keywords ===
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,

    // === Literals ===
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLiteral(i64),

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fF]?", priority = 3, callback = parse_float)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fF]?", priority = 2, callback = parse_float)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fF]?", priority = 1, callback = parse_float)]
    FloatLiteral(f64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,

    // === Punctuation ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,

    Eof,
}

fn parse_float(lex: &mut logos::Lexer<TokenKind>) -> Option<f64> {
    lex.slice().trim_end_matches(['f', 'F']).parse().ok()
}

impl TokenKind {
    /// Source type named by a type keyword
    pub fn as_type(&self) -> Option<Type> {
        match self {
            TokenKind::Void => Some(Type::Void),
            TokenKind::Int => Some(Type::Int),
            TokenKind::Float => Some(Type::Float),
            TokenKind::Bool => Some(Type::Bool),
            TokenKind::Vec2 => Some(Type::Vec2),
            TokenKind::Vec3 => Some(Type::Vec3),
            TokenKind::Vec4 => Some(Type::Vec4),
            TokenKind::Mat2 => Some(Type::Mat2),
            TokenKind::Mat3 => Some(Type::Mat3),
            TokenKind::Mat4 => Some(Type::Mat4),
            _ => None,
        }
    }

    pub fn is_type_specifier(&self) -> bool {
        self.as_type().is_some()
    }

    pub fn is_type_qualifier(&self) -> bool {
        matches!(
            self,
            TokenKind::In | TokenKind::Out | TokenKind::Const | TokenKind::Uniform
        )
    }

    /// Whether a declaration starts at this token
    pub fn can_start_declaration(&self) -> bool {
        self.is_type_specifier() || self.is_type_qualifier()
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ty) = self.as_type() {
            return write!(f, "'{}'", ty);
        }
        let s = match self {
            TokenKind::In => "'in'",
            TokenKind::Out => "'out'",
            TokenKind::Const => "'const'",
            TokenKind::Uniform => "'uniform'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::For => "'for'",
            TokenKind::Switch => "'switch'",
            TokenKind::Case => "'case'",
            TokenKind::Default => "'default'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Return => "'return'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::IntLiteral(n) => return write!(f, "integer '{}'", n),
            TokenKind::FloatLiteral(x) => return write!(f, "float '{}'", x),
            TokenKind::Identifier(name) => return write!(f, "identifier '{}'", name),
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::LtEq => "'<='",
            TokenKind::GtEq => "'>='",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::PipePipe => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Eq => "'='",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Semi => "';'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Colon => "':'",
            TokenKind::Question => "'?'",
            TokenKind::Eof => "end of file",
            TokenKind::Void
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Bool
            | TokenKind::Vec2
            | TokenKind::Vec3
            | TokenKind::Vec4
            | TokenKind::Mat2
            | TokenKind::Mat3
            | TokenKind::Mat4 => "type",
        };
        write!(f, "{}", s)
    }
}
