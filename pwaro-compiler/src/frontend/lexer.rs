use logos::Logos;
use std::fmt;
use tracing::trace;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")] // Whitespace
#[logos(skip r"//[^\n]*")] // Line comments
pub enum TokenKind {
    // --- Operators ---
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("=")]
    Assign,

    // --- Punctuation ---
    #[token(";")]
    Semi,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // --- Keywords ---
    #[token("var")]
    Var,
    #[token("fn")]
    Fn,
    #[token("print")]
    Print,
    #[token("prototype")]
    Prototype,

    // --- Integer widths ---
    #[token("i8")]
    I8,
    #[token("i16")]
    I16,
    #[token("i32")]
    I32,
    #[token("i64")]
    I64,

    // --- Literals and names ---
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    /// Produced once input is exhausted, and on every call after that.
    Eof,
    /// Any text the lexer could not classify.
    Unknown,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Assign => "'='",
            TokenKind::Semi => "';'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Var => "'var'",
            TokenKind::Fn => "'fn'",
            TokenKind::Print => "'print'",
            TokenKind::Prototype => "'prototype'",
            TokenKind::I8 => "'i8'",
            TokenKind::I16 => "'i16'",
            TokenKind::I32 => "'i32'",
            TokenKind::I64 => "'i64'",
            TokenKind::Number => "number",
            TokenKind::Ident => "identifier",
            TokenKind::Eof => "end of input",
            TokenKind::Unknown => "unknown token",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based source line of the first byte of the token.
    pub line: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Byte offset to line lookup, built once per source.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                starts.push(i + 1);
            }
        }
        Self {
            line_starts: starts,
        }
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(insert_pos) => insert_pos,
        }
    }
}

/// Pull-based tokenizer. Never rewinds; after the last token it keeps
/// returning `Eof`.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, TokenKind>,
    lines: LineIndex,
    eof_line: usize,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        let lines = LineIndex::new(source);
        let eof_line = lines.line_of(source.len());
        Self {
            inner: TokenKind::lexer(source),
            lines,
            eof_line,
        }
    }

    pub fn next_token(&mut self) -> Token {
        let Some(result) = self.inner.next() else {
            return Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line: self.eof_line,
            };
        };
        let kind = result.unwrap_or(TokenKind::Unknown);
        let line = self.lines.line_of(self.inner.span().start);
        let text = self.inner.slice().to_string();
        trace!(?kind, %text, line, "token");
        Token { kind, text, line }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

/// Lex the whole source. The result always ends with exactly one `Eof`.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.is(TokenKind::Eof);
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}
