use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Symbol,
    String,
    Number,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Colon,
    Semicolon,
    Comma,
    Equals,
    Dot,
    Hash,
    Dollar,
    At,
    Newline,
    LineComment,
    BlockComment,
    Undefined,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Symbol => "SYMBOL",
            TokenKind::String => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::OpenBrace => "OPEN_BRACE",
            TokenKind::CloseBrace => "CLOSE_BRACE",
            TokenKind::OpenBracket => "OPEN_BRACKET",
            TokenKind::CloseBracket => "CLOSE_BRACKET",
            TokenKind::OpenParen => "OPEN_PAREN",
            TokenKind::CloseParen => "CLOSE_PAREN",
            TokenKind::Colon => "COLON",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Equals => "EQUALS",
            TokenKind::Dot => "DOT",
            TokenKind::Hash => "HASH",
            TokenKind::Dollar => "DOLLAR",
            TokenKind::At => "AT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::LineComment => "LINE_COMMENT",
            TokenKind::BlockComment => "BLOCK_COMMENT",
            TokenKind::Undefined => "UNDEFINED",
            TokenKind::Eof => "EOF",
        };
        f.write_str(s)
    }
}

/// A lexical token. `text` holds the decoded value for strings, the raw text
/// for numbers and symbols, and the body (after `//`) for line comments.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_symbol(&self, text: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == text
    }

    /// A `///` comment, which documents the following shape or member.
    pub fn is_doc_comment(&self) -> bool {
        self.kind == TokenKind::LineComment && self.text.starts_with('/')
    }
}

/// Streams tokens out of IDL source. Lexical errors do not stop the scan: an
/// `UNDEFINED` token carrying the problem is emitted and scanning resumes.
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            done: false,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next()
    }

    fn token(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn next_token(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' || c == '\u{feff}' {
                self.bump();
            } else {
                break;
            }
        }
        let (line, column) = (self.line, self.column);
        let Some(c) = self.bump() else {
            return Self::token(TokenKind::Eof, "", line, column);
        };
        let punct = |kind| Self::token(kind, c.to_string(), line, column);
        match c {
            '\n' => punct(TokenKind::Newline),
            '{' => punct(TokenKind::OpenBrace),
            '}' => punct(TokenKind::CloseBrace),
            '[' => punct(TokenKind::OpenBracket),
            ']' => punct(TokenKind::CloseBracket),
            '(' => punct(TokenKind::OpenParen),
            ')' => punct(TokenKind::CloseParen),
            ':' => punct(TokenKind::Colon),
            ';' => punct(TokenKind::Semicolon),
            ',' => punct(TokenKind::Comma),
            '=' => punct(TokenKind::Equals),
            '.' => punct(TokenKind::Dot),
            '#' => punct(TokenKind::Hash),
            '$' => punct(TokenKind::Dollar),
            '@' => punct(TokenKind::At),
            '"' => self.scan_string(line, column),
            '/' => self.scan_comment(line, column),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = c.to_string();
                while let Some(n) = self.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        text.push(n);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Self::token(TokenKind::Symbol, text, line, column)
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => self.scan_number(c, line, column),
            other => Self::token(
                TokenKind::Undefined,
                format!("unexpected character {other:?}"),
                line,
                column,
            ),
        }
    }

    fn scan_number(&mut self, first: char, line: usize, column: usize) -> Token {
        let mut text = first.to_string();
        if (first == '-' || first == '+') && !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Self::token(
                TokenKind::Undefined,
                format!("dangling sign {first:?}"),
                line,
                column,
            );
        }
        self.take_digits(&mut text);
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.bump();
            self.take_digits(&mut text);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            text.push('e');
            self.bump();
            if let Some(sign @ ('-' | '+')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            self.take_digits(&mut text);
        }
        Self::token(TokenKind::Number, text, line, column)
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(d) = self.peek() {
            if d.is_ascii_digit() {
                text.push(d);
                self.bump();
            } else {
                break;
            }
        }
    }

    fn scan_comment(&mut self, line: usize, column: usize) -> Token {
        match self.peek() {
            Some('/') => {
                self.bump();
                let mut text = String::new();
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
                Self::token(TokenKind::LineComment, text.trim_end_matches('\r'), line, column)
            }
            Some('*') => {
                self.bump();
                let mut text = String::new();
                loop {
                    match self.bump() {
                        Some('*') if self.peek() == Some('/') => {
                            self.bump();
                            return Self::token(TokenKind::BlockComment, text, line, column);
                        }
                        Some(c) => text.push(c),
                        None => {
                            return Self::token(
                                TokenKind::Undefined,
                                "unterminated block comment",
                                line,
                                column,
                            );
                        }
                    }
                }
            }
            _ => Self::token(TokenKind::Undefined, "unexpected character '/'", line, column),
        }
    }

    fn scan_string(&mut self, line: usize, column: usize) -> Token {
        if self.peek() == Some('"') && self.peek_second() == Some('"') {
            self.bump();
            self.bump();
            return self.scan_text_block(line, column);
        }
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Self::token(TokenKind::Undefined, "unterminated string", line, column);
                }
                Some('"') => return Self::token(TokenKind::String, text, line, column),
                Some('\\') => match self.scan_escape() {
                    Ok(c) => text.push(c),
                    Err(msg) => return Self::token(TokenKind::Undefined, msg, line, column),
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn scan_escape(&mut self) -> Result<char, String> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('/') => Ok('/'),
            Some('u') => {
                let mut hex = String::new();
                for _ in 0..4 {
                    match self.bump() {
                        Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                        _ => return Err("bad \\u escape".to_string()),
                    }
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("bad \\u escape: {hex}"))
            }
            Some(other) => Err(format!("unknown escape \\{other}")),
            None => Err("unterminated string".to_string()),
        }
    }

    /// `"""` text block: the content starts on the next line and loses the
    /// indentation common to all non-blank lines.
    fn scan_text_block(&mut self, line: usize, column: usize) -> Token {
        let mut raw = String::new();
        loop {
            match self.bump() {
                None => {
                    return Self::token(TokenKind::Undefined, "unterminated text block", line, column);
                }
                Some('"') if self.peek() == Some('"') && self.peek_second() == Some('"') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some('\\') => match self.scan_escape() {
                    Ok(c) => raw.push(c),
                    Err(msg) => return Self::token(TokenKind::Undefined, msg, line, column),
                },
                Some(c) => raw.push(c),
            }
        }
        Self::token(TokenKind::String, dedent_text_block(&raw), line, column)
    }
}

/// Width of a line's indentation in characters.
fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn dedent_text_block(raw: &str) -> String {
    let body = raw.strip_prefix('\n').unwrap_or(raw);
    let lines: Vec<&str> = body.split('\n').collect();
    let indent = lines
        .iter()
        .enumerate()
        .filter(|(i, l)| !l.trim().is_empty() || *i == lines.len() - 1)
        .map(|(_, l)| leading_whitespace(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            let cut = indent.min(leading_whitespace(l));
            let start = l.char_indices().nth(cut).map_or(l.len(), |(i, _)| i);
            l[start..].trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields every token including the final `EOF`, then stops.
    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let tok = self.next_token();
        if tok.kind == TokenKind::Eof {
            self.done = true;
        }
        Some(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation_and_symbols() {
        assert_eq!(
            kinds("structure Foo {}\n"),
            vec![
                TokenKind::Symbol,
                TokenKind::Symbol,
                TokenKind::OpenBrace,
                TokenKind::CloseBrace,
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers_keep_raw_text() {
        let toks: Vec<Token> = Scanner::new("-12 3.50 1e-3").collect();
        assert_eq!(toks[0].text, "-12");
        assert_eq!(toks[1].text, "3.50");
        assert_eq!(toks[2].text, "1e-3");
        assert!(toks[..3].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_string_escapes() {
        let tok = Scanner::new(r#""a\n\"b\" A""#).next_token();
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(tok.text, "a\n\"b\" A");
    }

    #[test]
    fn test_unterminated_string_is_undefined() {
        let toks: Vec<Token> = Scanner::new("\n\"abc\nx").collect();
        assert_eq!(toks[1].kind, TokenKind::Undefined);
        assert_eq!(toks[1].line, 2);
    }

    #[test]
    fn test_comments() {
        let toks: Vec<Token> = Scanner::new("// plain\n/// doc\n/* block */").collect();
        assert_eq!(toks[0].kind, TokenKind::LineComment);
        assert!(!toks[0].is_doc_comment());
        assert_eq!(toks[2].text, "/ doc");
        assert!(toks[2].is_doc_comment());
        assert_eq!(toks[4].kind, TokenKind::BlockComment);
        assert_eq!(toks[4].text, " block ");
    }

    #[test]
    fn test_line_and_column() {
        let toks: Vec<Token> = Scanner::new("a\n  bc").collect();
        assert_eq!((toks[2].line, toks[2].column), (2, 3));
    }

    #[test]
    fn test_text_block() {
        let tok = Scanner::new("\"\"\"\n    Hello\n      World\n    \"\"\"").next_token();
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(tok.text, "Hello\n  World\n");
    }

    #[test]
    fn test_text_block_with_wide_indent() {
        let tok = Scanner::new("\"\"\"\n  a\n\u{3000}\u{3000}b\n  \"\"\"").next_token();
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(tok.text, "a\nb\n");
    }
}
