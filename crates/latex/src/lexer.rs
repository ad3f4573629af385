//! Tokenizer for LaTeX source.
//!
//! Produces a flat token stream with byte spans and line numbers. Comments are
//! dropped, math and verbatim bodies are captured whole, and overlay
//! specifications (`<2->`) after commands are discarded.

use forge_core::ParseError;
use std::ops::Range;

/// Environments whose bodies are taken literally.
const VERBATIM_ENVS: &[&str] = &["verbatim", "verbatim*", "lstlisting", "semiverbatim", "minted"];

/// Longest overlay specification we skip, in bytes.
const MAX_OVERLAY_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `\begin{name}`
    Begin(String),
    /// `\end{name}`
    End(String),
    /// `\name`, or a single-character control symbol such as `\%` or `\\`.
    Command(String),
    /// `$...$` or `\(...\)`
    InlineMath(String),
    /// `\[...\]` or `$$...$$`
    DisplayMath(String),
    /// Literal body of a verbatim-like environment.
    Verbatim { env: String, body: String },
    OpenGroup,
    CloseGroup,
    OpenBracket,
    CloseBracket,
    /// A blank line.
    ParBreak,
    /// Plain text; the content is the token's span.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    /// 1-based line where the token starts.
    pub line: usize,
}

/// Tokenize a complete source text.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        src: source,
        pos: 0,
        line: 1,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            let line = self.line;

            match c {
                '%' => self.skip_comment(),
                '\\' => self.lex_backslash()?,
                '$' => self.lex_dollar()?,
                '{' => self.single(TokenKind::OpenGroup),
                '}' => self.single(TokenKind::CloseGroup),
                '[' => self.single(TokenKind::OpenBracket),
                ']' => self.single(TokenKind::CloseBracket),
                '\n' if self.at_par_break() => {
                    while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                        self.bump();
                    }
                    self.push(TokenKind::ParBreak, start, line);
                }
                _ => self.lex_text(),
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Advance to byte offset `target`, keeping the line count.
    fn advance_to(&mut self, target: usize) {
        while self.pos < target && self.bump().is_some() {}
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        self.tokens.push(Token {
            kind,
            span: start..self.pos,
            line,
        });
    }

    fn single(&mut self, kind: TokenKind) {
        let (start, line) = (self.pos, self.line);
        self.bump();
        self.push(kind, start, line);
    }

    fn error(&self, line: usize, message: impl Into<String>) -> ParseError {
        ParseError::at_line(self.src, line, message)
    }

    fn at_par_break(&self) -> bool {
        self.src[self.pos + 1..]
            .trim_start_matches([' ', '\t', '\r'])
            .starts_with('\n')
    }

    fn skip_comment(&mut self) {
        while matches!(self.peek(), Some(c) if c != '\n') {
            self.bump();
        }
    }

    fn lex_text(&mut self) {
        let (start, line) = (self.pos, self.line);
        while let Some(c) = self.peek() {
            if matches!(c, '%' | '\\' | '$' | '{' | '}' | '[' | ']') {
                break;
            }
            if c == '\n' && self.pos > start && self.at_par_break() {
                break;
            }
            self.bump();
        }
        if self.pos > start {
            self.push(TokenKind::Text, start, line);
        }
    }

    fn lex_backslash(&mut self) -> Result<(), ParseError> {
        let (start, line) = (self.pos, self.line);
        self.bump();

        match self.peek() {
            None => self.push(TokenKind::Text, start, line),
            Some(c) if c.is_ascii_alphabetic() => {
                let name = self.read_name();
                match name.as_str() {
                    "begin" | "end" => self.lex_environment(&name, start, line)?,
                    _ => {
                        self.skip_overlay();
                        self.push(TokenKind::Command(name), start, line);
                    }
                }
            }
            Some('[') => {
                self.bump();
                let body = self.take_until("\\]", line, "unterminated display math \\[")?;
                self.push(TokenKind::DisplayMath(body), start, line);
            }
            Some('(') => {
                self.bump();
                let body = self.take_until("\\)", line, "unterminated inline math \\(")?;
                self.push(TokenKind::InlineMath(body), start, line);
            }
            Some(c) => {
                self.bump();
                self.push(TokenKind::Command(c.to_string()), start, line);
            }
        }
        Ok(())
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.bump();
        }
        if self.peek() == Some('*') {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    /// Drop an overlay specification such as `<2->` or `<+->`.
    fn skip_overlay(&mut self) {
        if self.peek() != Some('<') {
            return;
        }
        let rest = &self.src[self.pos..];
        if let Some(end) = rest.find('>') {
            if end <= MAX_OVERLAY_LEN && !rest[..end].contains('\n') {
                self.advance_to(self.pos + end + 1);
            }
        }
    }

    fn lex_environment(&mut self, keyword: &str, start: usize, line: usize) -> Result<(), ParseError> {
        let save = (self.pos, self.line);
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }

        let rest = &self.src[self.pos..];
        let close = match (rest.starts_with('{'), rest.find('}')) {
            (true, Some(close)) => close,
            _ => {
                // `\begin` without an argument: treat as an ordinary command.
                (self.pos, self.line) = save;
                self.push(TokenKind::Command(keyword.to_string()), start, line);
                return Ok(());
            }
        };
        let name = rest[1..close].trim().to_string();
        self.advance_to(self.pos + close + 1);

        if keyword == "end" {
            self.push(TokenKind::End(name), start, line);
            return Ok(());
        }

        if VERBATIM_ENVS.contains(&name.as_str()) {
            let terminator = format!("\\end{{{}}}", name);
            let message = format!("unterminated {} environment", name);
            let body = self.take_until(&terminator, line, message)?;
            self.push(
                TokenKind::Verbatim {
                    env: name,
                    body: strip_leading_options(&body).to_string(),
                },
                start,
                line,
            );
        } else {
            self.skip_overlay();
            self.push(TokenKind::Begin(name), start, line);
        }
        Ok(())
    }

    fn lex_dollar(&mut self) -> Result<(), ParseError> {
        let (start, line) = (self.pos, self.line);
        self.bump();

        if self.peek() == Some('$') {
            self.bump();
            let body = self.take_until("$$", line, "unterminated display math $$")?;
            self.push(TokenKind::DisplayMath(body), start, line);
            return Ok(());
        }

        let rest = &self.src[self.pos..];
        let mut escaped = false;
        let close = rest.char_indices().find_map(|(i, c)| {
            if escaped {
                escaped = false;
                None
            } else if c == '\\' {
                escaped = true;
                None
            } else {
                (c == '$').then_some(i)
            }
        });

        match close {
            Some(offset) => {
                let body = rest[..offset].to_string();
                self.advance_to(self.pos + offset + 1);
                self.push(TokenKind::InlineMath(body), start, line);
                Ok(())
            }
            None => Err(self.error(line, "unterminated inline math $")),
        }
    }

    /// Consume up to and including `terminator`, returning the text before it.
    fn take_until(
        &mut self,
        terminator: &str,
        line: usize,
        message: impl Into<String>,
    ) -> Result<String, ParseError> {
        let rest = &self.src[self.pos..];
        match rest.find(terminator) {
            Some(offset) => {
                let body = rest[..offset].to_string();
                self.advance_to(self.pos + offset + terminator.len());
                Ok(body)
            }
            None => Err(self.error(line, message)),
        }
    }
}

fn strip_leading_options(body: &str) -> &str {
    if body.starts_with('[') {
        if let Some(end) = body.find(']') {
            return &body[end + 1..];
        }
    }
    body
}
