//! Assembler for AVM bytecode.
//!
//! Source is a whitespace-separated sequence of tokens:
//!
//! | Token          | Emits                                        |
//! |----------------|----------------------------------------------|
//! | `42`, `-7`     | shortest integer literal                     |
//! | `'a'`          | integer literal of the byte value            |
//! | `"text"`       | `str8`/`str16` literal                       |
//! | `@name`        | `ref` with the hash of `name`                |
//! | `$name`        | `refval` with the hash of `name`             |
//! | `{ … }`        | code literal holding the enclosed program    |
//! | `add`, `dup` … | the opcode with that mnemonic                |
//!
//! `#` starts a comment running to the end of the line. Strings and
//! characters accept the escapes `\' \" \\ \r \n \t \0`. Names are
//! letters plus `_-.`, and a word must be followed by a blank, a comment, a
//! closing brace or the end of input.

use std::fmt;

use tracing::debug;

use crate::backend::bytecode::{CodeBuilder, Opcode, Vm};
use crate::backend::hash_utils::{murmur3_32, HashFn, DEFAULT_HASH_SEED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Int(i32),
    Str(Vec<u8>),
    /// `@name`
    Ref(String),
    /// `$name`
    RefVal(String),
    LBrace,
    RBrace,
    Op(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s.escape_ascii()),
            Token::Ref(name) => write!(f, "@{}", name),
            Token::RefVal(name) => write!(f, "${}", name),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Op(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmErrorKind {
    UnexpectedChar(char),
    UnterminatedString,
    UnterminatedChar,
    BadEscape(char),
    /// Character literal holding other than exactly one byte
    CharLength(usize),
    EmptyName,
    NumberOutOfRange(String),
    UnknownMnemonic(String),
    /// Mnemonic of an instruction whose operand only a literal can supply
    OperandRequired(String),
    StringTooLong(usize),
    UnexpectedClose,
    UnclosedBlock,
}

/// Assembly failure with the position where it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmError {
    pub line: usize,
    pub column: usize,
    pub kind: AsmErrorKind,
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: ", self.line, self.column)?;
        match &self.kind {
            AsmErrorKind::UnexpectedChar(c) => write!(f, "unexpected character {:?}", c),
            AsmErrorKind::UnterminatedString => write!(f, "unterminated string"),
            AsmErrorKind::UnterminatedChar => write!(f, "unterminated character literal"),
            AsmErrorKind::BadEscape(c) => write!(f, "unknown escape \\{}", c),
            AsmErrorKind::CharLength(n) => {
                write!(f, "character literal must hold one byte, found {}", n)
            }
            AsmErrorKind::EmptyName => write!(f, "reference needs a name"),
            AsmErrorKind::NumberOutOfRange(n) => write!(f, "number {} does not fit in 32 bits", n),
            AsmErrorKind::UnknownMnemonic(m) => write!(f, "unknown instruction '{}'", m),
            AsmErrorKind::OperandRequired(m) => {
                write!(f, "'{}' takes an inline operand; write a literal instead", m)
            }
            AsmErrorKind::StringTooLong(n) => {
                write!(f, "string of {} bytes exceeds the 65535 byte limit", n)
            }
            AsmErrorKind::UnexpectedClose => write!(f, "'}}' without matching '{{'"),
            AsmErrorKind::UnclosedBlock => write!(f, "'{{' is never closed"),
        }
    }
}

impl std::error::Error for AsmError {}

/// A token and where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Tokenizer for assembler source
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b'-' | b'.')
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn current(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.current()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn error(&self, kind: AsmErrorKind) -> AsmError {
        AsmError {
            line: self.line,
            column: self.column,
            kind,
        }
    }

    /// Words end at a blank, a comment, a closing brace or end of input
    fn expect_word_end(&self) -> Result<(), AsmError> {
        match self.current() {
            Some(b) if !is_blank(b) && b != b'#' && b != b'}' => {
                Err(self.error(AsmErrorKind::UnexpectedChar(b as char)))
            }
            _ => Ok(()),
        }
    }

    fn skip_blanks_and_comments(&mut self) {
        while let Some(b) = self.current() {
            if is_blank(b) {
                self.advance();
            } else if b == b'#' {
                while let Some(c) = self.advance() {
                    if c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_escape(&mut self, unterminated: AsmErrorKind) -> Result<u8, AsmError> {
        match self.advance() {
            Some(b'\'') => Ok(b'\''),
            Some(b'"') => Ok(b'"'),
            Some(b'\\') => Ok(b'\\'),
            Some(b'r') => Ok(b'\r'),
            Some(b'n') => Ok(b'\n'),
            Some(b't') => Ok(b'\t'),
            Some(b'0') => Ok(0),
            Some(other) => Err(self.error(AsmErrorKind::BadEscape(other as char))),
            None => Err(self.error(unterminated)),
        }
    }

    /// Bytes up to the closing `quote`, escapes resolved
    fn read_quoted(&mut self, quote: u8, unterminated: AsmErrorKind) -> Result<Vec<u8>, AsmError> {
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                Some(b) if b == quote => return Ok(bytes),
                Some(b'\\') => bytes.push(self.read_escape(unterminated.clone())?),
                Some(b) => bytes.push(b),
                None => return Err(self.error(unterminated)),
            }
        }
    }

    fn read_name(&mut self) -> Result<String, AsmError> {
        self.advance(); // sigil
        let start = self.pos;
        while self.current().is_some_and(is_name_byte) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.error(AsmErrorKind::EmptyName));
        }
        self.expect_word_end()?;
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn read_number(&mut self) -> Result<i32, AsmError> {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        if matches!(self.current(), Some(b'-' | b'+')) {
            self.advance();
        }
        while self.current().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        self.expect_word_end()?;
        let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        text.parse::<i32>().map_err(|_| AsmError {
            line,
            column,
            kind: AsmErrorKind::NumberOutOfRange(text.clone()),
        })
    }

    fn read_op(&mut self) -> Result<String, AsmError> {
        let start = self.pos;
        while self.current().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.advance();
        }
        self.expect_word_end()?;
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    /// Next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Spanned>, AsmError> {
        self.skip_blanks_and_comments();
        let (line, column) = (self.line, self.column);
        let Some(b) = self.current() else {
            return Ok(None);
        };

        let token = match b {
            b'{' => {
                self.advance();
                Token::LBrace
            }
            b'}' => {
                self.advance();
                Token::RBrace
            }
            b'"' => Token::Str(self.read_quoted(b'"', AsmErrorKind::UnterminatedString)?),
            b'\'' => {
                let bytes = self.read_quoted(b'\'', AsmErrorKind::UnterminatedChar)?;
                if bytes.len() != 1 {
                    return Err(AsmError {
                        line,
                        column,
                        kind: AsmErrorKind::CharLength(bytes.len()),
                    });
                }
                Token::Int(bytes[0] as i32)
            }
            b'@' => Token::Ref(self.read_name()?),
            b'$' => Token::RefVal(self.read_name()?),
            b'0'..=b'9' => Token::Int(self.read_number()?),
            b'-' | b'+' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                Token::Int(self.read_number()?)
            }
            b if b.is_ascii_alphabetic() => Token::Op(self.read_op()?),
            other => return Err(self.error(AsmErrorKind::UnexpectedChar(other as char))),
        };

        Ok(Some(Spanned {
            token,
            line,
            column,
        }))
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, AsmError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Compiles assembler source into bytecode, hashing reference names the same
/// way the target VM does.
#[derive(Debug, Clone, Copy)]
pub struct Assembler {
    hash_fn: HashFn,
    seed: u32,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::with_hash(murmur3_32, DEFAULT_HASH_SEED)
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash(hash_fn: HashFn, seed: u32) -> Self {
        Self { hash_fn, seed }
    }

    /// Assembler whose reference hashes match `vm`
    pub fn for_vm(vm: &Vm) -> Self {
        Self::with_hash(vm.hash_fn(), vm.hash_seed())
    }

    fn hash(&self, name: &str) -> u32 {
        (self.hash_fn)(name.as_bytes(), self.seed)
    }

    pub fn assemble(&self, source: &str) -> Result<Vec<u8>, AsmError> {
        // Innermost open block last, with the position of its '{'
        let mut blocks: Vec<(CodeBuilder, usize, usize)> = vec![(CodeBuilder::new(), 1, 1)];

        for Spanned { token, line, column } in Lexer::new(source).tokenize()? {
            let at = |kind| AsmError { line, column, kind };

            if token == Token::LBrace {
                blocks.push((CodeBuilder::new(), line, column));
                continue;
            }
            if token == Token::RBrace {
                if blocks.len() == 1 {
                    return Err(at(AsmErrorKind::UnexpectedClose));
                }
                let Some((inner, _, _)) = blocks.pop() else {
                    return Err(at(AsmErrorKind::UnexpectedClose));
                };
                let Some((outer, _, _)) = blocks.last_mut() else {
                    return Err(at(AsmErrorKind::UnexpectedClose));
                };
                outer
                    .emit_code(inner.code())
                    .map_err(|_| at(AsmErrorKind::StringTooLong(inner.current_offset())))?;
                continue;
            }

            let Some((builder, _, _)) = blocks.last_mut() else {
                return Err(at(AsmErrorKind::UnexpectedClose));
            };
            match token {
                Token::Int(value) => {
                    builder.emit_int(value);
                }
                Token::Str(bytes) => {
                    builder
                        .emit_str(&bytes)
                        .map_err(|_| at(AsmErrorKind::StringTooLong(bytes.len())))?;
                }
                Token::Ref(name) => {
                    builder.emit_ref(self.hash(&name));
                }
                Token::RefVal(name) => {
                    builder.emit_ref_val(self.hash(&name));
                }
                Token::Op(name) => {
                    let op = Opcode::from_mnemonic(&name)
                        .ok_or_else(|| at(AsmErrorKind::UnknownMnemonic(name.clone())))?;
                    if op.immediate_size() > 0 {
                        return Err(at(AsmErrorKind::OperandRequired(name)));
                    }
                    builder.emit(op);
                }
                Token::LBrace | Token::RBrace => {}
            }
        }

        if blocks.len() > 1 {
            let (_, line, column) = blocks.swap_remove(1);
            return Err(AsmError {
                line,
                column,
                kind: AsmErrorKind::UnclosedBlock,
            });
        }
        let code = blocks
            .pop()
            .map(|(builder, _, _)| builder.build())
            .unwrap_or_default();
        debug!(target: "avm::asm", bytes = code.len(), "assembled");
        Ok(code)
    }
}

/// Assemble with the default hash function and seed
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    Assembler::new().assemble(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenize_mixed() {
        assert_eq!(
            tokens("1 -2 +3 'a' \"hi\\n\" @x $y.z { dup } # comment\n add"),
            vec![
                Token::Int(1),
                Token::Int(-2),
                Token::Int(3),
                Token::Int(97),
                Token::Str(b"hi\n".to_vec()),
                Token::Ref("x".into()),
                Token::RefVal("y.z".into()),
                Token::LBrace,
                Token::Op("dup".into()),
                Token::RBrace,
                Token::Op("add".into()),
            ]
        );
    }

    #[test]
    fn test_token_positions() {
        let spanned = Lexer::new("1\n  add").tokenize().unwrap();
        assert_eq!((spanned[1].line, spanned[1].column), (2, 3));
    }

    #[test]
    fn test_assemble_arithmetic() {
        let code = assemble("2 3 add 200 mul").unwrap();
        assert_eq!(code, vec![0x22, 0x23, 0x30, 0x11, 0x00, 0xC8, 0x32]);
    }

    #[test]
    fn test_assemble_nested_blocks() {
        let code = assemble("{ 1 { 2 } }").unwrap();
        assert_eq!(code, vec![0x16, 4, 0x21, 0x16, 1, 0x22]);
    }

    #[test]
    fn test_assemble_refs_use_hash() {
        let code = assemble("@n $n").unwrap();
        let hash = murmur3_32(b"n", DEFAULT_HASH_SEED).to_be_bytes();
        let mut expected = vec![0x1A];
        expected.extend_from_slice(&hash);
        expected.push(0x1B);
        expected.extend_from_slice(&hash);
        assert_eq!(code, expected);
    }

    #[test]
    fn test_mnemonics_are_case_insensitive() {
        assert_eq!(assemble("DUP IfElse").unwrap(), vec![0x03, 0x61]);
    }

    #[test]
    fn test_errors() {
        let err = assemble("1 frob").unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::UnknownMnemonic("frob".into()));
        assert_eq!((err.line, err.column), (1, 3));

        assert_eq!(assemble("}").unwrap_err().kind, AsmErrorKind::UnexpectedClose);
        assert_eq!(assemble("{ 1").unwrap_err().kind, AsmErrorKind::UnclosedBlock);
        assert_eq!(assemble("\"abc").unwrap_err().kind, AsmErrorKind::UnterminatedString);
        assert_eq!(assemble("'ab'").unwrap_err().kind, AsmErrorKind::CharLength(2));
        assert_eq!(assemble("\"\\q\"").unwrap_err().kind, AsmErrorKind::BadEscape('q'));
        assert_eq!(assemble("@ x").unwrap_err().kind, AsmErrorKind::EmptyName);
        assert_eq!(assemble("int8").unwrap_err().kind, AsmErrorKind::OperandRequired("int8".into()));
        assert_eq!(
            assemble("4294967296").unwrap_err().kind,
            AsmErrorKind::NumberOutOfRange("4294967296".into())
        );
        assert_eq!(assemble("%").unwrap_err().kind, AsmErrorKind::UnexpectedChar('%'));
    }

    #[test]
    fn test_words_must_end_at_a_delimiter() {
        let err = assemble("1 2dup").unwrap_err();
        assert_eq!(err.kind, AsmErrorKind::UnexpectedChar('d'));
        assert_eq!((err.line, err.column), (1, 4));

        assert_eq!(assemble("dup{").unwrap_err().kind, AsmErrorKind::UnexpectedChar('{'));
        assert_eq!(assemble("$n\"x\"").unwrap_err().kind, AsmErrorKind::UnexpectedChar('"'));

        // closing braces and comments end a word
        assert_eq!(assemble("{ 1 dup}").unwrap(), vec![0x16, 2, 0x21, 0x03]);
        assert_eq!(assemble("7# seven").unwrap(), vec![0x27]);
    }

    #[test]
    fn test_names_are_letters_and_punctuation() {
        assert!(assemble("@a_b-c.d $A.z").is_ok());
        assert_eq!(assemble("@x1").unwrap_err().kind, AsmErrorKind::UnexpectedChar('1'));
    }

    #[test]
    fn test_long_string_limit() {
        let source = format!("\"{}\"", "x".repeat(70_000));
        assert_eq!(assemble(&source).unwrap_err().kind, AsmErrorKind::StringTooLong(70_000));
    }
}
