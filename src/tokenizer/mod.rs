//! Byte-level tokenizer: turns one line of input into argv plus per-token
//! offset records, carrying enough state across calls to support
//! multi-line quoting.
//!
//! The C original ran a macro three times (count, measure+span, emit) to
//! avoid reallocating token buffers. In Rust, `Vec::push` already amortizes
//! growth, so this is a single pass over the state machine that builds
//! token buffers directly — the state machine itself (escape/quote states,
//! `=`-column tracking) is kept faithful to the source; only the
//! count/measure/emit repetition is dropped. See DESIGN.md.

mod escapes;
mod state;

pub use state::{EscapeState, QuoteState, TokenizerState};

use crate::error::{SourcePos, SyntaxError};

/// Per-token offset bookkeeping: the source byte range the token was read
/// from, the column of the first unquoted `=` (if any), and a mapping from
/// each output byte back to the source byte it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetRec {
    pub start: usize,
    pub end: usize,
    pub equals_column: Option<usize>,
    pub per_byte: Vec<usize>,
}

/// The result of tokenizing one chunk of input.
#[derive(Debug, Clone)]
pub struct TokenizeResult {
    pub argv: Vec<Vec<u8>>,
    pub offsets: Vec<OffsetRec>,
    pub final_state: TokenizerState,
}

struct TokenBuilder {
    bytes: Vec<u8>,
    per_byte: Vec<usize>,
    start: usize,
    equals_column: Option<usize>,
}

impl TokenBuilder {
    fn new(start: usize) -> Self {
        TokenBuilder { bytes: Vec::new(), per_byte: Vec::new(), start, equals_column: None }
    }

    fn push(&mut self, byte: u8, source_index: usize) {
        self.bytes.push(byte);
        self.per_byte.push(source_index);
    }

    fn push_all(&mut self, bytes: &[u8], source_index: usize) {
        for b in bytes {
            self.push(*b, source_index);
        }
    }
}

/// Tokenize `input`, continuing from `initial_state` (pass `TokenizerState::default()`
/// for a fresh line). Returns the produced argv, one [`OffsetRec`] per token,
/// and the state to carry into the next call if the line ended mid-token.
pub fn tokenize(input: &[u8], initial_state: TokenizerState) -> Result<TokenizeResult, SyntaxError> {
    let mut state = initial_state;
    let mut argv = Vec::new();
    let mut offsets = Vec::new();
    let mut current: Option<TokenBuilder> = None;

    let mut i = 0usize;
    while i < input.len() {
        let b = input[i];
        step_byte(&mut state, &mut current, &mut argv, &mut offsets, input, &mut i, b)?;
    }

    if state.in_token {
        if let Some(tok) = current.take() {
            finish_token(&mut argv, &mut offsets, tok, input.len());
        }
    }

    Ok(TokenizeResult { argv, offsets, final_state: state })
}

fn finish_token(argv: &mut Vec<Vec<u8>>, offsets: &mut Vec<OffsetRec>, tok: TokenBuilder, end: usize) {
    offsets.push(OffsetRec { start: tok.start, end, equals_column: tok.equals_column, per_byte: tok.per_byte });
    argv.push(tok.bytes);
}

fn is_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

#[allow(clippy::too_many_arguments)]
fn step_byte(
    state: &mut TokenizerState,
    current: &mut Option<TokenBuilder>,
    argv: &mut Vec<Vec<u8>>,
    offsets: &mut Vec<OffsetRec>,
    input: &[u8],
    i: &mut usize,
    b: u8,
) -> Result<(), SyntaxError> {
    // Escape sub-machine takes priority over quote state once entered.
    if state.escape_state != EscapeState::NoEscape {
        let consumed = escapes::step_escape(state, current.as_mut().expect("escape active implies in_token"), input, *i)?;
        *i += consumed;
        return Ok(());
    }

    match state.quote_state {
        QuoteState::InSingle => {
            let tok = current.as_mut().expect("in_token implies current token");
            if b == b'\'' {
                state.quote_state = QuoteState::NoQuote;
            } else {
                tok.push(b, *i);
            }
            *i += 1;
            Ok(())
        }
        QuoteState::InDouble => {
            if b == b'\\' {
                state.escape_state = EscapeState::Backslash;
                *i += 1;
                return Ok(());
            }
            let tok = current.as_mut().expect("in_token implies current token");
            if b == b'"' {
                state.quote_state = QuoteState::NoQuote;
            } else {
                tok.push(b, *i);
            }
            *i += 1;
            Ok(())
        }
        QuoteState::NoQuote | QuoteState::WasQuote => {
            if !state.in_token {
                if is_whitespace(b) {
                    *i += 1;
                    return Ok(());
                }
                state.in_token = true;
                state.equals_seen = false;
                *current = Some(TokenBuilder::new(*i));
            }
            if is_whitespace(b) {
                let tok = current.take().expect("in_token implies current token");
                finish_token(argv, offsets, tok, *i);
                state.in_token = false;
                state.equals_seen = false;
                *i += 1;
                return Ok(());
            }
            match b {
                b'\'' => {
                    state.quote_state = QuoteState::InSingle;
                    *i += 1;
                }
                b'"' => {
                    state.quote_state = QuoteState::InDouble;
                    *i += 1;
                }
                b'\\' => {
                    state.escape_state = EscapeState::Backslash;
                    *i += 1;
                }
                b'=' => {
                    let tok = current.as_mut().expect("in_token implies current token");
                    if !state.equals_seen {
                        state.equals_seen = true;
                        tok.equals_column = Some(*i - tok.start);
                    }
                    tok.push(b, *i);
                    *i += 1;
                }
                _ => {
                    let tok = current.as_mut().expect("in_token implies current token");
                    tok.push(b, *i);
                    *i += 1;
                }
            }
            Ok(())
        }
    }
}

pub(crate) fn syntax_error(byte_index: usize, input: &[u8], message: impl Into<String>) -> SyntaxError {
    let mut line = 1;
    let mut col = 0;
    for &b in &input[..byte_index.min(input.len())] {
        if b == b'\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    SyntaxError { byte_index, pos: Some(SourcePos::new(line, col)), message: message.into() }
}
