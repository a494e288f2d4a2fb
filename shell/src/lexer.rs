//! Quote-aware splitting of a line into tokens.
//!
//! The same state machine serves two purposes: splitting a normalized line on
//! `|` into stage texts, and splitting each stage text on whitespace into words.
//! Which behavior applies is decided by the delimiter set (see [`tokenize`]).

/// Delimiters used to split a stage into words.
pub const WHITESPACE: &str = " \t\n";

/// Delimiter used to split a line into stage texts.
pub const PIPE: &str = "|";

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    /// Token text with quote characters already removed in word mode.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether any part of the token came from a quoted span.
    ///
    /// A quoted `">"` is a literal word, never a redirection operator.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexingError {
    /// Input ended while a `'` or `"` span was still open.
    #[error("Missing closing quote ({0})")]
    UnterminatedQuote(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Unquoted,
    Quoted(char),
}

struct LexingFSM<'a> {
    delimiters: &'a str,
    /// Word mode: strip quote characters and trim unquoted edge whitespace.
    words: bool,
    state: LexingState,
    /// Characters of the current token, each tagged with whether it was quoted.
    buffer: Vec<(char, bool)>,
    touched_quote: bool,
}

impl<'a> LexingFSM<'a> {
    fn new(delimiters: &'a str) -> Self {
        LexingFSM {
            delimiters,
            words: delimiters.contains(' '),
            state: LexingState::Unquoted,
            buffer: Vec::new(),
            touched_quote: false,
        }
    }

    fn make_tokens(mut self, input: &str) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        for ch in input.chars() {
            match self.state {
                LexingState::Unquoted => self.handle_unquoted(ch, &mut out),
                LexingState::Quoted(open) => self.handle_quoted(ch, open),
            }
        }

        // The partial token list is dropped together with `out`.
        if let LexingState::Quoted(open) = self.state {
            return Err(LexingError::UnterminatedQuote(open));
        }

        self.finish_token(&mut out);
        Ok(out)
    }

    fn handle_unquoted(&mut self, ch: char, out: &mut Vec<Token>) {
        match ch {
            '\'' | '"' => {
                self.state = LexingState::Quoted(ch);
                self.touched_quote = true;
                if !self.words {
                    self.buffer.push((ch, false));
                }
            }
            c if self.delimiters.contains(c) => self.finish_token(out),
            c => self.buffer.push((c, false)),
        }
    }

    fn handle_quoted(&mut self, ch: char, open: char) {
        if ch == open {
            self.state = LexingState::Unquoted;
            if !self.words {
                self.buffer.push((ch, false));
            }
        } else {
            self.buffer.push((ch, true));
        }
    }

    fn finish_token(&mut self, out: &mut Vec<Token>) {
        let mut chars = std::mem::take(&mut self.buffer);
        let quoted = std::mem::take(&mut self.touched_quote);

        if self.words {
            let is_edge_space = |&(c, q): &(char, bool)| !q && c.is_whitespace();
            let start = chars.iter().position(|c| !is_edge_space(c)).unwrap_or(chars.len());
            let end = chars.iter().rposition(|c| !is_edge_space(c)).map_or(start, |i| i + 1);
            chars.truncate(end);
            chars.drain(..start);
        }

        if chars.is_empty() {
            return;
        }
        out.push(Token {
            text: chars.into_iter().map(|(c, _)| c).collect(),
            quoted,
        });
    }
}

/// Split `input` into tokens on any character of `delimiters`.
///
/// Quoted spans (`'…'` or `"…"`, closed only by the same character) are atomic:
/// delimiters inside them do not split. When `delimiters` contains a space the
/// lexer works in word mode: quote characters are removed and unquoted
/// whitespace at the edges of each token is trimmed. Otherwise quote characters
/// are kept verbatim and nothing is trimmed, so the pieces can be lexed again.
///
/// Empty tokens are never emitted. On an unterminated quote no tokens are
/// returned at all.
pub fn tokenize(input: &str, delimiters: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(delimiters).make_tokens(input)
}

/// Convenience wrapper for word mode, shared by builtins and the stage parser.
pub fn split_words(input: &str) -> Result<Vec<Token>, LexingError> {
    tokenize(input, WHITESPACE)
}
