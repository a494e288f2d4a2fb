//! Line-level checks that run before a line is split into stages.

use crate::lexer::LexingError;

/// Errors that reject a whole line before any process is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("line too long (max {max} bytes)")]
    LineTooLong { max: usize },
    #[error("command too long after spacing operators (max {capacity} bytes)")]
    NormalizedTooLong { capacity: usize },
    #[error("invalid pipe syntax: missing command before '|'")]
    EmptyPipeSegment,
    #[error("invalid pipe syntax: missing command after '|'")]
    TrailingPipe,
    #[error("too many commands in pipeline (max {max})")]
    TooManyStages { max: usize },
    #[error("invalid filename after '{0}'")]
    RedirectIntoPipe(&'static str),
    #[error(transparent)]
    Lexing(#[from] LexingError),
}

/// Pad every unquoted `|`, `<`, `>` and `>>` with a single space on each side.
///
/// No space is added where the operator already touches whitespace or the
/// start/end of the line. Quoted spans are copied verbatim; an unterminated
/// quote is left for the lexer to reject.
pub fn normalize_operators(input: &str, capacity: usize) -> Result<String, SyntaxError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Some(open) => {
                if ch == open {
                    quote = None;
                }
                out.push(ch);
                i += 1;
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    out.push(ch);
                    i += 1;
                }
                '|' | '<' | '>' => {
                    let len = if ch == '>' && chars.get(i + 1) == Some(&'>') { 2 } else { 1 };
                    if out.chars().next_back().is_some_and(|c| !c.is_whitespace()) {
                        out.push(' ');
                    }
                    out.extend(&chars[i..i + len]);
                    i += len;
                    if chars.get(i).is_some_and(|c| !c.is_whitespace()) {
                        out.push(' ');
                    }
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            },
        }
        if out.len() > capacity {
            return Err(SyntaxError::NormalizedTooLong { capacity });
        }
    }

    Ok(out)
}

/// Reject malformed pipe sequences and overlong pipelines.
///
/// Every `|` outside quotes must follow some non-blank text since the previous
/// `|` (or the line start), the line must not end on a `|`, and the number of
/// stages must not exceed `max_stages`. A redirection operator directly
/// followed by `|` is reported as a bad redirection target.
pub fn validate_pipes(line: &str, max_stages: usize) -> Result<(), SyntaxError> {
    let mut quote: Option<char> = None;
    let mut segment_has_text = false;
    let mut pending_redirect: Option<&'static str> = None;
    let mut pipes = 0usize;
    let mut prev = None;

    for ch in line.chars() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            prev = Some(ch);
            continue;
        }

        match ch {
            '|' => {
                if let Some(op) = pending_redirect {
                    return Err(SyntaxError::RedirectIntoPipe(op));
                }
                if !segment_has_text {
                    return Err(SyntaxError::EmptyPipeSegment);
                }
                pipes += 1;
                if pipes + 1 > max_stages {
                    return Err(SyntaxError::TooManyStages { max: max_stages });
                }
                segment_has_text = false;
            }
            '<' => {
                pending_redirect = Some("<");
                segment_has_text = true;
            }
            '>' => {
                pending_redirect = if prev == Some('>') && pending_redirect == Some(">") {
                    Some(">>")
                } else {
                    Some(">")
                };
                segment_has_text = true;
            }
            c if c.is_whitespace() => {}
            c => {
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
                pending_redirect = None;
                segment_has_text = true;
            }
        }
        prev = Some(ch);
    }

    if pipes > 0 && !segment_has_text {
        return Err(SyntaxError::TrailingPipe);
    }
    Ok(())
}
