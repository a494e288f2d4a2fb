use crate::config::Config;
use crate::lexer::{self, Token};
use crate::syntax::{self, SyntaxError};
use std::path::PathBuf;

/// Kind of redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<`: read standard input from a file.
    Input,
    /// `>`: write standard output to a file, truncating it.
    Output,
    /// `>>`: write standard output to a file, appending to it.
    Append,
}

impl RedirectKind {
    /// Recognize an operator token. Quoted tokens are always literal words.
    pub fn from_token(token: &Token) -> Option<Self> {
        if token.is_quoted() {
            return None;
        }
        match token.as_str() {
            "<" => Some(RedirectKind::Input),
            ">" => Some(RedirectKind::Output),
            ">>" => Some(RedirectKind::Append),
            _ => None,
        }
    }

    pub fn operator(self) -> &'static str {
        match self {
            RedirectKind::Input => "<",
            RedirectKind::Output => ">",
            RedirectKind::Append => ">>",
        }
    }
}

/// One command of a pipeline with its own redirections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    /// Program name followed by its arguments. Never empty after parsing.
    pub argv: Vec<String>,
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    /// Append instead of truncate; only meaningful with `output_file`.
    pub append: bool,
}

/// Reasons a single stage is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("invalid command: cannot start with '{0}'")]
    StartsWithRedirect(&'static str),
    #[error("multiple input redirections")]
    MultipleInputs,
    #[error("multiple output redirections")]
    MultipleOutputs,
    #[error("missing filename after '{0}'")]
    MissingTarget(&'static str),
    #[error("invalid filename after '{0}'")]
    InvalidTarget(&'static str),
    #[error("empty command")]
    EmptyCommand,
    #[error("too many arguments (max {max})")]
    TooManyArguments { max: usize },
    #[error(transparent)]
    Lexing(#[from] lexer::LexingError),
}

fn is_valid_target(token: &Token) -> bool {
    if token.as_str().trim().is_empty() {
        return false;
    }
    token.is_quoted() || !matches!(token.as_str(), "<" | ">" | ">>" | "|")
}

/// Build a [`Stage`] from one stage's word tokens.
///
/// Redirection operators and their targets are pulled out; everything else
/// becomes `argv`, in order. `max_args` bounds `argv` only: redirections are
/// capped at one input and one output anyway, so they never count.
pub fn parse_stage(tokens: &[Token], max_args: usize) -> Result<Stage, StageError> {
    if let Some(kind) = tokens.first().and_then(RedirectKind::from_token) {
        return Err(StageError::StartsWithRedirect(kind.operator()));
    }

    let mut stage = Stage::default();
    let mut pos = 0;
    while pos < tokens.len() {
        let token = &tokens[pos];
        let Some(kind) = RedirectKind::from_token(token) else {
            if stage.argv.len() == max_args {
                return Err(StageError::TooManyArguments { max: max_args });
            }
            stage.argv.push(token.as_str().to_owned());
            pos += 1;
            continue;
        };

        let op = kind.operator();
        let already_set = match kind {
            RedirectKind::Input => stage.input_file.is_some(),
            RedirectKind::Output | RedirectKind::Append => stage.output_file.is_some(),
        };
        if already_set {
            return Err(match kind {
                RedirectKind::Input => StageError::MultipleInputs,
                _ => StageError::MultipleOutputs,
            });
        }

        let target = tokens.get(pos + 1).ok_or(StageError::MissingTarget(op))?;
        if !is_valid_target(target) {
            return Err(StageError::InvalidTarget(op));
        }
        let path = PathBuf::from(target.as_str());
        match kind {
            RedirectKind::Input => stage.input_file = Some(path),
            RedirectKind::Output => stage.output_file = Some(path),
            RedirectKind::Append => {
                stage.output_file = Some(path);
                stage.append = true;
            }
        }
        pos += 2;
    }

    if stage.argv.is_empty() {
        return Err(StageError::EmptyCommand);
    }
    Ok(stage)
}

/// A parsed line: one slot per stage, in pipeline order.
///
/// A slot holding an error is reported and skipped by the executor while the
/// remaining stages still run.
#[derive(Debug)]
pub struct Pipeline {
    pub stages: Vec<Result<Stage, StageError>>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Run a raw line through normalization, validation and lexing, then parse
/// every stage.
///
/// Errors returned here reject the whole line. Per-stage errors are kept
/// inside the returned [`Pipeline`].
pub fn parse_line(line: &str, config: &Config) -> Result<Pipeline, SyntaxError> {
    if line.len() > config.max_line_len {
        return Err(SyntaxError::LineTooLong { max: config.max_line_len });
    }
    let normalized = syntax::normalize_operators(line, config.normalize_capacity)?;
    tracing::trace!(%normalized, "normalized line");
    syntax::validate_pipes(&normalized, config.max_stages)?;

    let stages = lexer::tokenize(&normalized, lexer::PIPE)?
        .iter()
        .map(|text| {
            let words = lexer::split_words(text.as_str())?;
            parse_stage(&words, config.max_args)
        })
        .collect();
    Ok(Pipeline { stages })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(line: &str) -> Result<Stage, StageError> {
        parse_stage(&lexer::split_words(line).unwrap(), 2048)
    }

    #[test]
    fn plain_command() {
        let s = stage("ls -la /tmp").unwrap();
        assert_eq!(s.argv, ["ls", "-la", "/tmp"]);
        assert_eq!(s.input_file, None);
        assert_eq!(s.output_file, None);
        assert!(!s.append);
    }

    #[test]
    fn redirections_are_extracted() {
        let s = stage("sort < in.txt -r > out.txt").unwrap();
        assert_eq!(s.argv, ["sort", "-r"]);
        assert_eq!(s.input_file, Some(PathBuf::from("in.txt")));
        assert_eq!(s.output_file, Some(PathBuf::from("out.txt")));
        assert!(!s.append);

        let s = stage("echo hi >> log").unwrap();
        assert_eq!(s.output_file, Some(PathBuf::from("log")));
        assert!(s.append);
    }

    #[test]
    fn quoted_operator_is_a_word() {
        let s = stage(r#"echo ">" '<' > "my file""#).unwrap();
        assert_eq!(s.argv, ["echo", ">", "<"]);
        assert_eq!(s.output_file, Some(PathBuf::from("my file")));
    }

    #[test]
    fn cannot_start_with_redirect() {
        assert_eq!(stage("> file"), Err(StageError::StartsWithRedirect(">")));
        assert_eq!(stage("< in cat"), Err(StageError::StartsWithRedirect("<")));
        assert_eq!(stage(">> log"), Err(StageError::StartsWithRedirect(">>")));
    }

    #[test]
    fn bad_targets() {
        assert_eq!(stage("cat > >"), Err(StageError::InvalidTarget(">")));
        assert_eq!(stage("cat >"), Err(StageError::MissingTarget(">")));
        assert_eq!(stage("cat < >> x"), Err(StageError::InvalidTarget("<")));
        assert_eq!(stage("cat > '  '"), Err(StageError::InvalidTarget(">")));
    }

    #[test]
    fn duplicate_redirections() {
        assert_eq!(stage("cat > out1 > out2"), Err(StageError::MultipleOutputs));
        assert_eq!(stage("cat > out1 >> out2"), Err(StageError::MultipleOutputs));
        assert_eq!(stage("cat < a < b"), Err(StageError::MultipleInputs));
    }

    #[test]
    fn only_redirections_is_empty() {
        assert_eq!(parse_stage(&[], 8), Err(StageError::EmptyCommand));
    }

    #[test]
    fn argument_limit() {
        assert_eq!(
            parse_stage(&lexer::split_words("a b c").unwrap(), 2),
            Err(StageError::TooManyArguments { max: 2 })
        );
        let s = parse_stage(&lexer::split_words("a b < in > out").unwrap(), 2).unwrap();
        assert_eq!(s.argv, ["a", "b"]);
    }

    #[test]
    fn line_to_pipeline() {
        let config = Config::default();
        let pipeline = parse_line(r#"echo "a | b"|tr a-z A-Z>out"#, &config).unwrap();
        assert_eq!(pipeline.len(), 2);
        let [Ok(first), Ok(second)] = pipeline.stages.as_slice() else {
            panic!("unexpected stages: {pipeline:?}");
        };
        assert_eq!(first.argv, ["echo", "a | b"]);
        assert_eq!(second.argv, ["tr", "a-z", "A-Z"]);
        assert_eq!(second.output_file, Some(PathBuf::from("out")));
    }

    #[test]
    fn bad_stage_keeps_its_slot() {
        let pipeline = parse_line("echo hi | > x | wc -c", &Config::default()).unwrap();
        assert_eq!(pipeline.len(), 3);
        assert!(pipeline.stages[0].is_ok());
        assert_eq!(pipeline.stages[1], Err(StageError::StartsWithRedirect(">")));
        assert!(pipeline.stages[2].is_ok());
    }

    #[test]
    fn line_level_rejections() {
        let config = Config::default();
        assert!(matches!(
            parse_line("cmd1 | | cmd2", &config),
            Err(SyntaxError::EmptyPipeSegment)
        ));
        assert!(matches!(
            parse_line(r#"echo "abc"#, &config),
            Err(SyntaxError::Lexing(_))
        ));
        let long = "x".repeat(config.max_line_len + 1);
        assert!(matches!(
            parse_line(&long, &config),
            Err(SyntaxError::LineTooLong { .. })
        ));
    }
}
