use crate::ExitCode;
use crate::env::Environment;
use crate::lexer::Token;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::path::PathBuf;

/// Exit status used when `exit` is given a non-numeric argument.
pub const EXIT_USAGE: ExitCode = 2;

/// What the interpreter should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(ExitCode),
}

#[derive(Debug, thiserror::Error)]
pub enum BuiltinError {
    #[error("{0}: too many arguments")]
    TooManyArguments(&'static str),
    #[error("exit: numeric argument required: '{0}'")]
    NumericArgumentRequired(String),
    #[error("cd: HOME not set")]
    NoHome,
    #[error("cd: OLDPWD not set")]
    NoPreviousDir,
    #[error("Cannot change directory to '{}'. {source}", path.display())]
    ChangeDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BuiltinError {
    /// How the interpreter proceeds once this error has been reported.
    pub fn flow(&self) -> Flow {
        match self {
            BuiltinError::NumericArgumentRequired(_) => Flow::Exit(EXIT_USAGE),
            _ => Flow::Continue,
        }
    }
}

/// Usage output produced while parsing a builtin's arguments.
pub(crate) struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl From<EarlyExit> for InvalidArgs {
    fn from(EarlyExit { output, status }: EarlyExit) -> Self {
        InvalidArgs {
            output,
            is_error: status.is_err(),
        }
    }
}

/// Commands handled inside the interpreter process, never forked.
pub(crate) trait BuiltinCommand: Sized {
    /// Name the first word of a line must match exactly.
    fn name() -> &'static str;

    fn parse(args: &[&str]) -> Result<Self, InvalidArgs>;

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<Flow, BuiltinError>;
}

fn run<T: BuiltinCommand>(args: &[&str], stdout: &mut dyn Write, env: &mut Environment) -> Flow {
    match T::parse(args) {
        Ok(cmd) => match cmd.execute(stdout, env) {
            Ok(flow) => flow,
            Err(e) => {
                eprintln!("Error: {e}.");
                e.flow()
            }
        },
        Err(InvalidArgs { output, is_error }) => {
            if is_error {
                eprintln!("Error: {}: {}", T::name(), output.trim_end());
            } else {
                let _ = writeln!(stdout, "{}", output.trim_end());
            }
            Flow::Continue
        }
    }
}

/// Run `words` as a builtin if its first word names one.
///
/// Returns `None` when the line is not a builtin and belongs to the pipeline path.
pub fn dispatch(words: &[Token], stdout: &mut dyn Write, env: &mut Environment) -> Option<Flow> {
    let (name, rest) = words.split_first()?;
    let args: Vec<&str> = rest.iter().map(Token::as_str).collect();
    match name.as_str() {
        n if n == Cd::name() => Some(run::<Cd>(&args, stdout, env)),
        n if n == Exit::name() => Some(run::<Exit>(&args, stdout, env)),
        _ => None,
    }
}

#[derive(FromArgs)]
/// Change the working directory of the interpreter.
pub struct Cd {
    #[argh(positional)]
    /// target directory. `~` and `~/…` resolve against the home directory,
    /// `-` is the previous directory. Home when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn parse(args: &[&str]) -> Result<Self, InvalidArgs> {
        match args {
            // argh reads a lone `-` as an option name.
            ["-"] => Ok(Cd {
                target: Some("-".to_string()),
            }),
            [_, _, ..] => Err(InvalidArgs {
                output: "too many arguments".to_string(),
                is_error: true,
            }),
            _ => Ok(Cd::from_args(&[Self::name()], args)?),
        }
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<Flow, BuiltinError> {
        let target = self.resolve(env)?;
        env.change_dir(&target)
            .map_err(|source| BuiltinError::ChangeDir { path: target, source })?;
        if self.target.as_deref() == Some("-") {
            writeln!(stdout, "{}", env.current_dir.display())?;
        }
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Leave the interpreter.
pub struct Exit {
    #[argh(positional, greedy)]
    /// exit status, 0 when omitted.
    pub status: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn parse(args: &[&str]) -> Result<Self, InvalidArgs> {
        Ok(Exit::from_args(&[Self::name()], args)?)
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<Flow, BuiltinError> {
        match self.status.as_slice() {
            [] => Ok(Flow::Exit(0)),
            [code] => code
                .parse::<ExitCode>()
                .map(Flow::Exit)
                .map_err(|_| BuiltinError::NumericArgumentRequired(code.clone())),
            _ => Err(BuiltinError::TooManyArguments("exit")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::split_words;

    fn exit_flow(args: &[&str]) -> Result<Flow, BuiltinError> {
        let mut env = Environment::new();
        let cmd = Exit::parse(args).ok().expect("arguments parse");
        cmd.execute(&mut Vec::new(), &mut env)
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_flow(&[]).unwrap(), Flow::Exit(0));
        assert_eq!(exit_flow(&["7"]).unwrap(), Flow::Exit(7));
    }

    #[test]
    fn exit_non_numeric_uses_reserved_status() {
        let err = exit_flow(&["abc"]).unwrap_err();
        assert!(matches!(err, BuiltinError::NumericArgumentRequired(ref a) if a == "abc"));
        assert_eq!(err.flow(), Flow::Exit(EXIT_USAGE));
    }

    #[test]
    fn exit_with_two_arguments_keeps_running() {
        let err = exit_flow(&["1", "2"]).unwrap_err();
        assert!(matches!(err, BuiltinError::TooManyArguments("exit")));
        assert_eq!(err.flow(), Flow::Continue);
    }

    #[test]
    fn non_builtins_are_not_dispatched() {
        let mut env = Environment::new();
        let words = split_words("echo cd exit").unwrap();
        assert_eq!(dispatch(&words, &mut Vec::new(), &mut env), None);
        assert_eq!(dispatch(&[], &mut Vec::new(), &mut env), None);
    }

    #[test]
    fn dispatch_exit() {
        let mut env = Environment::new();
        let words = split_words("exit 3").unwrap();
        assert_eq!(dispatch(&words, &mut Vec::new(), &mut env), Some(Flow::Exit(3)));
        let words = split_words("exit 1 2").unwrap();
        assert_eq!(dispatch(&words, &mut Vec::new(), &mut env), Some(Flow::Continue));
    }

    #[test]
    fn cd_resolution() {
        let mut env = Environment::new();
        let home = env.home_dir().unwrap();
        let cd = |target: Option<&str>| Cd { target: target.map(str::to_string) };

        assert_eq!(cd(None).resolve(&env).unwrap(), home);
        assert_eq!(cd(Some("~")).resolve(&env).unwrap(), home);
        assert_eq!(cd(Some("~/src")).resolve(&env).unwrap(), home.join("src"));
        assert_eq!(cd(Some("/tmp")).resolve(&env).unwrap(), PathBuf::from("/tmp"));
        assert!(matches!(cd(Some("-")).resolve(&env), Err(BuiltinError::NoPreviousDir)));

        env.previous_dir = Some(PathBuf::from("/var"));
        assert_eq!(cd(Some("-")).resolve(&env).unwrap(), PathBuf::from("/var"));
    }

    #[test]
    fn cd_arguments() {
        let target = |args: &[&str]| Cd::parse(args).ok().map(|cd| cd.target);
        assert_eq!(target(&[]), Some(None));
        assert_eq!(target(&["/tmp"]), Some(Some("/tmp".to_string())));
        assert_eq!(target(&["-"]), Some(Some("-".to_string())));
        assert_eq!(target(&["~/src"]), Some(Some("~/src".to_string())));
        assert_eq!(target(&["a", "b"]), None);
        assert_eq!(target(&["-x"]), None);
    }

    #[test]
    fn exit_rejects_flag_like_argument() {
        assert!(Exit::parse(&["-1"]).is_err());
    }
}
