use crate::ExitCode;
use crate::builtin::{self, Flow};
use crate::config::Config;
use crate::env::Environment;
use crate::syntax::SyntaxError;
use crate::{executor, interrupt, lexer, parser};
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, IsTerminal};

const BRIGHTBLUE: &str = "\x1b[34;1m";
const DEFAULT: &str = "\x1b[0m";

/// Line-oriented command interpreter: builtins run in-process, everything
/// else becomes a pipeline of child processes.
///
/// Example
/// ```
/// use minish::{Config, Flow, Interpreter};
/// let mut sh = Interpreter::new(Config::default());
/// assert_eq!(sh.execute_line("true | true"), Flow::Continue);
/// assert_eq!(sh.execute_line("exit 3"), Flow::Exit(3));
/// ```
pub struct Interpreter {
    config: Config,
    env: Environment,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            env: Environment::new(),
        }
    }

    /// Handle one input line and block until every process it started has exited.
    ///
    /// Errors are reported on stderr and never end the interpreter; only
    /// `exit` produces [`Flow::Exit`].
    pub fn execute_line(&mut self, line: &str) -> Flow {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        if line.len() > self.config.max_line_len {
            eprintln!("Error: {}.", SyntaxError::LineTooLong { max: self.config.max_line_len });
            return Flow::Continue;
        }

        let words = match lexer::split_words(line) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("Error: {e}.");
                return Flow::Continue;
            }
        };
        if let Some(flow) = builtin::dispatch(&words, &mut io::stdout(), &mut self.env) {
            return flow;
        }

        match parser::parse_line(line, &self.config) {
            Ok(pipeline) => {
                let report = executor::run_pipeline(&pipeline);
                // The status is not surfaced to the user yet.
                tracing::debug!(?report, "pipeline finished");
            }
            Err(e) => eprintln!("Error: {e}."),
        }
        Flow::Continue
    }

    fn prompt(&self) -> String {
        let cwd = std::env::current_dir().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cannot read working directory");
            self.env.current_dir.clone()
        });
        if self.config.color {
            format!("[{BRIGHTBLUE}{}{DEFAULT}]$ ", cwd.display())
        } else {
            format!("[{}]$ ", cwd.display())
        }
    }

    /// Read-eval loop. Returns the status the process should exit with.
    ///
    /// End of input yields 0. A read error that is not caused by an interrupt is
    /// returned as an error.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        interrupt::install_handler().context("Cannot register signal handler")?;
        let mut rl = DefaultEditor::new().context("Cannot initialize line editor")?;
        let interactive = io::stdin().is_terminal();

        loop {
            if interrupt::take_and_clear() {
                tracing::trace!("discarding interrupt");
            }
            let prompt = if interactive { self.prompt() } else { String::new() };

            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(line.as_str());
                    }
                    if let Flow::Exit(code) = self.execute_line(&line) {
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(0),
                Err(err) => {
                    if interrupt::take_and_clear() {
                        continue;
                    }
                    return Err(err).context("Failed to read from stdin");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Interpreter {
        Interpreter::new(Config {
            color: false,
            ..Config::default()
        })
    }

    #[test]
    fn blank_lines_continue() {
        let mut sh = quiet();
        assert_eq!(sh.execute_line(""), Flow::Continue);
        assert_eq!(sh.execute_line("   \n"), Flow::Continue);
    }

    #[test]
    fn errors_never_exit() {
        let mut sh = quiet();
        assert_eq!(sh.execute_line("echo \"abc"), Flow::Continue);
        assert_eq!(sh.execute_line("true | | true"), Flow::Continue);
        assert_eq!(sh.execute_line("> nothing"), Flow::Continue);
        assert_eq!(sh.execute_line("cat > out1 > out2"), Flow::Continue);
    }

    #[test]
    fn exit_is_recognized() {
        let mut sh = quiet();
        assert_eq!(sh.execute_line("exit"), Flow::Exit(0));
        assert_eq!(sh.execute_line("exit 7"), Flow::Exit(7));
        assert_eq!(sh.execute_line("exit abc"), Flow::Exit(builtin::EXIT_USAGE));
        assert_eq!(sh.execute_line("exit 1 2"), Flow::Continue);
    }

    #[test]
    fn prompt_without_color() {
        let sh = quiet();
        let prompt = sh.prompt();
        assert!(prompt.starts_with('['));
        assert!(prompt.ends_with("]$ "));
        assert!(!prompt.contains('\x1b'));
    }
}
