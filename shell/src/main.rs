use argh::FromArgs;
use minish::{Config, Interpreter};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Interactive command interpreter with pipes and file redirections.
struct Args {
    #[argh(option)]
    /// longest accepted input line, in bytes.
    max_line: Option<usize>,

    #[argh(option)]
    /// most commands allowed in one pipeline.
    max_stages: Option<usize>,

    #[argh(option)]
    /// most words allowed in one command.
    max_args: Option<usize>,

    #[argh(switch)]
    /// print the prompt without colors.
    no_color: bool,
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if let Some(n) = self.max_line.filter(|n| *n > 0) {
            config.max_line_len = n;
            config.normalize_capacity = config.normalize_capacity.max(n * 4);
        }
        if let Some(n) = self.max_stages.filter(|n| *n > 0) {
            config.max_stages = n;
        }
        if let Some(n) = self.max_args.filter(|n| *n > 0) {
            config.max_args = n;
        }
        if self.no_color {
            config.color = false;
        }
        config
    }
}

fn main() {
    let filter = EnvFilter::try_from_env("MINISH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args: Args = argh::from_env();
    let config = args.apply(Config::from_env());
    tracing::debug!(?config, "starting");

    let mut interpreter = Interpreter::new(config);
    match interpreter.repl() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}.");
            process::exit(1);
        }
    }
}
