/// Limits and presentation settings for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Longest accepted input line, in bytes.
    pub max_line_len: usize,
    /// Most stages a single pipeline may have.
    pub max_stages: usize,
    /// Most argument words a single stage may have. Redirection operators and
    /// their targets are not counted.
    pub max_args: usize,
    /// Room for the line once operators are padded with spaces.
    pub normalize_capacity: usize,
    /// Color the working directory in the prompt.
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_stages: 64,
            max_args: 2048,
            normalize_capacity: 4096,
            color: true,
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg
    }

    /// Apply `MINISH_*` overrides from `lookup`. Values that do not parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<usize>().ok());

        if let Some(n) = number("MINISH_MAX_LINE").filter(|n| *n > 0) {
            self.max_line_len = n;
            self.normalize_capacity = self.normalize_capacity.max(n * 4);
        }
        if let Some(n) = number("MINISH_MAX_STAGES").filter(|n| *n > 0) {
            self.max_stages = n;
        }
        if let Some(n) = number("MINISH_MAX_ARGS").filter(|n| *n > 0) {
            self.max_args = n;
        }
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.color = false;
        }
    }
}
