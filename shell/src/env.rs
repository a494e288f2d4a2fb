use nix::unistd::{Uid, User};
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Directory state the interpreter keeps between lines.
///
/// `previous_dir` backs `cd -`; it is only updated by successful directory changes.
#[derive(Debug, Clone)]
pub struct Environment {
    pub current_dir: PathBuf,
    pub previous_dir: Option<PathBuf>,
}

impl Environment {
    /// Capture the process's working directory.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            current_dir,
            previous_dir: None,
        }
    }

    /// Home directory from `HOME`, falling back to the password database.
    pub fn home_dir(&self) -> Option<PathBuf> {
        match stdenv::var_os("HOME") {
            Some(home) if !home.is_empty() => Some(PathBuf::from(home)),
            _ => User::from_uid(Uid::current()).ok().flatten().map(|user| user.dir),
        }
    }

    /// Make `target` the working directory of the process and remember the old one.
    pub fn change_dir(&mut self, target: &Path) -> std::io::Result<()> {
        stdenv::set_current_dir(target)?;
        let new_dir = stdenv::current_dir().unwrap_or_else(|_| target.to_path_buf());
        self.previous_dir = Some(std::mem::replace(&mut self.current_dir, new_dir));
        Ok(())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_current_dir() {
        let env = Environment::new();
        assert_eq!(env.current_dir, stdenv::current_dir().unwrap());
        assert!(env.previous_dir.is_none());
    }

    #[test]
    fn home_is_known() {
        assert!(Environment::new().home_dir().is_some());
    }
}
