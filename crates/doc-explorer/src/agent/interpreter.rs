//! Locating the interpreter binary used to run generated code

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[cfg(windows)]
const DENO_EXE: &str = "deno.exe";
#[cfg(not(windows))]
const DENO_EXE: &str = "deno";

/// Interpreter discovery.
///
/// Candidates, in order: configured override, `deno` on `PATH`,
/// `DENO_BIN` (with `~` expansion), `~/.deno/bin/deno`.
#[derive(Debug, Clone, Default)]
pub struct InterpreterLocator {
    override_path: Option<PathBuf>,
    path_var: Option<OsString>,
    deno_bin: Option<String>,
    home: Option<PathBuf>,
}

impl InterpreterLocator {
    /// Locator reading the process environment
    pub fn from_env(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            path_var: std::env::var_os("PATH"),
            deno_bin: std::env::var("DENO_BIN").ok(),
            home: dirs::home_dir(),
        }
    }

    /// Locator with no environment, only the override
    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self {
            override_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn path_var(mut self, path_var: impl Into<OsString>) -> Self {
        self.path_var = Some(path_var.into());
        self
    }

    pub fn deno_bin(mut self, deno_bin: impl Into<String>) -> Self {
        self.deno_bin = Some(deno_bin.into());
        self
    }

    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Candidate paths in resolution order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(path) = &self.override_path {
            candidates.push(self.expand_home(path));
        }
        if let Some(path_var) = &self.path_var {
            candidates.extend(std::env::split_paths(path_var).map(|dir| dir.join(DENO_EXE)));
        }
        if let Some(deno_bin) = self.deno_bin.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            candidates.push(self.expand_home(Path::new(deno_bin)));
        }
        if let Some(home) = &self.home {
            candidates.push(home.join(".deno").join("bin").join(DENO_EXE));
        }

        candidates
    }

    /// First existing candidate
    pub fn locate(&self) -> Result<PathBuf> {
        self.candidates()
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| {
                Error::InterpreterUnavailable(
                    "Deno is required to run the reasoning sandbox but was not found. \
                     Install Deno (https://deno.land) or set DENO_BIN to the deno executable."
                        .to_string(),
                )
            })
    }

    fn expand_home(&self, path: &Path) -> PathBuf {
        match (path.strip_prefix("~"), &self.home) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_deno(dir: &Path) -> PathBuf {
        let path = dir.join(DENO_EXE);
        fs::write(&path, b"#!/bin/sh\n").unwrap();
        path
    }

    #[test]
    fn test_override_wins() {
        let dir = TempDir::new().unwrap();
        let bin = fake_deno(dir.path());
        let path_dir = TempDir::new().unwrap();
        fake_deno(path_dir.path());

        let found = InterpreterLocator::with_override(&bin)
            .path_var(path_dir.path().as_os_str())
            .locate()
            .unwrap();
        assert_eq!(found, bin);
    }

    #[test]
    fn test_found_on_path() {
        let path_dir = TempDir::new().unwrap();
        let bin = fake_deno(path_dir.path());

        let found = InterpreterLocator::default()
            .path_var(path_dir.path().as_os_str())
            .locate()
            .unwrap();
        assert_eq!(found, bin);
    }

    #[test]
    fn test_deno_bin_expands_home() {
        let home = TempDir::new().unwrap();
        let tools = home.path().join("tools");
        fs::create_dir_all(&tools).unwrap();
        let bin = fake_deno(&tools);

        let found = InterpreterLocator::default()
            .home(home.path())
            .deno_bin(format!("~/tools/{}", DENO_EXE))
            .locate()
            .unwrap();
        assert_eq!(found, bin);
    }

    #[test]
    fn test_home_install_location() {
        let home = TempDir::new().unwrap();
        let bin_dir = home.path().join(".deno").join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        let bin = fake_deno(&bin_dir);

        let found = InterpreterLocator::default().home(home.path()).locate().unwrap();
        assert_eq!(found, bin);
    }

    #[test]
    fn test_missing_interpreter() {
        let empty = TempDir::new().unwrap();
        let err = InterpreterLocator::with_override(empty.path().join("nope"))
            .path_var(empty.path().as_os_str())
            .home(empty.path())
            .locate()
            .unwrap_err();
        match err {
            Error::InterpreterUnavailable(message) => assert!(message.contains("DENO_BIN")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
