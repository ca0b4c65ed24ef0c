//! External tool invocation (samtools, bedtools).
//!
//! Commands are described by a [`ToolInvocation`] and executed by a
//! [`ToolRunner`]. The batch driver only talks to the trait, so tests swap
//! in a runner that records invocations instead of spawning processes.

use crate::error::{ChecseqError, Result};
use log::debug;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// One external command line, with optional stdout redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<OsString>,
    /// Write the tool's stdout to this file instead of inheriting it.
    pub stdout: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Redirect stdout into `path`.
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Value following `flag` in the argument list.
    pub fn arg_value(&self, flag: &str) -> Option<&OsString> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        if let Some(path) = &self.stdout {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

/// Executes external tools.
pub trait ToolRunner {
    /// Run the invocation to completion and return its exit status.
    ///
    /// Errors are reserved for failures to start the tool or to set up its
    /// redirection; a tool that runs and fails reports it via the status.
    fn run(&self, invocation: &ToolInvocation) -> Result<ExitStatus>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &ToolInvocation) -> Result<ExitStatus> {
        (**self).run(invocation)
    }
}

/// Runs tools as child processes found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ExitStatus> {
        debug!("Running {}", invocation);

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());
        if let Some(path) = &invocation.stdout {
            let file = File::create(path)?;
            command.stdout(Stdio::from(file));
        }

        command.status().map_err(|e| {
            ChecseqError::external(
                &invocation.program,
                format!("could not execute '{}': {}", invocation.program, e),
            )
        })
    }
}

/// Run a tool and turn a non-zero exit into an error.
pub fn run_checked<R: ToolRunner + ?Sized>(runner: &R, invocation: &ToolInvocation) -> Result<()> {
    let status = runner.run(invocation)?;
    if !status.success() {
        return Err(ChecseqError::external(
            &invocation.program,
            format!("'{}' exited with {}", invocation, status),
        ));
    }
    Ok(())
}

/// Check that a tool left its expected output behind.
pub fn require_output(tool: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ChecseqError::external(
            tool,
            format!("expected output file {} was not created", path.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = ToolInvocation::new("bedtools")
            .args(["bamtobed", "-bedpe", "-mate1", "-i", "s1.bam.sort"])
            .stdout_to("s1.bedpe");
        assert_eq!(
            inv.to_string(),
            "bedtools bamtobed -bedpe -mate1 -i s1.bam.sort > s1.bedpe"
        );
        assert_eq!(inv.arg_value("-i"), Some(&OsString::from("s1.bam.sort")));
        assert_eq!(inv.arg_value("-o"), None);
    }

    #[test]
    fn test_require_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bed");
        let err = require_output("bedtools", &path).unwrap_err();
        assert!(err.to_string().starts_with("bedtools failed: expected output file"));

        std::fs::write(&path, "").unwrap();
        assert!(require_output("bedtools", &path).is_ok());
    }

    #[test]
    fn test_missing_program_is_external_error() {
        let inv = ToolInvocation::new("checseq-no-such-tool-xyz").arg("--help");
        let err = SystemRunner.run(&inv).unwrap_err();
        match err {
            ChecseqError::ExternalTool { tool, .. } => assert_eq!(tool, "checseq-no-such-tool-xyz"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_redirect_and_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.txt");
        let inv = ToolInvocation::new("echo").arg("hello").stdout_to(&path);
        run_checked(&SystemRunner, &inv).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");

        let err = run_checked(&SystemRunner, &ToolInvocation::new("false")).unwrap_err();
        assert!(err.to_string().starts_with("false failed: 'false' exited with"));
    }
}
