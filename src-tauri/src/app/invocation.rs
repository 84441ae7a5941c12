use std::fmt;

use serde::Serialize;

/// How the runner treats the spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Wait for exit (bounded by the timeout) and capture stdout + stderr.
    Captured,
    /// Spawn and report immediately; output is never read.
    Detached,
}

/// A fully parameterized command line, built once per user action and consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    mode: LaunchMode,
}

impl Invocation {
    pub fn captured<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            mode: LaunchMode::Captured,
        }
    }

    pub fn detached<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            mode: LaunchMode::Detached,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    /// The command line as an operator would type it into a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_for_display)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Shell-style quoting for display. `try_quote` refuses NUL bytes, which no shell can carry, so
/// those tokens are shown escaped instead.
fn quote_for_display(value: &str) -> String {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_else(|_| format!("{value:?}"))
}
