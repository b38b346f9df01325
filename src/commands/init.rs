use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{Config, Paths};
use crate::error::ExitError;
use crate::subprocess::{Agent, ClaudeAgent};

#[derive(Debug, Args)]
pub struct InitArgs {}

impl InitArgs {
    pub fn execute(&self, project_root: Option<PathBuf>) -> Result<()> {
        let root = crate::config::resolve_root(project_root)?;
        let config = Config::load(&root)?;

        // The interactive agent owns Ctrl-C while it runs
        let _ = ctrlc::set_handler(|| tracing::debug!("interrupt left to the agent"));

        let agent = ClaudeAgent::new(&config.agent_cmd, &config.paths.root);
        bootstrap(&config.paths, &agent, &mut std::io::stdout(), confirm_initialized)?;
        Ok(())
    }
}

/// Outcome of a successful `ralph init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    AlreadyInitialized,
    /// The agent created the marker itself.
    CreatedByAgent,
    /// The operator confirmed and ralph created the marker.
    Confirmed,
}

/// Run the bootstrap prompt once, guarded by the init marker.
pub fn bootstrap<A, W, F>(paths: &Paths, agent: &A, out: &mut W, confirm: F) -> Result<InitStatus>
where
    A: Agent,
    W: Write,
    F: FnOnce() -> Result<bool>,
{
    if paths.is_initialized() {
        writeln!(
            out,
            "Already initialized. To re-run: rm {} && ralph init",
            paths.marker.display()
        )?;
        return Ok(InitStatus::AlreadyInitialized);
    }

    writeln!(out, "Ralph - Project Initializer")?;
    writeln!(out, "===========================\n")?;

    if !paths.init_prompt.exists() {
        return Err(ExitError::MissingResource {
            path: paths.init_prompt.clone(),
        }
        .into());
    }
    let prompt = std::fs::read_to_string(&paths.init_prompt)
        .with_context(|| format!("reading {}", paths.init_prompt.display()))?;
    out.flush()?;

    let exit = agent.run_interactive(&prompt)?;
    if !exit.success() {
        tracing::warn!(exit_code = ?exit.code, "agent exited unsuccessfully during init");
    }

    if paths.is_initialized() {
        writeln!(out, "\nDone! Run `ralph run` to start coding.")?;
        return Ok(InitStatus::CreatedByAgent);
    }

    out.flush()?;
    if confirm()? {
        std::fs::write(&paths.marker, "")
            .with_context(|| format!("creating {}", paths.marker.display()))?;
        writeln!(out, "\nDone! Run `ralph run` to start coding.")?;
        Ok(InitStatus::Confirmed)
    } else {
        writeln!(out, "\nRun `ralph init` again to retry.")?;
        Err(ExitError::InitDeclined.into())
    }
}

const CONFIRM_PROMPT: &str = "Did initialization complete?";

/// Ask the operator whether bootstrap finished. Uses a dialoguer prompt on a
/// terminal and reads a `y`/`n` line from piped stdin otherwise.
fn confirm_initialized() -> Result<bool> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return prompt_confirm(CONFIRM_PROMPT, false);
    }
    print!("\n{CONFIRM_PROMPT} (y/n) ");
    std::io::stdout().flush()?;
    read_yes(stdin.lock())
}

fn prompt_confirm(prompt: &str, default: bool) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .context("reading user confirmation")
}

fn read_yes(mut input: impl BufRead) -> Result<bool> {
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("reading user confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::subprocess::AgentExit;

    struct FakeAgent {
        calls: Cell<u32>,
        creates_marker: Option<PathBuf>,
    }

    impl FakeAgent {
        fn new(creates_marker: Option<PathBuf>) -> Self {
            Self {
                calls: Cell::new(0),
                creates_marker,
            }
        }
    }

    impl Agent for FakeAgent {
        fn run_interactive(&self, prompt: &str) -> Result<AgentExit> {
            assert_eq!(prompt, "set up the project");
            self.calls.set(self.calls.get() + 1);
            if let Some(marker) = &self.creates_marker {
                std::fs::write(marker, "").unwrap();
            }
            Ok(AgentExit { code: Some(0) })
        }

        fn run_streaming(
            &self,
            _prompt: &str,
            _model: &str,
            _on_line: &mut dyn FnMut(&str) -> Result<()>,
        ) -> Result<AgentExit> {
            unreachable!("init only runs interactively")
        }
    }

    fn project(with_prompt: bool) -> (tempfile::TempDir, Paths) {
        let dir = tempfile::tempdir().unwrap();
        if with_prompt {
            std::fs::write(dir.path().join("init-prompt.md"), "set up the project").unwrap();
        }
        let paths = Paths::new(dir.path());
        (dir, paths)
    }

    fn never_asked() -> Result<bool> {
        panic!("confirmation should not be requested")
    }

    #[test]
    fn already_initialized_is_a_noop() {
        let (_dir, paths) = project(true);
        std::fs::write(&paths.marker, "").unwrap();
        let agent = FakeAgent::new(None);
        let mut out = Vec::new();

        let status = bootstrap(&paths, &agent, &mut out, never_asked).unwrap();
        assert_eq!(status, InitStatus::AlreadyInitialized);
        assert_eq!(agent.calls.get(), 0);
        assert!(String::from_utf8(out).unwrap().starts_with("Already initialized."));
    }

    #[test]
    fn agent_creates_marker() {
        let (_dir, paths) = project(true);
        let agent = FakeAgent::new(Some(paths.marker.clone()));
        let mut out = Vec::new();

        let status = bootstrap(&paths, &agent, &mut out, never_asked).unwrap();
        assert_eq!(status, InitStatus::CreatedByAgent);
        assert_eq!(agent.calls.get(), 1);

        // Second run spawns nothing
        let status = bootstrap(&paths, &agent, &mut Vec::new(), never_asked).unwrap();
        assert_eq!(status, InitStatus::AlreadyInitialized);
        assert_eq!(agent.calls.get(), 1);
    }

    #[test]
    fn operator_confirmation_creates_marker() {
        let (_dir, paths) = project(true);
        let agent = FakeAgent::new(None);

        let status = bootstrap(&paths, &agent, &mut Vec::new(), || Ok(true)).unwrap();
        assert_eq!(status, InitStatus::Confirmed);
        assert!(paths.marker.exists());
        assert_eq!(std::fs::metadata(&paths.marker).unwrap().len(), 0);
    }

    #[test]
    fn operator_decline_fails_without_marker() {
        let (_dir, paths) = project(true);
        let agent = FakeAgent::new(None);
        let mut out = Vec::new();

        let err = bootstrap(&paths, &agent, &mut out, || Ok(false)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>(),
            Some(ExitError::InitDeclined)
        ));
        assert!(!paths.marker.exists());
        assert!(String::from_utf8(out).unwrap().contains("again to retry"));
    }

    #[test]
    fn missing_init_prompt_spawns_nothing() {
        let (_dir, paths) = project(false);
        let agent = FakeAgent::new(None);

        let err = bootstrap(&paths, &agent, &mut Vec::new(), never_asked).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>(),
            Some(ExitError::MissingResource { path }) if *path == paths.init_prompt
        ));
        assert_eq!(agent.calls.get(), 0);
    }

    #[test]
    fn read_yes_accepts_y_and_yes() {
        assert!(read_yes("y\n".as_bytes()).unwrap());
        assert!(read_yes("YES\n".as_bytes()).unwrap());
        assert!(!read_yes("n\n".as_bytes()).unwrap());
        assert!(!read_yes("".as_bytes()).unwrap());
        assert!(!read_yes("sure\n".as_bytes()).unwrap());
    }
}
