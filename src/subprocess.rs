use std::io::{BufRead, BufReader, PipeReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::Context;

use crate::error::ExitError;

/// How the agent is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentMode {
    /// Attached to the terminal; nothing is captured.
    Interactive,
    /// Non-interactive print mode emitting one JSON event per line.
    Streaming { model: String },
}

/// Exit of one agent invocation. Never interpreted by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentExit {
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
}

impl AgentExit {
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// The seam between the iteration loop and the agent process.
pub trait Agent {
    /// Run the agent attached to the terminal and wait for it to exit.
    fn run_interactive(&self, prompt: &str) -> anyhow::Result<AgentExit>;

    /// Run the agent in streaming mode, handing each output line to `on_line`
    /// as soon as it is read. Returns once the child has exited.
    fn run_streaming(
        &self,
        prompt: &str,
        model: &str,
        on_line: &mut dyn FnMut(&str) -> anyhow::Result<()>,
    ) -> anyhow::Result<AgentExit>;
}

/// Builds argument vectors for the agent CLI.
pub fn build_args(prompt: &str, mode: &AgentMode) -> Vec<String> {
    match mode {
        AgentMode::Interactive => vec![
            "--dangerously-skip-permissions".to_string(),
            prompt.to_string(),
        ],
        AgentMode::Streaming { model } => vec![
            "--print".to_string(),
            prompt.to_string(),
            "--model".to_string(),
            model.clone(),
            "--dangerously-skip-permissions".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ],
    }
}

/// The real agent executable, always run from the project root.
#[derive(Debug, Clone)]
pub struct ClaudeAgent {
    program: PathBuf,
    cwd: PathBuf,
}

impl ClaudeAgent {
    pub fn new(program: &Path, cwd: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            cwd: cwd.to_path_buf(),
        }
    }

    fn command(&self, prompt: &str, mode: &AgentMode) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(build_args(prompt, mode)).current_dir(&self.cwd);
        cmd
    }

    /// Spawn in streaming mode with stdout and stderr merged into one pipe.
    pub fn spawn_streaming(&self, prompt: &str, model: &str) -> anyhow::Result<AgentStream> {
        let cmd = self.command(
            prompt,
            &AgentMode::Streaming {
                model: model.to_string(),
            },
        );
        tracing::debug!(program = %self.program.display(), model, "spawning agent (streaming)");
        self.spawn_merged(cmd)
    }

    fn spawn_merged(&self, mut cmd: Command) -> anyhow::Result<AgentStream> {
        let (reader, writer) = std::io::pipe().context("creating agent output pipe")?;
        cmd.stdin(Stdio::null())
            .stdout(writer.try_clone().context("cloning agent output pipe")?)
            .stderr(writer);

        let spawned = cmd.spawn();
        // The command holds the write ends; the stream only reaches EOF once
        // every copy outside the child is closed.
        drop(cmd);
        let child = spawned.map_err(|e| self.not_found_or_other(e))?;

        Ok(AgentStream {
            child,
            reader: BufReader::new(reader),
            buf: Vec::new(),
        })
    }

    fn not_found_or_other(&self, e: std::io::Error) -> anyhow::Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExitError::ToolNotFound {
                tool: self.program.display().to_string(),
            }
            .into()
        } else {
            anyhow::Error::new(e).context(format!("running {}", self.program.display()))
        }
    }
}

impl Agent for ClaudeAgent {
    fn run_interactive(&self, prompt: &str) -> anyhow::Result<AgentExit> {
        tracing::debug!(program = %self.program.display(), "spawning agent (interactive)");
        let status = self
            .command(prompt, &AgentMode::Interactive)
            .status()
            .map_err(|e| self.not_found_or_other(e))?;
        Ok(AgentExit {
            code: status.code(),
        })
    }

    fn run_streaming(
        &self,
        prompt: &str,
        model: &str,
        on_line: &mut dyn FnMut(&str) -> anyhow::Result<()>,
    ) -> anyhow::Result<AgentExit> {
        self.spawn_streaming(prompt, model)?.drain(on_line)
    }
}

/// Merged output of a streaming agent, read one line at a time.
pub struct AgentStream {
    child: Child,
    reader: BufReader<PipeReader>,
    buf: Vec<u8>,
}

impl AgentStream {
    /// Block until the next full line arrives. `None` once the child closed
    /// its output. Invalid UTF-8 is replaced rather than rejected.
    pub fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .context("reading agent output")?;
        if n == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    /// Hand every line to `on_line` as soon as it is read, then wait for the
    /// child. A read or callback error kills the child before returning.
    pub fn drain(
        mut self,
        on_line: &mut dyn FnMut(&str) -> anyhow::Result<()>,
    ) -> anyhow::Result<AgentExit> {
        let pumped = loop {
            match self.next_line() {
                Ok(Some(line)) => {
                    if let Err(e) = on_line(&line) {
                        break Err(e);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        match pumped {
            Ok(()) => self.wait(),
            Err(e) => {
                self.kill();
                Err(e)
            }
        }
    }

    /// Wait for the child to exit.
    pub fn wait(mut self) -> anyhow::Result<AgentExit> {
        let status = self.child.wait().context("waiting for agent")?;
        tracing::debug!(exit_code = ?status.code(), "agent exited");
        Ok(AgentExit {
            code: status.code(),
        })
    }

    fn kill(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Iterator for AgentStream {
    type Item = anyhow::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}
