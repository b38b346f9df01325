use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Args;

use crate::config::{Config, Paths};
use crate::error::ExitError;
use crate::prd::has_incomplete_tasks;
use crate::render::{OutputFormat, Translator};
use crate::subprocess::{Agent, ClaudeAgent};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Maximum iterations (default: 10)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub iterations: Option<u32>,
    /// Model to use (default: opus)
    #[arg(long)]
    pub model: Option<String>,
    /// Trace format (pretty or text)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl RunArgs {
    pub fn execute(&self, project_root: Option<PathBuf>) -> anyhow::Result<()> {
        let root = crate::config::resolve_root(project_root)?;
        let config = Config::load(&root)?.with_overrides(self.model.clone(), self.iterations);

        let prompt = check_ready(&config.paths)?;

        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        let _ = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        });

        let agent = ClaudeAgent::new(&config.agent_cmd, &config.paths.root);
        let stdout = std::io::stdout().lock();
        let mut translator = Translator::new(stdout, OutputFormat::detect(self.format));

        let iteration_loop = IterationLoop {
            agent: &agent,
            prompt: &prompt,
            model: &config.model,
            max_iterations: config.iterations,
            task_list: &config.paths.prd,
            interrupted: &interrupted,
        };
        let outcome = iteration_loop.run(&mut translator)?;
        outcome.into_result()
    }
}

/// Verify `ralph init` has run and load the iteration prompt.
///
/// Nothing is spawned when this fails.
pub fn check_ready(paths: &Paths) -> anyhow::Result<String> {
    if !paths.is_initialized() {
        return Err(ExitError::NotInitialized {
            marker: paths.marker.clone(),
        }
        .into());
    }
    if !paths.prompt.exists() {
        return Err(ExitError::MissingResource {
            path: paths.prompt.clone(),
        }
        .into());
    }
    std::fs::read_to_string(&paths.prompt)
        .with_context(|| format!("reading {}", paths.prompt.display()))
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// The task list has no incomplete stories.
    Completed,
    /// Every iteration ran and stories remain.
    Exhausted,
    /// Ctrl-C arrived; no further iteration was started.
    Interrupted,
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub stop: LoopStop,
    pub iterations_used: u32,
}

impl LoopOutcome {
    pub fn into_result(self) -> anyhow::Result<()> {
        match self.stop {
            LoopStop::Completed => Ok(()),
            LoopStop::Exhausted => Err(ExitError::Exhausted {
                iterations: self.iterations_used,
            }
            .into()),
            LoopStop::Interrupted => Err(ExitError::Interrupted {
                iterations: self.iterations_used,
            }
            .into()),
        }
    }
}

/// Runs the agent until the task list is done or the budget is spent.
pub struct IterationLoop<'a, A: Agent> {
    pub agent: &'a A,
    pub prompt: &'a str,
    pub model: &'a str,
    pub max_iterations: u32,
    pub task_list: &'a Path,
    pub interrupted: &'a AtomicBool,
}

impl<A: Agent> IterationLoop<'_, A> {
    pub fn run<W: Write>(&self, translator: &mut Translator<W>) -> anyhow::Result<LoopOutcome> {
        let n = self.max_iterations;
        {
            let out = translator.out();
            writeln!(out, "Ralph - Coding Loop")?;
            writeln!(out, "===================")?;
            writeln!(out, "Max iterations: {n}")?;
            writeln!(out, "Model: {}", self.model)?;
        }

        for i in 1..=n {
            let _span = tracing::info_span!("iteration", i, max = n).entered();
            {
                let out = translator.out();
                writeln!(out, "\n>>> Iteration {i} of {n}")?;
                writeln!(out, "{}", "-".repeat(35))?;
                out.flush()?;
            }

            let exit = self
                .agent
                .run_streaming(self.prompt, self.model, &mut |line: &str| {
                    translator.render_line(line).context("writing trace")
                })?;
            if !exit.success() {
                tracing::warn!(exit_code = ?exit.code, "agent exited unsuccessfully");
            }

            if !has_incomplete_tasks(self.task_list) {
                let out = translator.out();
                writeln!(out, "\n===================")?;
                writeln!(out, "Ralph completed all stories after {i} iteration(s)")?;
                writeln!(out, "===================")?;
                out.flush()?;
                return Ok(LoopOutcome {
                    stop: LoopStop::Completed,
                    iterations_used: i,
                });
            }

            if self.interrupted.load(Ordering::SeqCst) {
                let out = translator.out();
                writeln!(out, "\nRalph interrupted after {i} iteration(s)")?;
                out.flush()?;
                return Ok(LoopOutcome {
                    stop: LoopStop::Interrupted,
                    iterations_used: i,
                });
            }

            writeln!(translator.out(), "\n>>> Iteration {i} complete, continuing...")?;
        }

        let out = translator.out();
        writeln!(out, "\n===================")?;
        writeln!(out, "Ralph reached max iterations ({n}) without completing")?;
        writeln!(out, "Check progress.txt and prd.json for status")?;
        writeln!(out, "===================")?;
        out.flush()?;
        Ok(LoopOutcome {
            stop: LoopStop::Exhausted,
            iterations_used: n,
        })
    }
}
