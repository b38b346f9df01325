use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::config::{Config, Paths};
use crate::prd::TaskList;
use crate::render;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
    Json,
}

impl OutputFormat {
    /// Same order as the run trace, with `FORMAT=json` also accepted.
    pub fn detect(explicit: Option<Self>) -> Self {
        if let Some(fmt) = explicit {
            return fmt;
        }
        if std::env::var("FORMAT").as_deref() == Ok("json") {
            return Self::Json;
        }
        match render::OutputFormat::detect(None) {
            render::OutputFormat::Pretty => Self::Pretty,
            render::OutputFormat::Text => Self::Text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub initialized: bool,
    pub agent_cmd: String,
    pub model: String,
    pub iterations: u32,
    pub files: Vec<FileStatus>,
    pub stories: StorySummary,
}

#[derive(Debug, Serialize)]
pub struct FileStatus {
    pub path: String,
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct StorySummary {
    pub total: usize,
    pub done: usize,
    pub incomplete: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusArgs {
    pub fn execute(&self, project_root: Option<PathBuf>) -> anyhow::Result<()> {
        let root = crate::config::resolve_root(project_root)?;
        let config = Config::load(&root)?;

        let format = OutputFormat::detect(self.format);

        let report = build_report(&config);
        let mut out = std::io::stdout().lock();
        match format {
            OutputFormat::Pretty => print_pretty(&mut out, &report)?,
            OutputFormat::Text => print_text(&mut out, &report)?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        }
        Ok(())
    }
}

pub fn build_report(config: &Config) -> StatusReport {
    let paths = &config.paths;
    StatusReport {
        initialized: paths.is_initialized(),
        agent_cmd: config.agent_cmd.display().to_string(),
        model: config.model.clone(),
        iterations: config.iterations,
        files: file_statuses(paths),
        stories: story_summary(paths),
    }
}

fn file_statuses(paths: &Paths) -> Vec<FileStatus> {
    [&paths.init_prompt, &paths.prompt, &paths.prd]
        .into_iter()
        .map(|p| FileStatus {
            path: p
                .strip_prefix(&paths.root)
                .unwrap_or(p.as_path())
                .display()
                .to_string(),
            exists: p.exists(),
        })
        .collect()
}

fn story_summary(paths: &Paths) -> StorySummary {
    let empty = |error: Option<String>| StorySummary {
        total: 0,
        done: 0,
        incomplete: Vec::new(),
        error,
    };
    if !paths.prd.exists() {
        return empty(None);
    }
    match TaskList::load(&paths.prd) {
        Ok(list) => StorySummary {
            total: list.stories.len(),
            done: list.done_count(),
            incomplete: list.incomplete().map(|s| s.label()).collect(),
            error: None,
        },
        Err(e) => empty(Some(format!("{e:#}"))),
    }
}

fn print_pretty(out: &mut impl Write, report: &StatusReport) -> std::io::Result<()> {
    writeln!(out, "=== Ralph Status ===\n")?;
    writeln!(
        out,
        "Initialized: {}",
        if report.initialized { "yes" } else { "no (run `ralph init`)" }
    )?;
    writeln!(out, "Agent: {}", report.agent_cmd)?;
    writeln!(out, "Model: {}  (max {} iterations)", report.model, report.iterations)?;

    writeln!(out, "\nFiles:")?;
    for file in &report.files {
        let mark = if file.exists { "\u{2713}" } else { "\u{2717}" };
        writeln!(out, "  {mark} {}", file.path)?;
    }

    let stories = &report.stories;
    if let Some(err) = &stories.error {
        writeln!(out, "\nStories: unreadable ({err})")?;
        return Ok(());
    }
    writeln!(out, "\nStories: {}/{} passing", stories.done, stories.total)?;
    for label in &stories.incomplete {
        writeln!(out, "  \u{2022} {label}")?;
    }
    Ok(())
}

fn print_text(out: &mut impl Write, report: &StatusReport) -> std::io::Result<()> {
    writeln!(out, "ralph-status")?;
    writeln!(out, "initialized  value={}", report.initialized)?;
    writeln!(
        out,
        "config  agent={}  model={}  iterations={}",
        report.agent_cmd, report.model, report.iterations
    )?;
    for file in &report.files {
        writeln!(out, "file  path={}  exists={}", file.path, file.exists)?;
    }
    let stories = &report.stories;
    match &stories.error {
        Some(err) => writeln!(out, "stories  error={err}")?,
        None => writeln!(out, "stories  total={}  done={}", stories.total, stories.done)?,
    }
    for label in &stories.incomplete {
        writeln!(out, "incomplete  story={label}")?;
    }
    Ok(())
}
