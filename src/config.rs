use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;

/// Optional per-project config file.
pub const CONFIG_TOML: &str = ".ralph.toml";
/// Zero-byte flag created once bootstrap succeeded.
pub const INIT_MARKER: &str = ".ralph-initialized";
/// Task list written and updated by the agent.
pub const PRD_FILE: &str = "prd.json";
/// Prompt sent on every loop iteration.
pub const PROMPT_FILE: &str = "prompt.md";
/// Prompt sent once by `ralph init`.
pub const INIT_PROMPT_FILE: &str = "init-prompt.md";

/// Environment variable overriding the agent executable.
pub const AGENT_CMD_ENV: &str = "CLAUDE_CMD";

pub const DEFAULT_MODEL: &str = "opus";
pub const DEFAULT_ITERATIONS: u32 = 10;

/// Contents of `.ralph.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Path to the agent executable (`~/` is expanded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_cmd: Option<String>,
    /// Model passed to the agent in `ralph run`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Default iteration budget for `ralph run`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

impl FileConfig {
    /// Load `.ralph.toml` from `root`, or defaults when the file is absent.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_TOML);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents).map_err(|e| {
            anyhow::Error::from(ExitError::Config(format!("invalid {}: {e}", path.display())))
        })
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }
}

/// Locations of the files ralph reads and writes, all under the project root.
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub marker: PathBuf,
    pub prd: PathBuf,
    pub prompt: PathBuf,
    pub init_prompt: PathBuf,
}

impl Paths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            marker: root.join(INIT_MARKER),
            prd: root.join(PRD_FILE),
            prompt: root.join(PROMPT_FILE),
            init_prompt: root.join(INIT_PROMPT_FILE),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.marker.exists()
    }
}

/// Resolved runtime configuration, built once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub paths: Paths,
    pub agent_cmd: PathBuf,
    pub model: String,
    pub iterations: u32,
}

impl Config {
    /// Resolve config for `root` from `.ralph.toml` and the environment.
    ///
    /// Precedence for the agent executable: `CLAUDE_CMD` > `.ralph.toml` >
    /// `~/.claude/local/claude`. CLI flags are applied by the caller with
    /// [`Config::with_overrides`].
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let file = FileConfig::load(root)?;
        let env_cmd = std::env::var(AGENT_CMD_ENV).ok().filter(|v| !v.is_empty());
        let config = Self::from_parts(root, &file, env_cmd, dirs::home_dir().as_deref());
        tracing::debug!(
            root = %config.paths.root.display(),
            agent_cmd = %config.agent_cmd.display(),
            model = %config.model,
            iterations = config.iterations,
            "resolved config"
        );
        Ok(config)
    }

    pub fn from_parts(
        root: &Path,
        file: &FileConfig,
        env_cmd: Option<String>,
        home: Option<&Path>,
    ) -> Self {
        let agent_cmd = env_cmd
            .or_else(|| file.agent_cmd.clone())
            .map_or_else(|| default_agent_cmd(home), |cmd| expand_home(&cmd, home));

        Self {
            paths: Paths::new(root),
            agent_cmd,
            model: file
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            iterations: file.iterations.unwrap_or(DEFAULT_ITERATIONS).max(1),
        }
    }

    /// Apply command-line values, which win over everything else.
    #[must_use]
    pub fn with_overrides(mut self, model: Option<String>, iterations: Option<u32>) -> Self {
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(n) = iterations {
            self.iterations = n;
        }
        self
    }
}

fn default_agent_cmd(home: Option<&Path>) -> PathBuf {
    home.map_or_else(
        || PathBuf::from("claude"),
        |h| h.join(".claude").join("local").join("claude"),
    )
}

fn expand_home(cmd: &str, home: Option<&Path>) -> PathBuf {
    match (cmd.strip_prefix("~/"), home) {
        (Some(rest), Some(h)) => h.join(rest),
        _ => PathBuf::from(cmd),
    }
}

/// Resolve the project root: explicit flag, else the current directory.
pub fn resolve_root(project_root: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let root = match project_root {
        Some(p) => p,
        None => std::env::current_dir().context("determining project root")?,
    };
    Ok(root.canonicalize().unwrap_or(root))
}
