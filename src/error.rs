use std::path::PathBuf;
use std::process::ExitCode;

/// Errors that cause ralph to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("not initialized ({}): run `ralph init` first", .marker.display())]
    NotInitialized { marker: PathBuf },

    #[error("{} not found", .path.display())]
    MissingResource { path: PathBuf },

    #[error("initialization was not confirmed")]
    InitDeclined,

    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("reached max iterations ({iterations}) with stories still incomplete")]
    Exhausted { iterations: u32 },

    #[error("interrupted after {iterations} iteration(s)")]
    Interrupted { iterations: u32 },
}

impl ExitError {
    /// Raw process exit status for this error.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::ToolNotFound { .. } => 3,
            Self::Interrupted { .. } => 130,
            Self::NotInitialized { .. }
            | Self::MissingResource { .. }
            | Self::InitDeclined
            | Self::Exhausted { .. } => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
