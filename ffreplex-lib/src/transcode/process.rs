//! External process launching for transcode jobs

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use serde::Serialize;

use crate::transcode::command::Command;

/// How a launched command ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    /// Exit code, `None` when the process could not be started or was killed
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Merged stdout and stderr
    pub output: String,
}

impl ProcessOutcome {
    pub fn exited(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            success: exit_code == 0,
            output: output.into(),
        }
    }

    pub fn failed_to_start(message: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            success: false,
            output: message.into(),
        }
    }
}

pub type LaunchFuture = Pin<Box<dyn Future<Output = ProcessOutcome> + Send + 'static>>;

/// Runs one command to completion.
///
/// Dropping the returned future must stop the underlying process.
pub trait ProcessLauncher: Send + Sync + 'static {
    fn launch(&self, command: &Command) -> LaunchFuture;
}

/// Launches ffmpeg through `tokio::process`
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: PathBuf,
}

impl CommandLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl Default for CommandLauncher {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl ProcessLauncher for CommandLauncher {
    fn launch(&self, command: &Command) -> LaunchFuture {
        let program = self.program.clone();
        let args = command.to_args();
        let output_dir = command.output.parent().map(|p| p.to_path_buf());

        Box::pin(async move {
            if let Some(dir) = output_dir.filter(|d| !d.as_os_str().is_empty()) {
                if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                    return ProcessOutcome::failed_to_start(format!(
                        "cannot create {}: {}",
                        dir.display(),
                        e
                    ));
                }
            }

            let mut cmd = tokio::process::Command::new(&program);
            cmd.args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            tracing::trace!("{} {}", program.display(), args.join(" "));

            match cmd.output().await {
                Ok(out) => {
                    let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
                    output.push_str(&String::from_utf8_lossy(&out.stderr));
                    ProcessOutcome {
                        exit_code: out.status.code(),
                        success: out.status.success(),
                        output,
                    }
                }
                Err(e) => ProcessOutcome::failed_to_start(format!(
                    "failed to run {}: {}",
                    program.display(),
                    e
                )),
            }
        })
    }
}
