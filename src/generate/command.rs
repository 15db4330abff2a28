//! Runs the generation engine as a child process

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

use crate::error::{Error, Result};

use super::{ExampleGenerator, GenerationRequest};

/// Engine executable used when none is configured
pub const DEFAULT_ENGINE_COMMAND: &str = "skai-generate-examples";

/// Spawns an engine executable and feeds it the request as JSON on stdin.
///
/// The raster environment is also exported to the child, so an engine that
/// reads its settings from the process environment picks them up directly.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Creates a generator for the given program and arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parses a whitespace-separated command line
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let (program, args) = split_command_line(command_line)?;
        Ok(Self::new(program, args))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Splits a command line into program and arguments
pub(crate) fn split_command_line(command_line: &str) -> Result<(String, Vec<String>)> {
    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| Error::config("Engine command must not be empty"))?;
    Ok((program, parts.collect()))
}

async fn feed_stdin(mut stdin: ChildStdin, payload: &[u8]) -> std::io::Result<()> {
    stdin.write_all(payload).await?;
    stdin.shutdown().await
}

/// Runs `program` with `payload` on stdin and waits for it to exit.
///
/// The child is always waited on; a failed exit status is reported before
/// a failed write.
pub(crate) async fn run_with_stdin(
    program: &str,
    args: &[String],
    envs: &BTreeMap<String, String>,
    payload: &[u8],
) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .envs(envs)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Engine(format!("Failed to start \"{}\": {}", program, e)))?;

    let written = match child.stdin.take() {
        Some(stdin) => feed_stdin(stdin, payload).await,
        None => Ok(()),
    };

    let status = child.wait().await?;
    if !status.success() {
        return Err(Error::Engine(format!("\"{}\" exited with {}", program, status)));
    }
    written?;

    Ok(())
}

#[async_trait]
impl ExampleGenerator for CommandGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<()> {
        let payload = serde_json::to_vec(request)?;
        run_with_stdin(&self.program, &self.args, &request.raster_env, &payload).await
    }
}
