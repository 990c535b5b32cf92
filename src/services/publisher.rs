// src/services/publisher.rs

//! Outbound message publishing.
//!
//! Messages are handed to an external command (by default `noscl publish`)
//! as one argv entry. No shell is involved, so the text needs no quoting.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::PublisherConfig;

/// A sink that accepts one message per call.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a single message. `Err` means this attempt failed.
    async fn publish(&self, message: &str) -> Result<()>;
}

/// Runs a command once per message; exit status 0 means success.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandPublisher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    /// Build from `[publisher]` settings.
    pub fn from_config(config: &PublisherConfig) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| AppError::config("publisher.command is empty"))?;

        let mut publisher = Self::new(program.clone(), args.to_vec());
        publisher.timeout = config.timeout_secs.map(Duration::from_secs);
        Ok(publisher)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn command(&self, message: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Publisher for CommandPublisher {
    async fn publish(&self, message: &str) -> Result<()> {
        let mut cmd = self.command(message);
        let run = cmd.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                AppError::publish(format!(
                    "{} timed out after {}s",
                    self.program,
                    limit.as_secs()
                ))
            })??,
            None => run.await?,
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err(AppError::publish(format!(
                "{} exited with {}",
                self.program, output.status
            )))
        } else {
            Err(AppError::publish(format!(
                "{} exited with {}: {}",
                self.program, output.status, stderr
            )))
        }
    }
}
