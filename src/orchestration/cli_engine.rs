//! Container engine driven through the podman/docker CLI
//!
//! Both CLIs accept the same `pull`/`create`/`start`/`wait`/`logs`/`rm`
//! verbs, so one implementation covers either. Child processes are killed
//! when their future is dropped, which is how lifecycle timeouts cancel a
//! hung call.

use crate::config::EngineKind;
use crate::error::{KilnError, KilnResult};
use crate::orchestration::engine::{ContainerEngine, ContainerSpec};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Container engine backed by an engine executable
pub struct CliEngine {
    kind: EngineKind,
    binary: String,
}

impl CliEngine {
    /// Create an engine using the kind's default executable
    pub fn new(kind: EngineKind) -> Self {
        Self::with_binary(kind, kind.binary())
    }

    /// Create an engine using an explicit executable path
    pub fn with_binary(kind: EngineKind, binary: impl Into<String>) -> Self {
        Self {
            kind,
            binary: binary.into(),
        }
    }

    /// Executable this engine invokes
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Execute an engine command and return the output
    async fn exec(&self, args: &[String]) -> KilnResult<Output> {
        debug!("Executing: {} {:?}", self.binary, args);

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    KilnError::EngineNotFound {
                        binary: self.binary.clone(),
                    }
                } else {
                    KilnError::command_failed(format!("{} {:?}", self.binary, args), e)
                }
            })
    }

    /// Build `create` arguments for a container spec
    fn create_args(spec: &ContainerSpec) -> Vec<String> {
        let mut args = vec!["create".to_string()];

        for mount in &spec.mounts {
            args.push("--mount".to_string());
            args.push(mount.mount_arg());
        }

        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());
        args
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn short_id(id: &str) -> &str {
    &id[..12.min(id.len())]
}

#[async_trait]
impl ContainerEngine for CliEngine {
    async fn pull_image(&self, image: &str) -> KilnResult<Vec<u8>> {
        let output = self.exec(&["pull".to_string(), image.to_string()]).await?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(KilnError::ImagePull {
                image: image.to_string(),
                reason: stderr_of(&output),
            })
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> KilnResult<String> {
        let output = self.exec(&Self::create_args(spec)).await?;

        if !output.status.success() {
            return Err(KilnError::ContainerCreate(stderr_of(&output)));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(KilnError::ContainerCreate(
                "engine returned no container ID".to_string(),
            ));
        }
        debug!("Container created: {}", short_id(&id));
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> KilnResult<()> {
        let output = self.exec(&["start".to_string(), id.to_string()]).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(KilnError::ContainerStart {
                id: id.to_string(),
                reason: stderr_of(&output),
            })
        }
    }

    async fn wait_container(&self, id: &str) -> KilnResult<i64> {
        let output = self.exec(&["wait".to_string(), id.to_string()]).await?;

        if !output.status.success() {
            return Err(KilnError::ContainerWait {
                id: id.to_string(),
                reason: stderr_of(&output),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // podman prints one code per waited container
        let code = stdout.lines().last().unwrap_or_default().trim();
        code.parse::<i64>().map_err(|_| KilnError::ContainerWait {
            id: id.to_string(),
            reason: format!("unexpected exit status '{}'", code),
        })
    }

    async fn container_logs(&self, id: &str) -> KilnResult<Vec<u8>> {
        let output = self.exec(&["logs".to_string(), id.to_string()]).await?;

        if output.status.success() {
            if !output.stderr.is_empty() {
                debug!("Container stderr:\n{}", String::from_utf8_lossy(&output.stderr));
            }
            Ok(output.stdout)
        } else {
            Err(KilnError::LogRetrieval {
                id: id.to_string(),
                reason: stderr_of(&output),
            })
        }
    }

    async fn remove_container(&self, id: &str) -> KilnResult<()> {
        debug!("Removing container: {}", short_id(id));

        let output = self
            .exec(&["rm".to_string(), "-f".to_string(), id.to_string()])
            .await?;

        if output.status.success() {
            return Ok(());
        }

        // Ignore error if container doesn't exist
        let stderr = stderr_of(&output);
        if stderr.to_lowercase().contains("no such container") {
            Ok(())
        } else {
            Err(KilnError::ContainerRemove {
                id: id.to_string(),
                reason: stderr,
            })
        }
    }

    fn engine_name(&self) -> &'static str {
        self.kind.name()
    }
}
