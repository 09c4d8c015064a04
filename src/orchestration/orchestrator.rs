//! Build orchestration
//!
//! Runs one build container through pull, create, start, wait and logs.
//! Every call is bounded by a timeout, and a created container is always
//! removed again. No stage is retried.

use crate::config::Timeouts;
use crate::error::{KilnError, KilnResult};
use crate::orchestration::engine::{BindMount, ContainerEngine, ContainerSpec};
use crate::orchestration::{log_tail, LifecycleStage};
use crate::request::BuildRequest;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Mount point of the input directory inside the container
pub const INPUT_MOUNT: &str = "/input";

/// Mount point of the output directory inside the container
pub const OUTPUT_MOUNT: &str = "/output";

/// Result of a completed container run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub container_id: String,
    pub exit_code: i64,
    /// Raw container stdout
    pub logs: Vec<u8>,
}

/// Drives a build container on an injected engine
pub struct BuildOrchestrator<'a> {
    engine: &'a dyn ContainerEngine,
    shell: String,
    timeouts: Timeouts,
    remove_container: bool,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(
        engine: &'a dyn ContainerEngine,
        shell: impl Into<String>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            engine,
            shell: shell.into(),
            timeouts,
            remove_container: true,
        }
    }

    /// Keep the container around after the run (for debugging)
    pub fn keep_container(mut self, keep: bool) -> Self {
        self.remove_container = !keep;
        self
    }

    /// Container spec for a request: input at /input, output at /output
    pub fn container_spec(&self, request: &BuildRequest) -> ContainerSpec {
        ContainerSpec {
            image: request.image.clone(),
            command: vec![
                self.shell.clone(),
                format!("{}/{}", INPUT_MOUNT, request.script_in_container()),
            ],
            mounts: vec![
                BindMount::new(&request.input_dir, INPUT_MOUNT),
                BindMount::new(&request.output_dir, OUTPUT_MOUNT),
            ],
        }
    }

    /// Run the build script for `request` to completion
    pub async fn run(&self, request: &BuildRequest) -> KilnResult<RunReport> {
        info!(
            "Building {} with {} (image: {}, script: {})",
            request.output_filename,
            self.engine.engine_name(),
            request.image,
            request.script.display()
        );

        info!("Pulling image {}", request.image);
        let pulled = self
            .bounded(
                LifecycleStage::Pull,
                self.timeouts.pull,
                self.engine.pull_image(&request.image),
            )
            .await?;
        debug!("{}", String::from_utf8_lossy(&pulled).trim_end());

        debug!("Creating container");
        let spec = self.container_spec(request);
        let container_id = self
            .bounded(
                LifecycleStage::Create,
                self.timeouts.call,
                self.engine.create_container(&spec),
            )
            .await?;

        let outcome = self.drive(&container_id).await;

        if self.remove_container {
            if let Err(e) = self
                .bounded(
                    LifecycleStage::Remove,
                    self.timeouts.call,
                    self.engine.remove_container(&container_id),
                )
                .await
            {
                warn!("Failed to remove container {}: {}", container_id, e);
            }
        }

        let (exit_code, logs) = outcome?;

        if exit_code != 0 {
            return Err(KilnError::ScriptFailed {
                code: exit_code,
                output: log_tail(&String::from_utf8_lossy(&logs)),
            });
        }

        info!("Build container exited cleanly");
        Ok(RunReport {
            container_id,
            exit_code,
            logs,
        })
    }

    /// Start, wait and collect logs of a created container
    async fn drive(&self, id: &str) -> KilnResult<(i64, Vec<u8>)> {
        debug!("Starting container");
        self.bounded(LifecycleStage::Start, self.timeouts.call, self.engine.start_container(id))
            .await?;

        debug!("Waiting for container to finish");
        let exit_code = self
            .bounded(LifecycleStage::Wait, self.timeouts.wait, self.engine.wait_container(id))
            .await?;
        debug!("Container exited with code {}", exit_code);

        debug!("Retrieving container logs");
        let logs = self
            .bounded(LifecycleStage::Logs, self.timeouts.call, self.engine.container_logs(id))
            .await?;
        for line in String::from_utf8_lossy(&logs).lines() {
            info!(target: "kiln::container", "{}", line);
        }

        Ok((exit_code, logs))
    }

    /// Apply a stage timeout; a zero limit leaves the call unbounded
    async fn bounded<T>(
        &self,
        stage: LifecycleStage,
        limit: Duration,
        call: impl Future<Output = KilnResult<T>>,
    ) -> KilnResult<T> {
        if limit.is_zero() {
            return call.await;
        }
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(KilnError::Timeout {
                stage,
                secs: limit.as_secs(),
            }),
        }
    }
}
