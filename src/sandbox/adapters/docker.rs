//! Docker-backed sandbox runtime.
//!
//! Environments are long-lived idle containers (`sleep infinity`) started
//! with networking disabled, all capabilities dropped, and the working tree
//! bind-mounted at [`CONTAINER_WORKDIR`]. Commands run through `docker exec`.

use crate::sandbox::{
    domain::{CommandOutput, EnvironmentSpec, SandboxId},
    ports::{SandboxRuntime, SandboxRuntimeError, SandboxRuntimeResult},
};
use async_trait::async_trait;
use std::io;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, warn};

/// Mount point of the working tree inside every container.
pub const CONTAINER_WORKDIR: &str = "/workspace";

const DAEMON_UNREACHABLE: &str = "Cannot connect to the Docker daemon";
const NO_SUCH_CONTAINER: &str = "No such container";

/// Sandbox runtime that drives the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerSandboxRuntime {
    binary: String,
}

impl DockerSandboxRuntime {
    /// Creates a runtime that invokes the given docker binary.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the docker binary this runtime invokes.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.kill_on_drop(true);
        command
    }

    /// Asks the daemon whether the environment's container still exists.
    ///
    /// Commands run inside the container may print docker-like diagnostics
    /// themselves, so stderr text alone never proves the container is gone.
    async fn container_exists(&self, id: SandboxId) -> SandboxRuntimeResult<bool> {
        let output = self
            .command()
            .args(["container", "inspect", "--format", "{{.Id}}", &id.environment_name()])
            .output()
            .await
            .map_err(|err| spawn_error(&self.binary, err))?;
        if output.status.success() {
            return Ok(true);
        }
        match classify_failure(id, &output) {
            SandboxRuntimeError::NotFound(_) => Ok(false),
            other => Err(other),
        }
    }

    /// Builds the argument list for `docker run`.
    #[must_use]
    pub fn run_arguments(id: SandboxId, spec: &EnvironmentSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_owned(),
            "--detach".to_owned(),
            "--name".to_owned(),
            id.environment_name(),
            "--cap-drop".to_owned(),
            "ALL".to_owned(),
            "--security-opt".to_owned(),
            "no-new-privileges".to_owned(),
        ];
        if !spec.limits.network_enabled() {
            args.push("--network".to_owned());
            args.push("none".to_owned());
        }
        if let Some(memory) = spec.limits.memory_limit_mb() {
            args.push("--memory".to_owned());
            args.push(format!("{memory}m"));
        }
        args.push("--volume".to_owned());
        args.push(format!(
            "{}:{CONTAINER_WORKDIR}",
            spec.working_dir.display()
        ));
        args.push("--workdir".to_owned());
        args.push(CONTAINER_WORKDIR.to_owned());
        args.push(spec.image.clone());
        args.push("sleep".to_owned());
        args.push("infinity".to_owned());
        args
    }
}

impl Default for DockerSandboxRuntime {
    fn default() -> Self {
        Self::new("docker")
    }
}

fn spawn_error(binary: &str, err: io::Error) -> SandboxRuntimeError {
    if err.kind() == io::ErrorKind::NotFound {
        SandboxRuntimeError::Unavailable(format!("{binary} binary not found"))
    } else {
        SandboxRuntimeError::runtime(err)
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

fn classify_failure(id: SandboxId, output: &Output) -> SandboxRuntimeError {
    let stderr = stderr_of(output);
    if stderr.contains(DAEMON_UNREACHABLE) {
        SandboxRuntimeError::Unavailable(stderr)
    } else if stderr.contains(NO_SUCH_CONTAINER) {
        SandboxRuntimeError::NotFound(id)
    } else {
        SandboxRuntimeError::runtime(io::Error::other(stderr))
    }
}

#[async_trait]
impl SandboxRuntime for DockerSandboxRuntime {
    async fn create(&self, id: SandboxId, spec: &EnvironmentSpec) -> SandboxRuntimeResult<()> {
        let output = self
            .command()
            .args(Self::run_arguments(id, spec))
            .output()
            .await
            .map_err(|err| spawn_error(&self.binary, err))?;
        if !output.status.success() {
            return Err(classify_failure(id, &output));
        }
        debug!(sandbox_id = %id, image = %spec.image, "docker environment started");
        Ok(())
    }

    async fn exec(&self, id: SandboxId, command: &str) -> SandboxRuntimeResult<CommandOutput> {
        let output = self
            .command()
            .args(["exec", &id.environment_name(), "sh", "-c", command])
            .output()
            .await
            .map_err(|err| spawn_error(&self.binary, err))?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success()
            && stderr.contains(NO_SUCH_CONTAINER)
            && !self.container_exists(id).await?
        {
            return Err(SandboxRuntimeError::NotFound(id));
        }
        Ok(CommandOutput::new(
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        ))
    }

    async fn destroy(&self, id: SandboxId) -> SandboxRuntimeResult<()> {
        let output = self
            .command()
            .args(["rm", "--force", &id.environment_name()])
            .output()
            .await
            .map_err(|err| spawn_error(&self.binary, err))?;
        if output.status.success() {
            return Ok(());
        }
        match classify_failure(id, &output) {
            SandboxRuntimeError::NotFound(_) => Ok(()),
            other => {
                warn!(sandbox_id = %id, error = %other, "docker environment removal failed");
                Err(other)
            }
        }
    }
}
