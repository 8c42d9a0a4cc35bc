//! Target process management
//!
//! Handles launching and terminating the engine process that hosts the
//! project under test.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{Error, Result};

/// How long a freshly spawned target must survive to count as launched.
pub const LAUNCH_SETTLE: Duration = Duration::from_millis(100);

/// Everything needed to start a target process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
	pub binary: PathBuf,
	pub args: Vec<OsString>,
	pub working_dir: Option<PathBuf>,
	/// Pipe stdin/stdout for the automation channel instead of discarding them.
	pub pipe_stdio: bool,
	/// Let the target's stderr through to ours.
	pub inherit_stderr: bool,
}

impl LaunchSpec {
	pub fn new(binary: impl Into<PathBuf>) -> Self {
		Self {
			binary: binary.into(),
			args: Vec::new(),
			working_dir: None,
			pipe_stdio: false,
			inherit_stderr: true,
		}
	}

	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.working_dir = Some(dir.into());
		self
	}

	pub fn pipe_stdio(mut self, pipe: bool) -> Self {
		self.pipe_stdio = pipe;
		self
	}

	pub fn inherit_stderr(mut self, inherit: bool) -> Self {
		self.inherit_stderr = inherit;
		self
	}
}

/// A running target process.
///
/// The child is spawned with `kill_on_drop`, so dropping this value without
/// calling [`terminate`](Self::terminate) still kills the target.
#[derive(Debug)]
pub struct TargetProcess {
	process: Child,
	binary: PathBuf,
	exited: Option<ExitStatus>,
}

impl TargetProcess {
	/// Launch the target process
	///
	/// This will:
	/// 1. Check that the binary exists and is executable
	/// 2. Spawn it with the given arguments
	/// 3. Wait [`LAUNCH_SETTLE`] and make sure it is still running
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the binary is unusable, cannot be
	/// spawned, or exits during the settle window.
	pub async fn launch(spec: &LaunchSpec) -> Result<Self> {
		verify_executable(&spec.binary)?;

		let mut cmd = Command::new(&spec.binary);
		cmd.args(&spec.args).kill_on_drop(true);
		if let Some(dir) = &spec.working_dir {
			cmd.current_dir(dir);
		}
		if spec.pipe_stdio {
			cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
		} else {
			cmd.stdin(Stdio::null()).stdout(Stdio::null());
		}
		cmd.stderr(if spec.inherit_stderr {
			Stdio::inherit()
		} else {
			Stdio::null()
		});

		tracing::debug!(binary = %spec.binary.display(), args = ?spec.args, "spawning target");
		let mut child = cmd
			.spawn()
			.map_err(|e| launch_failed(&spec.binary, format!("Failed to spawn process: {e}")))?;

		tokio::time::sleep(LAUNCH_SETTLE).await;

		match child.try_wait() {
			Ok(Some(status)) => {
				return Err(launch_failed(
					&spec.binary,
					format!("process exited immediately with status: {status}"),
				));
			}
			Ok(None) => {}
			Err(e) => {
				return Err(launch_failed(
					&spec.binary,
					format!("Failed to check process status: {e}"),
				));
			}
		}

		tracing::info!(pid = child.id(), binary = %spec.binary.display(), "target launched");
		Ok(Self {
			process: child,
			binary: spec.binary.clone(),
			exited: None,
		})
	}

	/// Takes the piped stdin/stdout, if the target was launched with them.
	pub fn take_stdio(&mut self) -> Option<(ChildStdin, ChildStdout)> {
		let stdin = self.process.stdin.take()?;
		let stdout = self.process.stdout.take()?;
		Some((stdin, stdout))
	}

	pub fn id(&self) -> Option<u32> {
		self.process.id()
	}

	pub fn binary(&self) -> &Path {
		&self.binary
	}

	/// Non-blocking check whether the target has exited.
	pub fn has_exited(&mut self) -> bool {
		if self.exited.is_some() {
			return true;
		}
		match self.process.try_wait() {
			Ok(Some(status)) => {
				self.exited = Some(status);
				true
			}
			Ok(None) => false,
			Err(_) => true,
		}
	}

	/// Asks the target to stop, escalating to a kill after `grace`.
	///
	/// Idempotent: a target that already exited is only reaped.
	pub async fn terminate(&mut self, grace: Duration) -> Result<()> {
		if self.has_exited() {
			return Ok(());
		}

		#[cfg(unix)]
		if let Some(pid) = self.process.id() {
			// SAFETY: kill(2) has no memory effects; the pid belongs to our
			// unreaped child, so it cannot have been recycled.
			let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
			if rc != 0 {
				tracing::debug!(pid, "SIGTERM failed: {}", std::io::Error::last_os_error());
			}
		}

		match tokio::time::timeout(grace, self.process.wait()).await {
			Ok(Ok(status)) => {
				tracing::debug!(%status, "target exited");
				self.exited = Some(status);
				Ok(())
			}
			Ok(Err(e)) => Err(Error::Io(e)),
			Err(_) => {
				tracing::warn!(
					grace_ms = grace.as_millis() as u64,
					"target ignored termination request; killing"
				);
				self.kill().await
			}
		}
	}

	/// Force kill the target process
	pub async fn kill(&mut self) -> Result<()> {
		if self.has_exited() {
			return Ok(());
		}
		self.process.kill().await?;
		if let Ok(Ok(status)) =
			tokio::time::timeout(Duration::from_millis(500), self.process.wait()).await
		{
			self.exited = Some(status);
		}
		Ok(())
	}

	/// Starts a kill without waiting. Used from `Drop` paths.
	pub fn start_kill(&mut self) {
		if !self.has_exited() {
			let _ = self.process.start_kill();
		}
	}
}

fn launch_failed(binary: &Path, reason: String) -> Error {
	Error::LaunchFailed {
		binary: binary.to_path_buf(),
		reason,
	}
}

fn verify_executable(binary: &Path) -> Result<()> {
	let metadata = std::fs::metadata(binary)
		.map_err(|e| launch_failed(binary, format!("binary not found: {e}")))?;
	if !metadata.is_file() {
		return Err(launch_failed(binary, "not a regular file".to_string()));
	}

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		if metadata.permissions().mode() & 0o111 == 0 {
			return Err(launch_failed(binary, "file is not executable".to_string()));
		}
	}

	Ok(())
}
