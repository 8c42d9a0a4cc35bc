//! [`Godot`] session: one live automation connection to one target.

mod input;
mod node;
pub(crate) mod remote;
mod scene;
mod screenshot;
mod time;
mod wait;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use playgodot_protocol::Variant;
use playgodot_protocol::methods::QUIT;
use playgodot_runtime::{
	CLIENT_INFO, Connection, Error, EventStream, LaunchSpec, Lifecycle, PipeTransport, Result,
	SessionState, TargetProcess, TransportParts, accept_tcp, connect_tcp,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Mutex as TokioMutex;

pub use self::input::ClickTarget;
pub use self::screenshot::PNG_SIGNATURE;
use crate::options::{LaunchOptions, TransportMode};

/// Longest a teardown waits for the target to acknowledge `quit`.
const QUIT_ACK_TIMEOUT: Duration = Duration::from_secs(1);

/// A ready automation session.
///
/// Obtained from [`Godot::launch`], [`Godot::attach`] or
/// [`Godot::from_transport`], all of which return only after the handshake
/// succeeded. Clones share the same session.
///
/// Call [`close`](Self::close) to tear down gracefully, or use
/// [`Godot::scoped`] to have it done on every exit path. Dropping the last
/// clone without closing still closes the connection and kills a launched
/// target.
#[derive(Clone)]
pub struct Godot {
	inner: Arc<Inner>,
}

struct Inner {
	connection: Arc<Connection>,
	/// Present only when this session launched the target.
	process: TokioMutex<Option<TargetProcess>>,
	options: LaunchOptions,
}

impl Drop for Inner {
	fn drop(&mut self) {
		self.connection.close();
		if let Some(target) = self.process.get_mut().as_mut() {
			tracing::debug!(pid = target.id(), "session dropped without close; killing target");
			target.start_kill();
		}
	}
}

impl Godot {
	/// Launches the target on `project` and connects to it.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if no binary is configured, the binary or
	/// project is unusable, or the target exits right away.
	/// Returns `Error::ConnectFailed` if the target never opens its debug
	/// channel, and `Error::ProtocolMismatch` if it speaks another version.
	pub async fn launch(project: impl AsRef<Path>, options: LaunchOptions) -> Result<Self> {
		let project = project.as_ref();
		let binary = options.binary.clone().ok_or_else(|| Error::LaunchFailed {
			binary: PathBuf::new(),
			reason: "no target binary configured".to_string(),
		})?;
		if !project.is_dir() {
			return Err(Error::LaunchFailed {
				binary,
				reason: format!("project directory '{}' not found", project.display()),
			});
		}

		let listener = match options.transport {
			TransportMode::Pipe => None,
			TransportMode::Tcp { port } => {
				let listener = TcpListener::bind(("127.0.0.1", port))
					.await
					.map_err(|e| Error::ConnectFailed {
						endpoint: format!("127.0.0.1:{port}"),
						reason: e.to_string(),
					})?;
				Some(listener)
			}
		};
		let bound_port = listener
			.as_ref()
			.and_then(|listener| listener.local_addr().ok())
			.map(|addr| addr.port());

		let spec = launch_spec(&binary, project, &options, bound_port);
		tracing::debug!(binary = %binary.display(), project = %project.display(), transport = %options.transport, "launching target");
		let mut process = TargetProcess::launch(&spec).await?;

		let parts = match connect_launched(&mut process, listener, options.timeout).await {
			Ok(parts) => parts,
			Err(e) => {
				if let Err(kill_err) = process.kill().await {
					tracing::warn!("failed to kill target after connect failure: {kill_err}");
				}
				return Err(e);
			}
		};

		Self::establish(parts, Some(process), options).await
	}

	/// Connects to an already running target listening at `endpoint`
	/// (`host:port`). The target's process is not managed.
	pub async fn attach(endpoint: &str, options: LaunchOptions) -> Result<Self> {
		let parts = connect_tcp(endpoint, options.timeout).await?;
		Self::establish(parts, None, options).await
	}

	/// Runs a session over an arbitrary transport.
	pub async fn from_transport(parts: TransportParts, options: LaunchOptions) -> Result<Self> {
		Self::establish(parts, None, options).await
	}

	/// Launches a session, runs `f` with it and always tears it down.
	///
	/// The closure's result is returned. Teardown failures are logged and never
	/// replace it. If the returned future is dropped midway, the session is
	/// killed as soon as the last clone goes away.
	pub async fn scoped<F, Fut, T, E>(
		project: impl AsRef<Path>,
		options: LaunchOptions,
		f: F,
	) -> std::result::Result<T, E>
	where
		F: FnOnce(Godot) -> Fut,
		Fut: Future<Output = std::result::Result<T, E>>,
		E: From<Error>,
	{
		let godot = Self::launch(project, options).await?;
		let result = f(godot.clone()).await;
		if let Err(e) = godot.close().await {
			tracing::warn!("session teardown failed: {e}");
		}
		result
	}

	async fn establish(
		parts: TransportParts,
		process: Option<TargetProcess>,
		options: LaunchOptions,
	) -> Result<Self> {
		let lifecycle = Arc::new(Lifecycle::new(SessionState::Launching));
		let connection = Arc::new(Connection::with_lifecycle(parts, lifecycle));

		let runner = Arc::clone(&connection);
		tokio::spawn(async move {
			runner.run().await;
		});

		let godot = Self {
			inner: Arc::new(Inner {
				connection,
				process: TokioMutex::new(process),
				options,
			}),
		};

		let timeout = godot.inner.options.timeout;
		if let Err(e) = godot.inner.connection.handshake(CLIENT_INFO, timeout).await {
			godot.close_quietly().await;
			return Err(e);
		}

		if let Some(ready_node) = godot.inner.options.ready_node.clone() {
			if let Err(e) = godot.wait_for_node(&ready_node, timeout).await {
				godot.close_quietly().await;
				return Err(e);
			}
		}

		tracing::info!("session ready");
		Ok(godot)
	}

	/// Tears the session down. Idempotent.
	///
	/// Asks a launched target to quit, closes the connection (in-flight calls
	/// fail with `Error::ConnectionClosed`), then terminates the process,
	/// escalating to a kill after the grace period.
	pub async fn close(&self) -> Result<()> {
		let inner = &self.inner;
		let mut process = inner.process.lock().await;

		if process.is_some() && inner.connection.state() == SessionState::Ready {
			let ack_timeout = inner.options.grace_period.min(QUIT_ACK_TIMEOUT);
			if let Err(e) = inner
				.connection
				.send_message(QUIT, Value::Object(Default::default()), Some(ack_timeout))
				.await
			{
				tracing::debug!("quit request not acknowledged: {e}");
			}
		}

		inner.connection.close();

		match process.take() {
			Some(mut target) => target.terminate(inner.options.grace_period).await,
			None => Ok(()),
		}
	}

	async fn close_quietly(&self) {
		if let Err(e) = self.close().await {
			tracing::warn!("teardown after failed startup: {e}");
		}
	}

	pub fn state(&self) -> SessionState {
		self.inner.connection.state()
	}

	pub fn options(&self) -> &LaunchOptions {
		&self.inner.options
	}

	/// Underlying protocol session, for raw requests.
	pub fn connection(&self) -> &Arc<Connection> {
		&self.inner.connection
	}

	/// Subscribe to one event category (`scene_changed`, `log`, ...).
	pub fn subscribe(&self, category: impl Into<String>) -> EventStream {
		self.inner.connection.subscribe(category)
	}

	pub fn subscribe_all(&self) -> EventStream {
		self.inner.connection.subscribe_all()
	}

	/// Sends one request with the session's call timeout.
	pub(crate) async fn request_value(&self, method: &str, params: Value) -> Result<Value> {
		self.inner
			.connection
			.send_message(method, params, Some(self.inner.options.call_timeout))
			.await
	}

	/// Sends one request and decodes the result as a [`Variant`].
	pub(crate) async fn request(&self, method: &str, params: Value) -> Result<Variant> {
		let value = self.request_value(method, params).await?;
		serde_json::from_value(value)
			.map_err(|e| Error::ProtocolError(format!("{method}: unreadable result: {e}")))
	}
}

impl std::fmt::Debug for Godot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Godot")
			.field("state", &self.state())
			.field("transport", &self.inner.options.transport)
			.finish()
	}
}

async fn connect_launched(
	process: &mut TargetProcess,
	listener: Option<TcpListener>,
	timeout: Duration,
) -> Result<TransportParts> {
	match listener {
		Some(listener) => accept_tcp(&listener, timeout).await,
		None => {
			let (stdin, stdout) = process.take_stdio().ok_or_else(|| Error::LaunchFailed {
				binary: process.binary().to_path_buf(),
				reason: "target stdio was not piped".to_string(),
			})?;
			let (transport, message_rx) = PipeTransport::new(stdin, stdout);
			Ok(transport.into_transport_parts(message_rx))
		}
	}
}

fn launch_spec(
	binary: &Path,
	project: &Path,
	options: &LaunchOptions,
	bound_port: Option<u16>,
) -> LaunchSpec {
	let mut spec = LaunchSpec::new(binary)
		.arg("--path")
		.arg(project.as_os_str());
	if options.headless {
		spec = spec.arg("--headless");
	}
	if options.verbose {
		spec = spec.arg("--verbose");
	}
	spec.args(options.transport.flag(bound_port))
		.args(&options.extra_args)
		.pipe_stdio(options.transport == TransportMode::Pipe)
		.inherit_stderr(options.verbose)
}
