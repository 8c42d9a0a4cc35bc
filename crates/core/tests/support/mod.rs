//! In-process stand-in for an automation-enabled engine running the
//! tic-tac-toe example project.
//!
//! Speaks the framed wire protocol over `tokio::io::duplex` pipes and keeps a
//! small scene tree plus game state, so session behaviour can be tested
//! without an engine binary.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use playgodot::runtime::transport::{encode_frame, read_frame};
use playgodot::{Godot, LaunchOptions, PNG_SIGNATURE, PipeTransport, TransportParts, Variant};
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, duplex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub const GAME: &str = "/root/Game";
pub const STATUS: &str = "/root/Game/VBoxContainer/StatusLabel";
pub const RESTART: &str = "/root/Game/VBoxContainer/RestartButton";
pub const SCENE_PATH: &str = "res://scenes/main.tscn";

pub fn cell(index: usize) -> String {
	format!("/root/Game/VBoxContainer/GameBoard/GridContainer/Cell{index}")
}

/// Viewport centre of a board cell.
pub fn cell_position(index: usize) -> (f64, f64) {
	(130.0 + (index % 3) as f64 * 120.0, 285.0 + (index / 3) as f64 * 120.0)
}

const VIEWPORT: (f64, f64) = (1152.0, 648.0);
const CELL_HALF_SIZE: f64 = 50.0;
const WIN_LINES: [[usize; 3]; 8] = [
	[0, 1, 2],
	[3, 4, 5],
	[6, 7, 8],
	[0, 3, 6],
	[1, 4, 7],
	[2, 5, 8],
	[0, 4, 8],
	[2, 4, 6],
];

/// Knobs for misbehaving targets.
#[derive(Debug, Clone)]
pub struct FakeConfig {
	pub protocol_version: u32,
	pub refuse_handshake: bool,
	/// Screenshot replies carry no image.
	pub blank_screenshots: bool,
	pub fail_reload: bool,
	/// Start with no scene loaded.
	pub no_scene: bool,
	pub options: LaunchOptions,
}

impl Default for FakeConfig {
	fn default() -> Self {
		Self {
			protocol_version: 1,
			refuse_handshake: false,
			blank_screenshots: false,
			fail_reload: false,
			no_scene: false,
			options: LaunchOptions::builder()
				.timeout(Duration::from_secs(5))
				.call_timeout(Duration::from_secs(5))
				.build(),
		}
	}
}

#[derive(Debug, Clone)]
struct FakeNode {
	path: String,
	class: &'static str,
	instance_id: u64,
	properties: BTreeMap<String, Value>,
}

impl FakeNode {
	fn name(&self) -> &str {
		self.path.rsplit('/').next().unwrap_or_default()
	}
}

/// Target-side state, inspectable from tests.
#[derive(Debug)]
pub struct World {
	pub board: [String; 9],
	pub current_player: String,
	pub active: bool,
	pub winner: String,
	pub paused: bool,
	pub time_scale: f64,
	pub scene_loaded: bool,
	/// Every method received, in order.
	pub requests: Vec<String>,
	nodes: Vec<FakeNode>,
	next_instance_id: u64,
}

impl World {
	fn new(scene_loaded: bool) -> Self {
		let mut world = Self {
			board: Default::default(),
			current_player: "X".to_string(),
			active: true,
			winner: String::new(),
			paused: false,
			time_scale: 1.0,
			scene_loaded,
			requests: Vec::new(),
			nodes: Vec::new(),
			next_instance_id: 1000,
		};
		world.instantiate_scene();
		world
	}

	/// (Re)builds the scene tree with fresh instance ids and a new game.
	fn instantiate_scene(&mut self) {
		self.nodes.clear();
		self.add_node("/root", "Window");
		if self.scene_loaded {
			self.add_node(GAME, "Control");
			self.add_node("/root/Game/VBoxContainer", "VBoxContainer");
			self.add_node(STATUS, "Label");
			self.add_node("/root/Game/VBoxContainer/GameBoard", "PanelContainer");
			self.add_node("/root/Game/VBoxContainer/GameBoard/GridContainer", "GridContainer");
			for index in 0..9 {
				self.add_node(&cell(index), "Button");
			}
			self.add_node(RESTART, "Button");
		}
		self.reset_game();
	}

	fn add_node(&mut self, path: &str, class: &'static str) {
		self.next_instance_id += 1;
		let mut properties = BTreeMap::new();
		properties.insert("visible".to_string(), json!(true));
		if class == "Label" || class == "Button" {
			properties.insert("text".to_string(), json!(""));
		}
		self.nodes.push(FakeNode {
			path: path.to_string(),
			class,
			instance_id: self.next_instance_id,
			properties,
		});
	}

	fn node(&self, path: &str) -> Option<&FakeNode> {
		self.nodes.iter().find(|node| node.path == path)
	}

	fn node_mut(&mut self, path: &str) -> Option<&mut FakeNode> {
		self.nodes.iter_mut().find(|node| node.path == path)
	}

	pub fn instance_id(&self, path: &str) -> Option<u64> {
		self.node(path).map(|node| node.instance_id)
	}

	fn reset_game(&mut self) {
		self.board = Default::default();
		self.current_player = "X".to_string();
		self.active = true;
		self.winner.clear();
		self.refresh_ui();
	}

	fn make_move(&mut self, index: usize) -> bool {
		if !self.active || index >= 9 || !self.board[index].is_empty() {
			return false;
		}
		self.board[index] = self.current_player.clone();

		let won = WIN_LINES
			.iter()
			.any(|line| line.iter().all(|&i| self.board[i] == self.current_player));
		if won {
			self.active = false;
			self.winner = self.current_player.clone();
		} else if self.board.iter().all(|slot| !slot.is_empty()) {
			self.active = false;
		} else {
			self.current_player = if self.current_player == "X" { "O" } else { "X" }.to_string();
		}
		self.refresh_ui();
		true
	}

	fn status_text(&self) -> String {
		if !self.winner.is_empty() {
			format!("{} Wins!", self.winner)
		} else if !self.active {
			"It's a Draw!".to_string()
		} else {
			format!("{}'s Turn", self.current_player)
		}
	}

	fn refresh_ui(&mut self) {
		let status = self.status_text();
		if let Some(label) = self.node_mut(STATUS) {
			label.properties.insert("text".to_string(), json!(status));
		}
		for index in 0..9 {
			let mark = self.board[index].clone();
			if let Some(button) = self.node_mut(&cell(index)) {
				button.properties.insert("text".to_string(), json!(mark));
			}
		}
		if let Some(button) = self.node_mut(RESTART) {
			button.properties.insert("text".to_string(), json!("Restart"));
		}
	}

	fn cell_at(&self, x: f64, y: f64) -> Option<usize> {
		(0..9).find(|&index| {
			let (cx, cy) = cell_position(index);
			(x - cx).abs() <= CELL_HALF_SIZE && (y - cy).abs() <= CELL_HALF_SIZE
		})
	}
}

/// Handle on a running fake target.
pub struct FakeTarget {
	pub world: Arc<Mutex<World>>,
	events: mpsc::UnboundedSender<Value>,
	task: JoinHandle<()>,
}

impl FakeTarget {
	/// Methods received so far, handshake included.
	pub fn requests(&self) -> Vec<String> {
		self.world.lock().requests.clone()
	}

	/// Sends an unsolicited event.
	pub fn emit(&self, event: &str, params: Value) {
		let _ = self.events.send(json!({ "event": event, "params": params }));
	}

	/// Drops the connection as if the engine crashed.
	pub fn crash(&self) {
		self.task.abort();
	}
}

/// Starts a fake target and returns its client-side transport.
pub fn spawn_target(config: &FakeConfig) -> (TransportParts, FakeTarget) {
	let (client_write, target_read) = duplex(1 << 20);
	let (target_write, client_read) = duplex(1 << 20);

	let (transport, message_rx) = PipeTransport::new(client_write, client_read);
	let parts = transport.into_transport_parts(message_rx);

	let world = Arc::new(Mutex::new(World::new(!config.no_scene)));
	let (out_tx, out_rx) = mpsc::unbounded_channel();
	let task = tokio::spawn(serve(
		config.clone(),
		Arc::clone(&world),
		target_read,
		target_write,
		out_tx.clone(),
		out_rx,
	));

	(
		parts,
		FakeTarget {
			world,
			events: out_tx,
			task,
		},
	)
}

/// Starts a fake target listening on an ephemeral loopback port, serving the
/// first client that connects.
pub async fn spawn_tcp_target(config: &FakeConfig) -> (SocketAddr, FakeTarget) {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
	let addr = listener.local_addr().expect("bound address");

	let world = Arc::new(Mutex::new(World::new(!config.no_scene)));
	let (out_tx, out_rx) = mpsc::unbounded_channel();
	let task = {
		let config = config.clone();
		let world = Arc::clone(&world);
		let out_tx = out_tx.clone();
		tokio::spawn(async move {
			let Ok((stream, _)) = listener.accept().await else {
				return;
			};
			let (read_half, write_half) = stream.into_split();
			serve(config, world, read_half, write_half, out_tx, out_rx).await;
		})
	};

	(
		addr,
		FakeTarget {
			world,
			events: out_tx,
			task,
		},
	)
}

/// Connects a fake target to a session listening at `endpoint`, the way an
/// engine launched with `--remote-debug` dials back.
pub async fn dial_target(config: &FakeConfig, endpoint: &str) -> FakeTarget {
	let stream = TcpStream::connect(endpoint).await.expect("dial session listener");
	let (read_half, write_half) = stream.into_split();

	let world = Arc::new(Mutex::new(World::new(!config.no_scene)));
	let (out_tx, out_rx) = mpsc::unbounded_channel();
	let task = tokio::spawn(serve(
		config.clone(),
		Arc::clone(&world),
		read_half,
		write_half,
		out_tx.clone(),
		out_rx,
	));

	FakeTarget {
		world,
		events: out_tx,
		task,
	}
}

/// Routes library logs through the test harness; `RUST_LOG=debug` shows
/// every frame.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// Starts a fake target and connects a session to it.
pub async fn connect(config: FakeConfig) -> (Godot, FakeTarget) {
	init_tracing();
	let (parts, target) = spawn_target(&config);
	let godot = Godot::from_transport(parts, config.options.clone())
		.await
		.expect("session should connect to the fake target");
	(godot, target)
}

pub async fn connect_default() -> (Godot, FakeTarget) {
	connect(FakeConfig::default()).await
}

async fn serve<R, W>(
	config: FakeConfig,
	world: Arc<Mutex<World>>,
	mut reader: R,
	mut writer: W,
	out_tx: mpsc::UnboundedSender<Value>,
	mut out_rx: mpsc::UnboundedReceiver<Value>,
) where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let writer_task = tokio::spawn(async move {
		while let Some(message) = out_rx.recv().await {
			let frame = encode_frame(&message).expect("encodable frame");
			if writer.write_all(&frame).await.is_err() {
				break;
			}
		}
	});
	// Abort the writer when this task ends or is aborted.
	struct AbortOnDrop(JoinHandle<()>);
	impl Drop for AbortOnDrop {
		fn drop(&mut self) {
			self.0.abort();
		}
	}
	let _writer = AbortOnDrop(writer_task);

	while let Ok(Some(body)) = read_frame(&mut reader).await {
		let request: Value = serde_json::from_slice(&body).expect("client sent valid JSON");
		let id = request["id"].clone();
		let method = request["method"].as_str().unwrap_or_default().to_string();
		let params = request["params"].clone();
		world.lock().requests.push(method.clone());

		if method == "call_method" && params["method"] == "slow_echo" {
			// Replies after a delay so later requests overtake it.
			let value = params["args"][0].clone();
			let delay = params["args"][1].as_u64().unwrap_or(0);
			let out = out_tx.clone();
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(delay)).await;
				let _ = out.send(json!({ "id": id, "result": value }));
			});
			continue;
		}

		let outcome = handle(&config, &mut world.lock(), &method, &params);
		let reply = match outcome.result {
			Ok(result) => json!({ "id": id, "result": result }),
			Err((kind, message, detail)) => {
				let mut error = json!({ "kind": kind, "message": message });
				if let Some(detail) = detail {
					error["detail"] = json!(detail);
				}
				json!({ "id": id, "error": error })
			}
		};
		let _ = out_tx.send(reply);
		for event in outcome.events {
			let _ = out_tx.send(event);
		}
		if method == "quit" {
			// Give the writer a moment to flush the ack, then hang up.
			tokio::time::sleep(Duration::from_millis(20)).await;
			break;
		}
	}
}

type Failure = (&'static str, String, Option<String>);

struct Outcome {
	result: Result<Value, Failure>,
	events: Vec<Value>,
}

impl From<Result<Value, Failure>> for Outcome {
	fn from(result: Result<Value, Failure>) -> Self {
		Self {
			result,
			events: Vec::new(),
		}
	}
}

fn ok(value: Value) -> Result<Value, Failure> {
	Ok(value)
}

fn fail(kind: &'static str, message: impl Into<String>) -> Result<Value, Failure> {
	Err((kind, message.into(), None))
}

fn handle(config: &FakeConfig, world: &mut World, method: &str, params: &Value) -> Outcome {
	let path = params["path"].as_str().unwrap_or_default();
	match method {
		"handshake" => {
			if config.refuse_handshake {
				fail("Unsupported", "automation disabled in this build").into()
			} else {
				ok(json!({
					"protocol_version": config.protocol_version,
					"server": "fake-godot/4.3-automation",
					"capabilities": ["screenshot", "input", "time"],
				}))
				.into()
			}
		}
		"get_node" => match world.node(path) {
			Some(node) => ok(json!({
				"path": node.path,
				"name": node.name(),
				"class": node.class,
				"instance_id": node.instance_id,
			}))
			.into(),
			None => fail("NodeNotFound", format!("Node not found: {path}")).into(),
		},
		"get_property" => {
			let property = params["property"].as_str().unwrap_or_default();
			match world.node(path) {
				None => fail("NodeNotFound", format!("Node not found: {path}")).into(),
				Some(node) => match node.properties.get(property) {
					Some(value) => ok(value.clone()).into(),
					None => fail(
						"PropertyNotFound",
						format!("Property '{property}' not found on {}", node.class),
					)
					.into(),
				},
			}
		}
		"set_property" => {
			let property = params["property"].as_str().unwrap_or_default();
			match world.node_mut(path) {
				None => fail("NodeNotFound", format!("Node not found: {path}")).into(),
				Some(node) => match node.properties.get_mut(property) {
					Some(slot) => {
						*slot = params["value"].clone();
						ok(Value::Null).into()
					}
					None => fail("PropertyNotFound", format!("No property '{property}'")).into(),
				},
			}
		}
		"call_method" => call_method(world, path, params).into(),
		"query_nodes" => {
			let pattern = params["pattern"].as_str().unwrap_or_default();
			let matches: Vec<&str> = match glob::Pattern::new(&wildcard_only(pattern)) {
				Ok(pattern) => world
					.nodes
					.iter()
					.filter(|node| pattern.matches(&node.path))
					.map(|node| node.path.as_str())
					.collect(),
				Err(_) => Vec::new(),
			};
			ok(json!(matches)).into()
		}
		"click" => click(world, params).into(),
		"press_key" => {
			if params["keycode"] == json!('R' as u32) {
				world.reset_game();
			}
			ok(Value::Null).into()
		}
		"screenshot" => {
			if config.blank_screenshots {
				ok(Value::Null).into()
			} else {
				let mut png = PNG_SIGNATURE.to_vec();
				png.extend_from_slice(b"\0\0\0\rIHDRfake-frame");
				ok(serde_json::to_value(Variant::bytes(png)).unwrap_or_default()).into()
			}
		}
		"get_current_scene" => {
			if world.scene_loaded {
				ok(json!({ "path": SCENE_PATH, "name": "Game" })).into()
			} else {
				ok(Value::Null).into()
			}
		}
		"reload_scene" => {
			if config.fail_reload {
				return fail("ReloadFailed", "scene resource failed to load").into();
			}
			if !world.scene_loaded {
				return fail("NoActiveScene", "nothing to reload").into();
			}
			world.instantiate_scene();
			Outcome {
				result: Ok(Value::Null),
				events: vec![
					json!({ "event": "scene_changed", "params": { "path": SCENE_PATH } }),
					json!({ "event": "scene_ready", "params": { "path": SCENE_PATH } }),
				],
			}
		}
		"set_paused" => {
			world.paused = params["paused"].as_bool().unwrap_or(false);
			ok(Value::Null).into()
		}
		"is_paused" => ok(json!(world.paused)).into(),
		"set_time_scale" => match params["scale"].as_f64() {
			Some(scale) if scale > 0.0 => {
				world.time_scale = scale;
				ok(Value::Null).into()
			}
			_ => fail("InvalidArgument", "time scale must be positive").into(),
		},
		"get_time_scale" => ok(json!(world.time_scale)).into(),
		"quit" => ok(Value::Null).into(),
		other => fail("UnknownMethod", format!("unknown method '{other}'")).into(),
	}
}

fn call_method(world: &mut World, path: &str, params: &Value) -> Result<Value, Failure> {
	if world.node(path).is_none() {
		return fail("NodeNotFound", format!("Node not found: {path}"));
	}
	let method = params["method"].as_str().unwrap_or_default();
	let args = params["args"].as_array().cloned().unwrap_or_default();

	if path != GAME {
		return Err(nonexistent(method, path));
	}
	match method {
		"get_board_state" => Ok(json!(world.board)),
		"get_current_player" => Ok(json!(world.current_player)),
		"is_game_active" => Ok(json!(world.active)),
		"get_winner" => Ok(json!(world.winner)),
		"reset_game" => {
			world.reset_game();
			Ok(Value::Null)
		}
		"make_move" => match args.first().and_then(Value::as_u64) {
			Some(index) => Ok(json!(world.make_move(index as usize))),
			None => Err((
				"MethodError",
				"Invalid type in function 'make_move'. Cannot convert argument 1 to int".to_string(),
				Some("at: make_move (res://scripts/main.gd:57)".to_string()),
			)),
		},
		_ => Err(nonexistent(method, path)),
	}
}

fn nonexistent(method: &str, path: &str) -> Failure {
	(
		"MethodError",
		format!("Invalid call. Nonexistent function '{method}' in base '{path}'"),
		None,
	)
}

fn click(world: &mut World, params: &Value) -> Result<Value, Failure> {
	if let Some(path) = params["path"].as_str() {
		if world.node(path).is_none() {
			return fail("NodeNotFound", format!("Node not found: {path}"));
		}
		if path == RESTART {
			world.reset_game();
		} else if let Some(index) = (0..9).find(|&i| cell(i) == path) {
			world.make_move(index);
		}
		return Ok(Value::Null);
	}

	let (x, y) = (
		params["x"].as_f64().unwrap_or(-1.0),
		params["y"].as_f64().unwrap_or(-1.0),
	);
	if x > VIEWPORT.0 || y > VIEWPORT.1 {
		return fail("InvalidArgument", format!("({x}, {y}) is outside the viewport"));
	}
	if let Some(index) = world.cell_at(x, y) {
		world.make_move(index);
	}
	Ok(Value::Null)
}

/// Rewrites an engine wildcard pattern (`*` and `?` only) as a glob: runs of
/// `*` collapse to one and brackets become literal.
fn wildcard_only(pattern: &str) -> String {
	let mut out = String::with_capacity(pattern.len());
	for c in pattern.chars() {
		match c {
			'*' if out.ends_with('*') => {}
			'[' => out.push_str("[[]"),
			']' => out.push_str("[]]"),
			c => out.push(c),
		}
	}
	out
}
