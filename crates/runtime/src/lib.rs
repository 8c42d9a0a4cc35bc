//! PlayGodot Runtime - target process, transport, and protocol session
//!
//! This crate provides the low-level runtime infrastructure for talking to an
//! automation-enabled engine build:
//!
//! - **Process management**: Launching and terminating the target
//! - **Transport**: Length-prefixed JSON frames over stdio pipes or TCP
//! - **Connection**: Request/response correlation and event dispatch
//! - **Lifecycle**: The shared, forward-only session state
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  playgodot  │  Typed commands, waiting, session lifecycle
//! └──────┬──────┘
//!        │ send_message / subscribe
//! ┌──────▼──────┐
//! │  runtime    │  This crate
//! │  ┌────────┐ │
//! │  │ Conn   │ │  Correlation, events, handshake
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Trans  │ │  Pipe/TCP framing
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Proc   │ │  Target process
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod lifecycle;
pub mod process;
pub mod transport;

pub use connection::{CLIENT_INFO, Connection, ErrorPayload, Event, EventStream, Message, Request, Response};
pub use error::{CallContext, Error, Result};
pub use lifecycle::{Lifecycle, SessionState};
pub use process::{LAUNCH_SETTLE, LaunchSpec, TargetProcess};
pub use transport::{
	MAX_FRAME_SIZE, PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts,
	TransportReceiver, accept_tcp, connect_tcp,
};
