//! Scene-tree access for [`Godot`].

use std::time::Instant;

use playgodot_protocol::methods::{CALL_METHOD, GET_NODE, GET_PROPERTY, QUERY_NODES, SET_PROPERTY};
use playgodot_protocol::{FromVariant, NodeInfo, Variant};
use playgodot_runtime::{CallContext, Error, Result};
use serde_json::json;

use super::Godot;
use super::remote::{Subject, classify};
use crate::node::NodeRef;

impl Godot {
	/// Looks up the node at `path`.
	///
	/// # Errors
	///
	/// Returns `Error::NodeNotFound` if no node exists at `path`.
	pub async fn get_node(&self, path: &str) -> Result<NodeRef> {
		if path.is_empty() {
			return Err(Error::InvalidArgument("node path must not be empty".to_string()));
		}

		let started = Instant::now();
		let params = json!({ "path": path });
		let value = self
			.request_value(GET_NODE, params.clone())
			.await
			.map_err(|e| classify(e, Subject::Node(path)))?;

		if value.is_null() {
			return Err(Error::NodeNotFound {
				path: path.to_string(),
				context: Box::new(CallContext::new(GET_NODE, &params, None, started.elapsed())),
			});
		}

		let info: NodeInfo = serde_json::from_value(value)
			.map_err(|e| Error::ProtocolError(format!("get_node({path}): unreadable node: {e}")))?;
		Ok(info.into())
	}

	/// True if a node exists at `path`. Absence is not an error; session
	/// failures still are.
	pub async fn node_exists(&self, path: &str) -> Result<bool> {
		match self.get_node(path).await {
			Ok(_) => Ok(true),
			Err(Error::NodeNotFound { .. } | Error::InvalidArgument(_)) => Ok(false),
			Err(e) => Err(e),
		}
	}

	/// Re-validates a retained handle against the live tree.
	///
	/// Fails with `Error::NodeNotFound` when the path is gone or now holds a
	/// different instance (for example after a scene reload).
	pub async fn resolve(&self, node: &NodeRef) -> Result<NodeRef> {
		let started = Instant::now();
		let current = self.get_node(node.path()).await?;
		if current.instance_id() != node.instance_id() {
			tracing::debug!(path = node.path(), old = node.instance_id(), new = current.instance_id(), "stale node handle");
			return Err(Error::NodeNotFound {
				path: node.path().to_string(),
				context: Box::new(CallContext::new(
					"resolve",
					&json!({
						"path": node.path(),
						"instance_id": node.instance_id(),
						"live_instance_id": current.instance_id(),
					}),
					None,
					started.elapsed(),
				)),
			});
		}
		Ok(current)
	}

	/// Reads property `name` of the node at `path`.
	pub async fn get_property(&self, path: &str, name: &str) -> Result<Variant> {
		self.request(GET_PROPERTY, json!({ "path": path, "property": name }))
			.await
			.map_err(|e| {
				classify(
					e,
					Subject::Property {
						path,
						property: name,
					},
				)
			})
	}

	/// Writes property `name` of the node at `path`.
	pub async fn set_property(&self, path: &str, name: &str, value: impl Into<Variant>) -> Result<()> {
		let value = value.into();
		self.request(
			SET_PROPERTY,
			json!({ "path": path, "property": name, "value": value }),
		)
		.await
		.map_err(|e| {
			classify(
				e,
				Subject::Property {
					path,
					property: name,
				},
			)
		})?;
		Ok(())
	}

	/// Invokes `method` on the node at `path` and returns its result.
	///
	/// # Errors
	///
	/// Returns `Error::NodeNotFound` if the node is missing and
	/// `Error::MethodError`, carrying the target-side detail, if the call
	/// itself failed.
	pub async fn call(&self, path: &str, method: &str, args: &[Variant]) -> Result<Variant> {
		self.request(
			CALL_METHOD,
			json!({ "path": path, "method": method, "args": args }),
		)
		.await
		.map_err(|e| classify(e, Subject::Method { path, method }))
	}

	/// Like [`call`](Self::call), converting the result to `T`.
	pub async fn call_as<T: FromVariant>(&self, path: &str, method: &str, args: &[Variant]) -> Result<T> {
		self.call(path, method, args)
			.await?
			.into_typed()
			.map_err(|e| Error::ProtocolError(format!("{path}.{method}() returned {e}")))
	}

	/// Paths of every node matching `pattern`, in tree order. The target
	/// matches `*` and `?` wildcards; every other character is literal, and a
	/// pattern that matches nothing yields an empty list. An empty pattern
	/// matches nothing and is not sent.
	pub async fn query_nodes(&self, pattern: &str) -> Result<Vec<String>> {
		if pattern.is_empty() {
			return Ok(Vec::new());
		}
		let value = self.request(QUERY_NODES, json!({ "pattern": pattern })).await?;
		match value {
			Variant::Nil => Ok(Vec::new()),
			other => other
				.into_typed()
				.map_err(|e| Error::ProtocolError(format!("query_nodes({pattern}): {e}"))),
		}
	}

	/// Number of nodes matching `pattern`; always `query_nodes(pattern).len()`.
	pub async fn count_nodes(&self, pattern: &str) -> Result<usize> {
		Ok(self.query_nodes(pattern).await?.len())
	}
}
