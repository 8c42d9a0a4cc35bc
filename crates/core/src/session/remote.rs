//! Maps target-reported error kinds onto typed errors.

use playgodot_protocol::methods::error_kinds;
use playgodot_runtime::Error;

/// What a failed call was operating on, used to fill in typed errors.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Subject<'a> {
	Node(&'a str),
	Property { path: &'a str, property: &'a str },
	Method { path: &'a str, method: &'a str },
	Key(&'a str),
	Scene,
}

impl<'a> Subject<'a> {
	fn path(self) -> Option<&'a str> {
		match self {
			Self::Node(path) | Self::Property { path, .. } | Self::Method { path, .. } => Some(path),
			Self::Key(_) | Self::Scene => None,
		}
	}
}

/// Converts a generic [`Error::Remote`] into the matching typed variant.
/// Other errors and unrecognised kinds pass through unchanged.
pub(crate) fn classify(err: Error, subject: Subject<'_>) -> Error {
	let Error::Remote {
		kind,
		message,
		detail,
		context,
	} = err
	else {
		return err;
	};

	match (kind.as_str(), subject) {
		(error_kinds::NODE_NOT_FOUND, subject) => Error::NodeNotFound {
			path: subject.path().map(str::to_string).unwrap_or(message),
			context,
		},
		(error_kinds::PROPERTY_NOT_FOUND, Subject::Property { path, property }) => {
			Error::PropertyNotFound {
				path: path.to_string(),
				property: property.to_string(),
				context,
			}
		}
		(error_kinds::METHOD_ERROR, Subject::Method { path, method }) => Error::MethodError {
			path: path.to_string(),
			method: method.to_string(),
			message: match detail {
				Some(detail) => format!("{message}\n{detail}"),
				None => message,
			},
			context,
		},
		(error_kinds::UNKNOWN_KEY, Subject::Key(key)) => Error::UnknownKey(key.to_string()),
		(error_kinds::NO_ACTIVE_SCENE, _) => Error::NoActiveScene { context },
		(error_kinds::RELOAD_FAILED, _) => Error::ReloadFailed { message, context },
		(error_kinds::INVALID_ARGUMENT, _) => {
			Error::InvalidArgument(format!("{message} ({context})"))
		}
		_ => Error::Remote {
			kind,
			message,
			detail,
			context,
		},
	}
}
