//! Per-message state carried through a chain run.

// self
use crate::{
	_prelude::*,
	auth::{HandlerName, SessionId, Token},
};

/// Protocol message kinds understood by the built-in handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
	/// Service provider asks the identity provider to authenticate a subject.
	AuthnRequest,
	/// Identity provider answers with an assertion.
	Response,
	/// Either side starts single logout.
	LogoutRequest,
	/// Answer to a logout request.
	LogoutResponse,
}

/// In-memory protocol message handed from the transport binding to the chain.
///
/// Everything a handler learns or decides about one message lives here; handlers themselves keep
/// no per-message state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
	/// Message kind.
	pub kind: MessageKind,
	/// Entity that sent the message.
	pub issuer: Option<String>,
	/// Entity the message is addressed to (usually the relying party).
	pub destination: Option<String>,
	/// Transport session the message belongs to.
	pub session_id: Option<SessionId>,
	/// Authenticated principal, when known.
	pub subject: Option<String>,
	/// Assertion carried by (or attached to) the message.
	pub token: Option<Token>,
	/// Opaque state echoed back to the relying party.
	pub relay_state: Option<String>,
	/// Free-form attributes exchanged between handlers.
	pub attributes: BTreeMap<String, String>,
	/// Ordered notes appended by handlers.
	pub trail: Vec<String>,
}
impl Message {
	/// Creates an empty message of the provided kind.
	pub fn new(kind: MessageKind) -> Self {
		Self {
			kind,
			issuer: None,
			destination: None,
			session_id: None,
			subject: None,
			token: None,
			relay_state: None,
			attributes: BTreeMap::new(),
			trail: Vec::new(),
		}
	}

	/// Sets the sending entity.
	pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
		self.issuer = Some(issuer.into());

		self
	}

	/// Sets the addressed entity.
	pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
		self.destination = Some(destination.into());

		self
	}

	/// Sets the transport session.
	pub fn with_session(mut self, session_id: SessionId) -> Self {
		self.session_id = Some(session_id);

		self
	}

	/// Sets the authenticated principal.
	pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = Some(subject.into());

		self
	}

	/// Attaches an assertion.
	pub fn with_token(mut self, token: Token) -> Self {
		self.token = Some(token);

		self
	}

	/// Sets the relay state.
	pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
		self.relay_state = Some(relay_state.into());

		self
	}

	/// Adds a free-form attribute.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(key.into(), value.into());

		self
	}

	/// Appends a note to the trail.
	pub fn note(&mut self, entry: impl Into<String>) {
		self.trail.push(entry.into());
	}
}

/// Lifecycle of one chain run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
	/// Run prepared, no handler invoked yet.
	Built,
	/// Handlers are executing.
	Running,
	/// Every handler ran, or one signalled stop.
	Completed,
	/// A handler raised a protocol fault.
	Failed,
}
impl RunState {
	/// Returns true for states a run cannot leave.
	pub const fn is_final(self) -> bool {
		matches!(self, RunState::Completed | RunState::Failed)
	}

	/// Returns true if `next` is a legal successor.
	pub const fn can_advance_to(self, next: RunState) -> bool {
		matches!(
			(self, next),
			(RunState::Built, RunState::Running)
				| (RunState::Running, RunState::Completed)
				| (RunState::Running, RunState::Failed)
		)
	}
}

/// Mutable state of a run in progress, owned by the calling thread.
#[derive(Debug)]
pub struct ChainRun {
	/// Message being processed.
	pub message: Message,
	state: RunState,
	executed: Vec<HandlerName>,
}
impl ChainRun {
	pub(crate) fn new(message: Message) -> Self {
		Self { message, state: RunState::Built, executed: Vec::new() }
	}

	/// Current run state.
	pub fn state(&self) -> RunState {
		self.state
	}

	/// Handlers invoked so far, in order.
	pub fn executed(&self) -> &[HandlerName] {
		&self.executed
	}

	/// Records that a handler is about to run.
	pub fn mark_executed(&mut self, name: HandlerName) {
		self.executed.push(name);
	}

	pub(crate) fn advance(&mut self, next: RunState) {
		debug_assert!(
			self.state.can_advance_to(next),
			"illegal run transition {:?} -> {next:?}",
			self.state
		);

		self.state = next;
	}

	pub(crate) fn into_outcome(self) -> ChainOutcome {
		ChainOutcome { message: self.message, state: self.state, executed: self.executed }
	}
}

/// Report of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainOutcome {
	/// Message as left by the last handler that ran.
	pub message: Message,
	/// Final run state.
	pub state: RunState,
	/// Handlers that ran, in order.
	pub executed: Vec<HandlerName>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn run_state_transitions_follow_the_lifecycle() {
		assert!(RunState::Built.can_advance_to(RunState::Running));
		assert!(RunState::Running.can_advance_to(RunState::Completed));
		assert!(RunState::Running.can_advance_to(RunState::Failed));
		assert!(!RunState::Built.can_advance_to(RunState::Completed));
		assert!(!RunState::Failed.can_advance_to(RunState::Running));
		assert!(RunState::Failed.is_final());
		assert!(!RunState::Running.is_final());
	}

	#[test]
	fn message_builder_sets_fields() {
		let message = Message::new(MessageKind::AuthnRequest)
			.with_issuer("https://sp.example.com/")
			.with_destination("https://idp.example.com/")
			.with_relay_state("abc")
			.with_attribute("binding", "post");

		assert_eq!(message.issuer.as_deref(), Some("https://sp.example.com/"));
		assert_eq!(message.relay_state.as_deref(), Some("abc"));
		assert_eq!(message.attributes.get("binding").map(String::as_str), Some("post"));
		assert!(message.token.is_none());
	}
}
