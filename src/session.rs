//! Federated session bookkeeping.
//!
//! The [`SessionRegistry`] exclusively owns the session-to-token mapping and the per-session
//! participant stack used for single logout; token state stays with the [`TokenService`].
//! Destroying a session cancels every bound token through the service.
//!
//! The active-session counter is only changed while the session map's write lock is held, so it
//! always equals the number of registered sessions, even under concurrent create/destroy calls.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{ParticipantId, SessionId, Token, TokenId},
	holder::IssuerInfo,
	obs::{AuditEvent, AuditSink, NoopAuditSink, OpKind, OpOutcome, OpSpan},
	sts::TokenService,
};

/// Service provider a session has signed into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
	/// Relying-party identifier.
	pub id: ParticipantId,
	/// Whether the participant expects HTTP-POST binding for logout messages.
	pub post_binding: bool,
}

/// One authenticated browser interaction with the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Transport-supplied identifier.
	pub id: SessionId,
	/// Instant the session was registered.
	pub created_at: OffsetDateTime,
	/// Tokens issued during this session.
	pub tokens: BTreeSet<TokenId>,
	/// Participants in sign-in order; the last entry is the top of the stack.
	pub participants: Vec<Participant>,
	/// Participants currently being logged out.
	pub in_transit: BTreeSet<ParticipantId>,
}
impl Session {
	fn new(id: SessionId, created_at: OffsetDateTime) -> Self {
		Self {
			id,
			created_at,
			tokens: BTreeSet::new(),
			participants: Vec::new(),
			in_transit: BTreeSet::new(),
		}
	}
}

/// Registry of active federated sessions.
pub struct SessionRegistry {
	sts: Arc<TokenService>,
	audit: Arc<dyn AuditSink>,
	sessions: RwLock<HashMap<SessionId, Session>>,
	active: AtomicU64,
}
impl SessionRegistry {
	/// Creates an empty registry that cancels tokens through `sts`.
	pub fn new(sts: Arc<TokenService>) -> Self {
		Self {
			sts,
			audit: Arc::new(NoopAuditSink),
			sessions: RwLock::new(HashMap::new()),
			active: AtomicU64::new(0),
		}
	}

	/// Replaces the audit sink.
	pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.audit = audit;

		self
	}

	/// Token service used for cascade cancellation.
	pub fn token_service(&self) -> &Arc<TokenService> {
		&self.sts
	}

	/// Registers a new empty session.
	///
	/// Returns false (and changes nothing) if the identifier is already registered.
	pub fn create_session(&self, id: &SessionId) -> bool {
		let span = OpSpan::new(OpKind::CreateSession, "create_session").entered();
		let active = {
			let mut sessions = self.sessions.write();

			if sessions.contains_key(id) {
				span.record_outcome(OpOutcome::Success);

				return false;
			}

			sessions.insert(id.clone(), Session::new(id.clone(), self.sts.now()));

			self.active.fetch_add(1, Ordering::SeqCst) + 1
		};

		self.audit.record(AuditEvent::SessionCreated { session_id: id.clone(), active });
		span.record_outcome(OpOutcome::Success);

		true
	}

	/// Removes a session and cancels every token bound to it.
	///
	/// Returns `Ok(false)` for unknown sessions. Cancellation continues past individual failures;
	/// the first failure is returned after the whole set was attempted.
	pub fn destroy_session(&self, id: &SessionId) -> Result<bool> {
		let span = OpSpan::new(OpKind::DestroySession, "destroy_session").entered();
		let (session, active) = {
			let mut sessions = self.sessions.write();
			let Some(session) = sessions.remove(id) else {
				span.record_outcome(OpOutcome::Success);

				return Ok(false);
			};
			let active = self
				.active
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
				.unwrap_or_default()
				.saturating_sub(1);

			(session, active)
		};
		let mut first_error = None;
		let mut tokens_cancelled = 0;

		for token_id in &session.tokens {
			match self.sts.cancel(token_id) {
				Ok(()) => tokens_cancelled += 1,
				Err(e) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(session_id = %id, %token_id, error = %e, "cascade cancel failed");

					first_error.get_or_insert(e);
				},
			}
		}

		self.audit.record(AuditEvent::SessionDestroyed {
			session_id: id.clone(),
			tokens_cancelled,
			active,
		});

		span.settle(match first_error {
			Some(e) => Err(e),
			None => Ok(true),
		})
	}

	/// Associates a token with a session.
	pub fn bind_token(&self, id: &SessionId, token_id: TokenId) -> Result<()> {
		let span = OpSpan::new(OpKind::BindToken, "bind_token").entered();

		span.settle(self.with_session(id, |session| {
			session.tokens.insert(token_id);
		}))
	}

	/// Renews a token on behalf of a session and rebinds the session to the replacement.
	///
	/// The session map stays write-locked across the renewal, so a concurrent
	/// [`destroy_session`](Self::destroy_session) observes either the source or the replacement
	/// bound, never neither. Fails with [`Error::UnknownSession`] before touching the token.
	pub fn renew(&self, id: &SessionId, token_id: &TokenId, issuer: &IssuerInfo) -> Result<Token> {
		let span = OpSpan::new(OpKind::BindToken, "renew").entered();
		let result = (|| -> Result<Token> {
			let mut sessions = self.sessions.write();
			let session = sessions
				.get_mut(id)
				.ok_or_else(|| Error::UnknownSession { session_id: id.clone() })?;
			let replacement = self.sts.renew(token_id, issuer)?;

			session.tokens.remove(token_id);
			session.tokens.insert(replacement.id().clone());

			Ok(replacement)
		})();

		span.settle(result)
	}

	/// Number of registered sessions.
	pub fn active_session_count(&self) -> u64 {
		self.active.load(Ordering::SeqCst)
	}

	/// Snapshot of a session.
	pub fn session(&self, id: &SessionId) -> Option<Session> {
		self.sessions.read().get(id).cloned()
	}

	/// Tokens bound to a session; empty for unknown sessions.
	pub fn bound_tokens(&self, id: &SessionId) -> Vec<TokenId> {
		self.read_session(id, |s| s.tokens.iter().cloned().collect()).unwrap_or_default()
	}

	/// Pushes a participant onto the session's stack.
	///
	/// Returns false if the participant was already registered; its position and binding are
	/// left as they were.
	pub fn register_participant(
		&self,
		id: &SessionId,
		participant: ParticipantId,
		post_binding: bool,
	) -> Result<bool> {
		self.with_session(id, |session| {
			if session.participants.iter().any(|p| p.id == participant) {
				return false;
			}

			session.participants.push(Participant { id: participant, post_binding });

			true
		})
	}

	/// Most recently registered participant still on the stack.
	pub fn peek_participant(&self, id: &SessionId) -> Option<Participant> {
		self.read_session(id, |s| s.participants.last().cloned()).flatten()
	}

	/// Removes and returns the most recently registered participant.
	pub fn pop_participant(&self, id: &SessionId) -> Result<Option<Participant>> {
		self.with_session(id, |session| session.participants.pop())
	}

	/// Number of participants on the stack; zero for unknown sessions.
	pub fn participant_count(&self, id: &SessionId) -> usize {
		self.read_session(id, |s| s.participants.len()).unwrap_or(0)
	}

	/// Marks a participant as being logged out. Returns false if it already was.
	pub fn begin_transit(&self, id: &SessionId, participant: ParticipantId) -> Result<bool> {
		self.with_session(id, |session| session.in_transit.insert(participant))
	}

	/// Clears a participant's in-transit mark. Returns false if it was not marked.
	pub fn end_transit(&self, id: &SessionId, participant: &ParticipantId) -> Result<bool> {
		self.with_session(id, |session| session.in_transit.remove(participant))
	}

	/// Number of participants being logged out; zero for unknown sessions.
	pub fn transit_count(&self, id: &SessionId) -> usize {
		self.read_session(id, |s| s.in_transit.len()).unwrap_or(0)
	}

	fn with_session<T>(&self, id: &SessionId, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
		let mut sessions = self.sessions.write();
		let session = sessions
			.get_mut(id)
			.ok_or_else(|| Error::UnknownSession { session_id: id.clone() })?;

		Ok(f(session))
	}

	fn read_session<T>(&self, id: &SessionId, f: impl FnOnce(&Session) -> T) -> Option<T> {
		self.sessions.read().get(id).map(f)
	}
}
impl Debug for SessionRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionRegistry")
			.field("active", &self.active_session_count())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::{AudienceSet, ValidationStatus},
		store::TokenRegistry,
	};

	fn sid(value: &str) -> SessionId {
		SessionId::new(value).expect("Session id fixture should be valid.")
	}

	fn pid(value: &str) -> ParticipantId {
		ParticipantId::new(value).expect("Participant id fixture should be valid.")
	}

	#[test]
	fn re_registration_does_not_double_count() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));

		assert!(harness.sessions.create_session(&sid("s-1")));
		assert!(!harness.sessions.create_session(&sid("s-1")));
		assert_eq!(harness.sessions.active_session_count(), 1);
	}

	#[test]
	fn destroying_unknown_session_keeps_count() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));

		harness.sessions.create_session(&sid("s-1"));

		assert!(!harness.sessions.destroy_session(&sid("s-2")).expect("Destroy should not fail."));
		assert_eq!(harness.sessions.active_session_count(), 1);
	}

	#[test]
	fn bind_token_requires_session() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let token_id = TokenId::new("ID_orphan").expect("Token id fixture should be valid.");
		let err = harness
			.sessions
			.bind_token(&sid("ghost"), token_id)
			.expect_err("Binding to an unknown session must fail.");

		assert!(matches!(err, Error::UnknownSession { .. }));
	}

	#[test]
	fn renew_requires_session_and_leaves_token_alone() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let token = harness
			.sts
			.issue("alice", &test_issuer_info(), &test_confirmation_info(), AudienceSet::default())
			.expect("Issuance should succeed for the fixture.");

		assert!(matches!(
			harness.sessions.renew(&sid("ghost"), token.id(), &test_issuer_info()),
			Err(Error::UnknownSession { .. })
		));
		assert_eq!(harness.sts.validate(&token), ValidationStatus::Valid);
		assert_eq!(harness.registry.len(), 1);
	}

	#[test]
	fn participant_stack_is_lifo_and_unique() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let session = sid("s-1");

		harness.sessions.create_session(&session);

		assert!(
			harness
				.sessions
				.register_participant(&session, pid("https://sp-a.example.com/"), false)
				.expect("Registering on a live session should succeed.")
		);
		assert!(
			harness
				.sessions
				.register_participant(&session, pid("https://sp-b.example.com/"), true)
				.expect("Registering on a live session should succeed.")
		);
		assert!(
			!harness
				.sessions
				.register_participant(&session, pid("https://sp-a.example.com/"), true)
				.expect("Re-registering should succeed as a no-op.")
		);
		assert_eq!(harness.sessions.participant_count(&session), 2);

		let top = harness.sessions.peek_participant(&session).expect("Stack should not be empty.");

		assert_eq!(top.id.as_ref(), "https://sp-b.example.com/");
		assert!(top.post_binding);

		let popped = harness
			.sessions
			.pop_participant(&session)
			.expect("Popping from a live session should succeed.");

		assert_eq!(popped, Some(top));
		assert_eq!(harness.sessions.participant_count(&session), 1);
	}

	#[test]
	fn transit_tracking_and_unknown_sessions() {
		let harness = test_harness(macros::datetime!(2025-01-01 00:00 UTC));
		let session = sid("s-1");
		let sp = pid("https://sp-a.example.com/");

		harness.sessions.create_session(&session);

		assert!(harness.sessions.begin_transit(&session, sp.clone()).expect("Session is live."));
		assert!(!harness.sessions.begin_transit(&session, sp.clone()).expect("Session is live."));
		assert_eq!(harness.sessions.transit_count(&session), 1);
		assert!(harness.sessions.end_transit(&session, &sp).expect("Session is live."));
		assert_eq!(harness.sessions.transit_count(&session), 0);

		assert_eq!(harness.sessions.participant_count(&sid("ghost")), 0);
		assert_eq!(harness.sessions.peek_participant(&sid("ghost")), None);
		assert!(matches!(
			harness.sessions.pop_participant(&sid("ghost")),
			Err(Error::UnknownSession { .. })
		));
	}
}
