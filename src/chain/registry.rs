//! Factory registry that turns declarations into built chains.

// self
use crate::{
	_prelude::*,
	auth::HandlerName,
	chain::{
		Chain, ChainExecutor, Handler, HandlerChainConfig, HandlerSlot, HandlerSpec,
		SequentialExecutor,
	},
	error::ConfigError,
	handlers,
	holder::{ConfirmationInfo, IssuerInfo},
	obs::{AuditSink, NoopAuditSink},
	session::SessionRegistry,
	sts::TokenService,
};

/// Name of the executor used when a declaration does not pick one.
pub const DEFAULT_EXECUTOR: &str = "default";

/// Constructor invoked once per declared handler at build time.
pub type HandlerFactory =
	Arc<dyn Fn(&HandlerSpec, &HandlerEnv) -> Result<Arc<dyn Handler>, ConfigError> + Send + Sync>;

/// Collaborators available to handler factories.
#[derive(Clone, Default)]
pub struct HandlerEnv {
	/// Token service.
	pub sts: Option<Arc<TokenService>>,
	/// Session registry.
	pub sessions: Option<Arc<SessionRegistry>>,
	/// Issuer parameters for assertions minted by handlers.
	pub issuer: Option<IssuerInfo>,
	/// Confirmation parameters for assertions minted by handlers.
	pub confirmation: Option<ConfirmationInfo>,
	/// Audit sink for chain failures; falls back to the token service's sink.
	pub audit: Option<Arc<dyn AuditSink>>,
}
impl HandlerEnv {
	/// Sets the token service.
	pub fn with_sts(mut self, sts: Arc<TokenService>) -> Self {
		self.sts = Some(sts);

		self
	}

	/// Sets the session registry.
	pub fn with_sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
		self.sessions = Some(sessions);

		self
	}

	/// Sets the issuer parameters.
	pub fn with_issuer(mut self, issuer: IssuerInfo) -> Self {
		self.issuer = Some(issuer);

		self
	}

	/// Sets the confirmation parameters.
	pub fn with_confirmation(mut self, confirmation: ConfirmationInfo) -> Self {
		self.confirmation = Some(confirmation);

		self
	}

	/// Sets the audit sink.
	pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.audit = Some(audit);

		self
	}

	/// Token service or [`ConfigError::MissingCollaborator`].
	pub fn require_sts(&self, handler: &HandlerName) -> Result<Arc<TokenService>, ConfigError> {
		self.sts.clone().ok_or_else(|| missing(handler, "token service"))
	}

	/// Session registry or [`ConfigError::MissingCollaborator`].
	pub fn require_sessions(
		&self,
		handler: &HandlerName,
	) -> Result<Arc<SessionRegistry>, ConfigError> {
		self.sessions.clone().ok_or_else(|| missing(handler, "session registry"))
	}

	/// Issuer parameters or [`ConfigError::MissingCollaborator`].
	pub fn require_issuer(&self, handler: &HandlerName) -> Result<IssuerInfo, ConfigError> {
		self.issuer.clone().ok_or_else(|| missing(handler, "issuer info"))
	}

	fn audit_sink(&self) -> Arc<dyn AuditSink> {
		match (&self.audit, &self.sts) {
			(Some(audit), _) => audit.clone(),
			(None, Some(sts)) => sts.audit().clone(),
			(None, None) => Arc::new(NoopAuditSink),
		}
	}
}
impl Debug for HandlerEnv {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HandlerEnv")
			.field("sts", &self.sts.is_some())
			.field("sessions", &self.sessions.is_some())
			.field("issuer", &self.issuer)
			.field("confirmation", &self.confirmation)
			.field("audit", &self.audit.is_some())
			.finish()
	}
}

fn missing(handler: &HandlerName, collaborator: &'static str) -> ConfigError {
	ConfigError::MissingCollaborator { handler: handler.clone(), collaborator }
}

/// Closed set of handler kinds and executors a deployment may reference.
#[derive(Clone)]
pub struct HandlerRegistry {
	factories: HashMap<String, HandlerFactory>,
	executors: HashMap<String, Arc<dyn ChainExecutor>>,
}
impl HandlerRegistry {
	/// Registry with the `default` executor and no handler kinds.
	pub fn new() -> Self {
		let mut executors = HashMap::<String, Arc<dyn ChainExecutor>>::new();

		executors.insert(DEFAULT_EXECUTOR.to_owned(), Arc::new(SequentialExecutor));

		Self { factories: HashMap::new(), executors }
	}

	/// Registry preloaded with the built-in handler kinds.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();

		handlers::register_builtins(&mut registry);

		registry
	}

	/// Registers (or replaces) a handler kind.
	pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
	where
		F: Fn(&HandlerSpec, &HandlerEnv) -> Result<Arc<dyn Handler>, ConfigError>
			+ Send
			+ Sync
			+ 'static,
	{
		self.factories.insert(kind.into(), Arc::new(factory));

		self
	}

	/// Registers (or replaces) a named executor.
	pub fn register_executor(
		&mut self,
		name: impl Into<String>,
		executor: Arc<dyn ChainExecutor>,
	) -> &mut Self {
		self.executors.insert(name.into(), executor);

		self
	}

	/// Returns true if a factory is registered for `kind`.
	pub fn knows(&self, kind: &str) -> bool {
		self.factories.contains_key(kind)
	}

	/// Instantiates every declared handler, in order, and assembles the chain.
	pub fn build(&self, config: &HandlerChainConfig, env: &HandlerEnv) -> Result<Chain> {
		let executor_name = config.chain_class.as_deref().unwrap_or(DEFAULT_EXECUTOR);
		let executor = self
			.executors
			.get(executor_name)
			.cloned()
			.ok_or_else(|| ConfigError::UnknownExecutor { name: executor_name.to_owned() })?;
		let mut slots: Vec<HandlerSlot> = Vec::with_capacity(config.handlers.len());

		for spec in &config.handlers {
			if slots.iter().any(|slot| slot.name == spec.name) {
				return Err(ConfigError::DuplicateHandler { name: spec.name.clone() }.into());
			}

			let factory = self
				.factories
				.get(&spec.kind)
				.ok_or_else(|| ConfigError::UnknownHandlerKind { kind: spec.kind.clone() })?;

			slots.push(HandlerSlot::new(spec.name.clone(), factory(spec, env)?));
		}

		#[cfg(feature = "tracing")]
		tracing::info!(
			handlers = slots.len(),
			locking = config.locking,
			executor = executor_name,
			"handler chain built"
		);

		Ok(Chain::new(slots, config.locking, executor, env.audit_sink()))
	}
}
impl Default for HandlerRegistry {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for HandlerRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut kinds = self.factories.keys().collect::<Vec<_>>();
		let mut executors = self.executors.keys().collect::<Vec<_>>();

		kinds.sort();
		executors.sort();

		f.debug_struct("HandlerRegistry")
			.field("kinds", &kinds)
			.field("executors", &executors)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::chain::{HandlerOutcome, Message};

	fn name(value: &str) -> HandlerName {
		HandlerName::new(value).expect("Handler name fixture should be valid.")
	}

	fn passthrough(_: &HandlerSpec, _: &HandlerEnv) -> Result<Arc<dyn Handler>, ConfigError> {
		Ok(Arc::new(|_: &mut Message| -> Result<HandlerOutcome, crate::chain::Fault> {
			Ok(HandlerOutcome::Continue)
		}))
	}

	#[test]
	fn unknown_kinds_and_executors_fail_the_build() {
		let mut registry = HandlerRegistry::new();

		registry.register("noop", passthrough);

		let unknown_kind =
			HandlerChainConfig::new(false).handler(HandlerSpec::new(name("x"), "missing"));

		assert!(matches!(
			registry.build(&unknown_kind, &HandlerEnv::default()),
			Err(Error::Config(ConfigError::UnknownHandlerKind { .. }))
		));

		let unknown_executor = HandlerChainConfig::new(false).chain_class("parallel");

		assert!(matches!(
			registry.build(&unknown_executor, &HandlerEnv::default()),
			Err(Error::Config(ConfigError::UnknownExecutor { .. }))
		));
	}

	#[test]
	fn duplicate_names_are_rejected() {
		let mut registry = HandlerRegistry::new();

		registry.register("noop", passthrough);

		let config = HandlerChainConfig::new(true)
			.handler(HandlerSpec::new(name("a"), "noop"))
			.handler(HandlerSpec::new(name("a"), "noop"));

		assert!(matches!(
			registry.build(&config, &HandlerEnv::default()),
			Err(Error::Config(ConfigError::DuplicateHandler { .. }))
		));
	}

	#[test]
	fn builtins_are_registered() {
		let registry = HandlerRegistry::with_builtins();

		for kind in ["issuer-trust", "assertion-issuer", "assertion-validator", "logout"] {
			assert!(registry.knows(kind), "Built-in kind `{kind}` should be registered.");
		}
	}

	#[test]
	fn builtins_report_missing_collaborators() {
		let registry = HandlerRegistry::with_builtins();
		let config =
			HandlerChainConfig::new(true).handler(HandlerSpec::new(name("bye"), "logout"));

		assert!(matches!(
			registry.build(&config, &HandlerEnv::default()),
			Err(Error::Config(ConfigError::MissingCollaborator { .. }))
		));
	}
}
