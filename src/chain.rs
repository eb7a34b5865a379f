//! Handler chain engine.
//!
//! A [`Chain`] is built once from a [`HandlerChainConfig`] by a [`HandlerRegistry`] and then shared
//! across worker threads. Each [`Chain::process`] call owns its [`ChainRun`]; handlers see only the
//! message, so one chain serves any number of concurrent runs.
//!
//! Locked chains keep their handlers in an immutable slice and reject every structural change.
//! Unlocked chains keep them behind a read/write lock: runs hold the read side for their whole
//! duration, so a mutation waits for in-flight runs and never interleaves with one.

pub mod config;
pub mod context;
pub mod handler;
pub mod registry;

pub use config::*;
pub use context::*;
pub use handler::*;
pub use registry::*;

// self
use crate::{
	_prelude::*,
	auth::HandlerName,
	error::ConfigError,
	obs::{AuditEvent, AuditSink, OpKind, OpOutcome, OpSpan},
};

enum HandlerList {
	Locked(Arc<[HandlerSlot]>),
	Unlocked(RwLock<Vec<HandlerSlot>>),
}

/// Built, reusable handler pipeline.
pub struct Chain {
	handlers: HandlerList,
	executor: Arc<dyn ChainExecutor>,
	audit: Arc<dyn AuditSink>,
}
impl Chain {
	/// Assembles a chain from already-built handlers.
	pub fn new(
		handlers: Vec<HandlerSlot>,
		locking: bool,
		executor: Arc<dyn ChainExecutor>,
		audit: Arc<dyn AuditSink>,
	) -> Self {
		let handlers = if locking {
			HandlerList::Locked(Arc::from(handlers))
		} else {
			HandlerList::Unlocked(RwLock::new(handlers))
		};

		Self { handlers, executor, audit }
	}

	/// Returns true if the handler list is frozen.
	pub fn is_locked(&self) -> bool {
		matches!(self.handlers, HandlerList::Locked(_))
	}

	/// Handler names in execution order.
	pub fn handler_names(&self) -> Vec<HandlerName> {
		match &self.handlers {
			HandlerList::Locked(slots) => slots.iter().map(|s| s.name.clone()).collect(),
			HandlerList::Unlocked(slots) => slots.read().iter().map(|s| s.name.clone()).collect(),
		}
	}

	/// Number of handlers.
	pub fn len(&self) -> usize {
		match &self.handlers {
			HandlerList::Locked(slots) => slots.len(),
			HandlerList::Unlocked(slots) => slots.read().len(),
		}
	}

	/// Returns true if the chain has no handlers.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Runs `message` through every handler in order.
	///
	/// A handler returning [`HandlerOutcome::Stop`] completes the run early with the message as
	/// left so far. A fault fails the run, is reported to the audit sink, and is returned as
	/// [`Error::ProtocolFault`]; no later handler runs.
	pub fn process(&self, message: Message) -> Result<ChainOutcome> {
		let span = OpSpan::new(OpKind::ChainRun, "process").entered();
		let mut run = ChainRun::new(message);

		run.advance(RunState::Running);

		let result = match &self.handlers {
			HandlerList::Locked(slots) => self.executor.execute(slots, &mut run),
			HandlerList::Unlocked(slots) => {
				let guard = slots.read();

				self.executor.execute(&guard, &mut run)
			},
		};

		match result {
			Ok(()) => {
				run.advance(RunState::Completed);
				span.record_outcome(OpOutcome::Success);

				Ok(run.into_outcome())
			},
			Err(fault) => {
				run.advance(RunState::Failed);
				span.record_outcome(OpOutcome::Failure);

				#[cfg(feature = "tracing")]
				tracing::warn!(
					handler = %fault.handler,
					code = fault.code.as_str(),
					reason = %fault.reason,
					"handler chain failed"
				);

				self.audit.record(AuditEvent::HandlerChainFailed {
					handler: fault.handler.clone(),
					code: fault.code,
					reason: fault.reason.clone(),
				});

				Err(fault.into())
			},
		}
	}

	/// Appends a handler.
	pub fn add_handler(&self, name: HandlerName, handler: Arc<dyn Handler>) -> Result<()> {
		self.mutate("add_handler", |slots| {
			Self::ensure_unique(slots, &name)?;
			slots.push(HandlerSlot::new(name, handler));

			Ok(())
		})
	}

	/// Inserts a handler before position `index`; indexes past the end append.
	pub fn insert_handler(
		&self,
		index: usize,
		name: HandlerName,
		handler: Arc<dyn Handler>,
	) -> Result<()> {
		self.mutate("insert_handler", |slots| {
			Self::ensure_unique(slots, &name)?;

			let index = index.min(slots.len());

			slots.insert(index, HandlerSlot::new(name, handler));

			Ok(())
		})
	}

	/// Removes a handler by name and returns it.
	pub fn remove_handler(&self, name: &HandlerName) -> Result<Arc<dyn Handler>> {
		self.mutate("remove_handler", |slots| {
			let position = slots
				.iter()
				.position(|slot| &slot.name == name)
				.ok_or_else(|| ConfigError::UnknownHandler { name: name.clone() })?;

			Ok(slots.remove(position).handler)
		})
	}

	fn mutate<T>(
		&self,
		operation: &'static str,
		f: impl FnOnce(&mut Vec<HandlerSlot>) -> Result<T>,
	) -> Result<T> {
		match &self.handlers {
			HandlerList::Locked(_) => Err(Error::ChainLocked { operation }),
			HandlerList::Unlocked(slots) => f(&mut slots.write()),
		}
	}

	fn ensure_unique(slots: &[HandlerSlot], name: &HandlerName) -> Result<()> {
		if slots.iter().any(|slot| &slot.name == name) {
			return Err(ConfigError::DuplicateHandler { name: name.clone() }.into());
		}

		Ok(())
	}
}
impl Debug for Chain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Chain")
			.field("locked", &self.is_locked())
			.field("handlers", &self.handler_names())
			.finish_non_exhaustive()
	}
}
