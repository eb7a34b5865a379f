//! Handler contract and the default executor.

// self
use crate::{
	_prelude::*,
	auth::HandlerName,
	chain::{ChainRun, Message},
	error::{FaultCode, ProtocolFault},
};

/// Explicit result of a handler that did not fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerOutcome {
	/// Pass the message to the next handler.
	Continue,
	/// Skip the remaining handlers; the run completes with the message as-is.
	Stop,
}

/// Failure signalled by a handler; the chain attaches the handler name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
	/// Fault classification.
	pub code: FaultCode,
	/// Human-readable reason.
	pub reason: String,
}
impl Fault {
	/// Creates a fault.
	pub fn new(code: FaultCode, reason: impl Into<String>) -> Self {
		Self { code, reason: reason.into() }
	}

	/// Attaches the raising handler's name.
	pub fn raised_by(self, handler: HandlerName) -> ProtocolFault {
		ProtocolFault { handler, code: self.code, reason: self.reason }
	}
}

/// Protocol handler invoked once per message.
///
/// A single instance serves every concurrent run, so implementations keep per-message state on
/// the [`Message`] only.
pub trait Handler
where
	Self: Send + Sync,
{
	/// Processes the message in place.
	fn handle(&self, message: &mut Message) -> Result<HandlerOutcome, Fault>;
}
impl<F> Handler for F
where
	F: Fn(&mut Message) -> Result<HandlerOutcome, Fault> + Send + Sync,
{
	fn handle(&self, message: &mut Message) -> Result<HandlerOutcome, Fault> {
		self(message)
	}
}

/// Named handler as stored in a chain.
#[derive(Clone)]
pub struct HandlerSlot {
	/// Handler name, unique within the chain.
	pub name: HandlerName,
	/// Handler instance.
	pub handler: Arc<dyn Handler>,
}
impl HandlerSlot {
	/// Pairs a name with a handler.
	pub fn new(name: HandlerName, handler: Arc<dyn Handler>) -> Self {
		Self { name, handler }
	}
}
impl Debug for HandlerSlot {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("HandlerSlot").field(&self.name).finish()
	}
}

/// Strategy that drives handlers over a run.
///
/// Alternative executors are registered by name and selected through the chain declaration.
pub trait ChainExecutor
where
	Self: Send + Sync,
{
	/// Invokes `handlers` against `run`, stopping at the first fault.
	fn execute(&self, handlers: &[HandlerSlot], run: &mut ChainRun) -> Result<(), ProtocolFault>;
}

/// Runs handlers strictly in declaration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialExecutor;
impl ChainExecutor for SequentialExecutor {
	fn execute(&self, handlers: &[HandlerSlot], run: &mut ChainRun) -> Result<(), ProtocolFault> {
		for slot in handlers {
			run.mark_executed(slot.name.clone());

			match slot.handler.handle(&mut run.message) {
				Ok(HandlerOutcome::Continue) => {},
				Ok(HandlerOutcome::Stop) => break,
				Err(fault) => return Err(fault.raised_by(slot.name.clone())),
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::chain::MessageKind;

	fn slot(name: &str, handler: impl Handler + 'static) -> HandlerSlot {
		HandlerSlot::new(
			HandlerName::new(name).expect("Handler name fixture should be valid."),
			Arc::new(handler),
		)
	}

	#[test]
	fn sequential_executor_stops_on_stop_and_fault() {
		let handlers = [
			slot("a", |m: &mut Message| -> Result<HandlerOutcome, Fault> {
				m.note("a");

				Ok(HandlerOutcome::Continue)
			}),
			slot("b", |_: &mut Message| -> Result<HandlerOutcome, Fault> {
				Err(Fault::new(FaultCode::Processing, "boom"))
			}),
			slot("c", |m: &mut Message| -> Result<HandlerOutcome, Fault> {
				m.note("c");

				Ok(HandlerOutcome::Continue)
			}),
		];
		let mut run = ChainRun::new(Message::new(MessageKind::Response));
		let fault = SequentialExecutor
			.execute(&handlers, &mut run)
			.expect_err("Second handler should fault.");

		assert_eq!(fault.handler.as_ref(), "b");
		assert_eq!(fault.code, FaultCode::Processing);
		assert_eq!(run.message.trail, vec!["a".to_string()]);
		assert_eq!(run.executed().len(), 2);
	}
}
