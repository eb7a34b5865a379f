//! Built-in protocol handlers.
//!
//! | Kind | Handler |
//! | --- | --- |
//! | `issuer-trust` | [`IssuerTrustHandler`] |
//! | `assertion-issuer` | [`AssertionIssuerHandler`] |
//! | `assertion-validator` | [`AssertionValidatorHandler`] |
//! | `logout` | [`LogoutHandler`] |

mod assertion_issuer;
mod assertion_validator;
mod issuer_trust;
mod logout;

pub use assertion_issuer::AssertionIssuerHandler;
pub use assertion_validator::AssertionValidatorHandler;
pub use issuer_trust::IssuerTrustHandler;
pub use logout::LogoutHandler;

// self
use crate::chain::HandlerRegistry;

/// Registry key of [`IssuerTrustHandler`].
pub const ISSUER_TRUST: &str = "issuer-trust";
/// Registry key of [`AssertionIssuerHandler`].
pub const ASSERTION_ISSUER: &str = "assertion-issuer";
/// Registry key of [`AssertionValidatorHandler`].
pub const ASSERTION_VALIDATOR: &str = "assertion-validator";
/// Registry key of [`LogoutHandler`].
pub const LOGOUT: &str = "logout";

pub(crate) fn register_builtins(registry: &mut HandlerRegistry) {
	registry
		.register(ISSUER_TRUST, IssuerTrustHandler::from_spec)
		.register(ASSERTION_ISSUER, AssertionIssuerHandler::from_spec)
		.register(ASSERTION_VALIDATOR, AssertionValidatorHandler::from_spec)
		.register(LOGOUT, LogoutHandler::from_spec);
}
