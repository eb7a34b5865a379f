//! Federated security token service and SSO handler-chain engine.
//!
//! The token service issues and validates signed assertions, renews them atomically, and cancels
//! them on logout. Sessions tie tokens to browser interactions. Every federation message runs
//! through an ordered, optionally locked pipeline of protocol handlers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod chain;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod holder;
pub mod obs;
pub mod session;
pub mod store;
pub mod sts;
#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures shared by unit and integration tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ConfirmationMethod, NameIdFormat},
		clock::ManualClock,
		crypto::HmacSha256Signer,
		holder::{ConfirmationInfo, IssuerInfo},
		obs::MemoryAuditSink,
		session::SessionRegistry,
		store::{MemoryRegistry, TokenRegistry},
		sts::{ServiceConfig, TokenService},
	};

	/// Issuer URI used by test fixtures.
	pub const TEST_ISSUER: &str = "https://idp.example.com/saml";
	/// HMAC key used by test fixtures.
	pub const TEST_KEY: &[u8] = b"federation-sts-test-key-0123456789abcdef";

	/// Everything a test needs to drive the token service deterministically.
	pub struct TestHarness {
		/// Token service under test.
		pub sts: Arc<TokenService>,
		/// Session registry wired to [`TestHarness::sts`].
		pub sessions: Arc<SessionRegistry>,
		/// Registry backend shared with the service.
		pub registry: Arc<MemoryRegistry>,
		/// Manual clock driving every temporal decision.
		pub clock: Arc<ManualClock>,
		/// Audit sink capturing lifecycle events.
		pub audit: Arc<MemoryAuditSink>,
	}

	/// Builds a harness starting at the provided instant with default service config.
	pub fn test_harness(start: OffsetDateTime) -> TestHarness {
		test_harness_with(start, ServiceConfig::default())
	}

	/// Builds a harness starting at the provided instant with a custom service config.
	pub fn test_harness_with(start: OffsetDateTime, config: ServiceConfig) -> TestHarness {
		let registry = Arc::new(MemoryRegistry::default());
		let registry_dyn: Arc<dyn TokenRegistry> = registry.clone();
		let crypto = Arc::new(
			HmacSha256Signer::new(TEST_ISSUER, TEST_KEY)
				.expect("Test HMAC key should be accepted by the signer."),
		);
		let clock = Arc::new(ManualClock::new(start));
		let audit = Arc::new(MemoryAuditSink::default());
		let sts = Arc::new(
			TokenService::new(registry_dyn, crypto.clone(), crypto)
				.with_clock(clock.clone())
				.with_audit(audit.clone())
				.with_config(config),
		);
		let sessions = Arc::new(SessionRegistry::new(sts.clone()).with_audit(audit.clone()));

		TestHarness { sts, sessions, registry, clock, audit }
	}

	/// Issuer fixture with the default five minute validity.
	pub fn test_issuer_info() -> IssuerInfo {
		IssuerInfo::builder(TEST_ISSUER).build().expect("Issuer fixture should be valid.")
	}

	/// Bearer confirmation fixture.
	pub fn test_confirmation_info() -> ConfirmationInfo {
		ConfirmationInfo::new(ConfirmationMethod::Bearer, NameIdFormat::Persistent)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use color_eyre as _;
