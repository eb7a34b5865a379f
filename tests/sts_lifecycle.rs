// std
use std::{
	sync::atomic::{AtomicBool, Ordering},
	thread,
};
// crates.io
use time::macros;
// self
use federation_sts::{
	_preludet::*,
	auth::{AudienceSet, Token, TokenBuilderError, TokenId, TokenState, ValidationStatus},
	error::{IssuanceError, RenewalError},
	holder::IssuerInfo,
	obs::AuditEvent,
	store::TokenRegistry,
	sts::ServiceConfig,
};

const START: OffsetDateTime = macros::datetime!(2025-06-01 09:00 UTC);

fn issue(harness: &TestHarness, subject: &str) -> Token {
	harness
		.sts
		.issue(subject, &test_issuer_info(), &test_confirmation_info(), AudienceSet::default())
		.expect("Issuance should succeed for the fixture.")
}

#[test]
fn issue_validate_cancel_round_trip() {
	let harness = test_harness(START);
	let token = issue(&harness, "alice");

	assert_eq!(token.issuer(), TEST_ISSUER);
	assert_eq!(harness.sts.validate(&token), ValidationStatus::Valid);

	harness.sts.cancel(token.id()).expect("First cancel should succeed.");
	harness.sts.cancel(token.id()).expect("Repeated cancel should be a no-op.");

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Cancelled);
	assert_eq!(harness.sts.state_of(token.id()), Some(TokenState::Cancelled));
	assert_eq!(harness.sts.metrics().cancelled(), 1);
	assert!(matches!(
		harness.audit.events().as_slice(),
		[AuditEvent::TokenIssued { .. }, AuditEvent::TokenCancelled { .. }]
	));
}

#[test]
fn validity_window_is_half_open() {
	let harness = test_harness(START);
	let token = issue(&harness, "alice");

	harness.clock.set(START + Duration::minutes(4) + Duration::seconds(59));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Valid);

	harness.clock.set(START + Duration::minutes(5));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Expired);

	harness.clock.set(START + Duration::minutes(5) + Duration::seconds(1));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Expired);
	assert_eq!(harness.sts.state_of(token.id()), Some(TokenState::Expired));

	harness.clock.set(START + Duration::minutes(1));

	// Expiry is terminal once observed.
	assert_eq!(harness.sts.validate(&token), ValidationStatus::Expired);
}

#[test]
fn clock_skew_widens_both_edges() {
	let config = ServiceConfig { clock_skew: Duration::seconds(30), ..ServiceConfig::default() };
	let harness = test_harness_with(START, config);
	let token = issue(&harness, "alice");

	harness.clock.set(START - Duration::seconds(20));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Valid);

	harness.clock.set(START - Duration::seconds(31));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::NotYetValid);

	harness.clock.set(START + Duration::minutes(5) + Duration::seconds(29));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Valid);

	harness.clock.set(START + Duration::minutes(5) + Duration::seconds(30));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Expired);
}

#[test]
fn oversized_skew_and_validity_are_contained() {
	let config: ServiceConfig =
		serde_json::from_str(r#"{ "clock_skew": [9223372036854775807, 0] }"#)
			.expect("Extreme skew should still deserialize.");
	let harness = test_harness_with(START, config);
	let token = issue(&harness, "alice");

	harness.clock.set(START + Duration::days(365));

	assert_eq!(harness.sts.validate(&token), ValidationStatus::Valid);

	let issuer = IssuerInfo::builder(TEST_ISSUER)
		.validity(Duration::days(4_000_000))
		.build()
		.expect("Positive validity should pass the builder.");

	assert!(matches!(
		harness.sts.issue("bob", &issuer, &test_confirmation_info(), AudienceSet::default()),
		Err(Error::Issuance(IssuanceError::Build(TokenBuilderError::WindowOverflow)))
	));
	assert!(matches!(
		harness.sts.renew(token.id(), &issuer),
		Err(Error::Issuance(IssuanceError::Build(TokenBuilderError::WindowOverflow)))
	));
	assert_eq!(harness.registry.len(), 1);
	assert_eq!(harness.sts.state_of(token.id()), Some(TokenState::Issued));
}

#[test]
fn tampered_and_unknown_tokens_are_rejected() {
	let harness = test_harness(START);
	let token = issue(&harness, "alice");
	let mut raw = serde_json::to_value(&token).expect("Token should serialize.");

	raw["subject"] = serde_json::Value::from("mallory");

	let forged: Token = serde_json::from_value(raw).expect("Forged token should deserialize.");

	assert_eq!(harness.sts.validate(&forged), ValidationStatus::SignatureInvalid);
	assert_eq!(harness.sts.validate(&token), ValidationStatus::Valid);

	let stranger = test_harness(START);
	let foreign = issue(&stranger, "alice");

	assert_eq!(harness.sts.validate(&foreign), ValidationStatus::Unknown);
	assert_eq!(harness.sts.validate_id(&TokenId::generate()), ValidationStatus::Unknown);
}

#[test]
fn audience_restriction_is_enforced_per_relying_party() {
	let harness = test_harness(START);
	let audience = AudienceSet::new(["https://sp-a.example.com/", "https://sp-b.example.com/"])
		.expect("Audience fixture should be valid.");
	let token = harness
		.sts
		.issue("alice", &test_issuer_info(), &test_confirmation_info(), audience)
		.expect("Issuance should succeed for the fixture.");
	let open = issue(&harness, "bob");

	assert_eq!(
		harness.sts.validate_for(&token, "https://sp-b.example.com/"),
		ValidationStatus::Valid
	);
	assert_eq!(
		harness.sts.validate_for(&token, "https://sp-c.example.com/"),
		ValidationStatus::AudienceMismatch
	);
	assert_eq!(
		harness.sts.validate_for(&open, "https://sp-c.example.com/"),
		ValidationStatus::Valid
	);
}

#[test]
fn require_valid_maps_statuses_to_errors() {
	let harness = test_harness(START);
	let expiring = issue(&harness, "alice");
	let cancelled = issue(&harness, "bob");

	harness.sts.require_valid(&expiring).expect("Fresh token should be valid.");
	harness.sts.cancel(cancelled.id()).expect("Cancel should succeed.");
	harness.clock.advance(Duration::minutes(6));

	assert!(matches!(
		harness.sts.require_valid(&expiring),
		Err(Error::AssertionExpired { not_on_or_after, .. })
			if not_on_or_after == expiring.not_on_or_after()
	));
	assert!(matches!(
		harness.sts.require_valid(&cancelled),
		Err(Error::InvalidToken { status: ValidationStatus::Cancelled, .. })
	));
}

#[test]
fn renew_replaces_source_and_refuses_terminal_tokens() {
	let harness = test_harness(START);
	let source = issue(&harness, "alice");

	harness.clock.advance(Duration::minutes(2));

	let replacement =
		harness.sts.renew(source.id(), &test_issuer_info()).expect("Renewal should succeed.");

	assert_ne!(replacement.id(), source.id());
	assert_eq!(replacement.subject(), "alice");
	assert_eq!(replacement.not_before(), START + Duration::minutes(2));
	assert_eq!(harness.sts.validate(&source), ValidationStatus::Cancelled);
	assert_eq!(harness.sts.validate(&replacement), ValidationStatus::Valid);
	assert!(matches!(
		harness.sts.renew(source.id(), &test_issuer_info()),
		Err(Error::Renewal(RenewalError::Cancelled { .. }))
	));

	harness.clock.advance(Duration::minutes(10));

	assert!(matches!(
		harness.sts.renew(replacement.id(), &test_issuer_info()),
		Err(Error::Renewal(RenewalError::Expired { .. }))
	));
	assert!(matches!(
		harness.sts.renew(&TokenId::generate(), &test_issuer_info()),
		Err(Error::Renewal(RenewalError::Unknown { .. }))
	));
	assert_eq!(harness.sts.metrics().renewed(), 1);
}

#[test]
fn concurrent_renewals_have_a_single_winner() {
	let harness = test_harness(START);
	let source = issue(&harness, "alice");
	let done = AtomicBool::new(false);
	let winners = thread::scope(|scope| {
		let validators = (0..4)
			.map(|_| {
				scope.spawn(|| {
					while !done.load(Ordering::SeqCst) {
						let status = harness.sts.validate(&source);

						// The source retires in the same critical section that records its
						// replacement, so a retired source implies two tracked tokens.
						if status != ValidationStatus::Valid {
							assert_eq!(status, ValidationStatus::Cancelled);
							assert_eq!(harness.registry.len(), 2);
						}
					}
				})
			})
			.collect::<Vec<_>>();
		let renewers = (0..8)
			.map(|_| scope.spawn(|| harness.sts.renew(source.id(), &test_issuer_info())))
			.collect::<Vec<_>>();
		let results = renewers
			.into_iter()
			.map(|handle| handle.join().expect("Renewer thread should not panic."))
			.collect::<Vec<_>>();

		done.store(true, Ordering::SeqCst);

		for validator in validators {
			validator.join().expect("Validator thread should not panic.");
		}

		results.into_iter().filter_map(Result::ok).collect::<Vec<_>>()
	});

	assert_eq!(winners.len(), 1);
	assert_eq!(harness.sts.validate(&winners[0]), ValidationStatus::Valid);
	assert_eq!(harness.sts.validate(&source), ValidationStatus::Cancelled);
	assert_eq!(harness.registry.len(), 2);
}

#[test]
fn unknown_cancellations_are_remembered_only_when_configured() {
	let forgetful = test_harness(START);
	let id = TokenId::generate();

	forgetful.sts.cancel(&id).expect("Cancelling an unknown id should succeed.");

	assert_eq!(forgetful.sts.validate_id(&id), ValidationStatus::Unknown);
	assert_eq!(forgetful.sts.state_of(&id), None);

	let config = ServiceConfig { remember_unknown_cancellations: true, ..ServiceConfig::default() };
	let remembering = test_harness_with(START, config);

	remembering.sts.cancel(&id).expect("Cancelling an unknown id should succeed.");

	assert_eq!(remembering.sts.validate_id(&id), ValidationStatus::Cancelled);
	assert_eq!(remembering.sts.state_of(&id), Some(TokenState::Cancelled));
	assert!(matches!(
		remembering.sts.renew(&id, &test_issuer_info()),
		Err(Error::Renewal(RenewalError::Cancelled { .. }))
	));
}
