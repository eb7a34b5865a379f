//! Signs a browser session in through the built-in handler chain, validates the minted assertion,
//! renews it, and logs the session out again.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use time::Duration;
// self
use federation_sts::{
	auth::{ConfirmationMethod, NameIdFormat, SessionId},
	chain::{HandlerChainConfig, HandlerEnv, HandlerRegistry, Message, MessageKind},
	crypto::HmacSha256Signer,
	holder::{ConfirmationInfo, IssuerInfo},
	obs::MemoryAuditSink,
	session::SessionRegistry,
	store::MemoryRegistry,
	sts::TokenService,
};

const CHAIN: &str = r#"{
	"locking": true,
	"handlers": [
		{ "name": "trust", "kind": "issuer-trust", "options": { "domains": "example.com" } },
		{ "name": "logout", "kind": "logout" },
		{ "name": "issue", "kind": "assertion-issuer" },
		{ "name": "validate", "kind": "assertion-validator", "options": { "required": "true" } }
	]
}"#;

fn main() -> Result<()> {
	color_eyre::install()?;

	let crypto = Arc::new(HmacSha256Signer::new(
		"https://idp.example.com/saml",
		b"demo-signing-key-demo-signing-key-0123",
	)?);
	let audit = Arc::new(MemoryAuditSink::default());
	let sts = Arc::new(
		TokenService::new(Arc::new(MemoryRegistry::default()), crypto.clone(), crypto)
			.with_audit(audit.clone()),
	);
	let sessions = Arc::new(SessionRegistry::new(sts.clone()).with_audit(audit.clone()));
	let issuer = IssuerInfo::builder("https://idp.example.com/saml")
		.validity(Duration::minutes(10))
		.build()?;
	let env = HandlerEnv::default()
		.with_sts(sts.clone())
		.with_sessions(sessions.clone())
		.with_issuer(issuer.clone())
		.with_confirmation(ConfirmationInfo::new(
			ConfirmationMethod::Bearer,
			NameIdFormat::Persistent,
		));
	let config = HandlerChainConfig::from_json_str(CHAIN)?;
	let chain = HandlerRegistry::with_builtins().build(&config, &env)?;
	let session = SessionId::new("browser-42")?;

	sessions.create_session(&session);

	let signed_in = chain.process(
		Message::new(MessageKind::AuthnRequest)
			.with_issuer("https://sp.example.com/saml")
			.with_destination("https://sp.example.com/acs")
			.with_session(session.clone())
			.with_subject("alice"),
	)?;
	let Some(token) = signed_in.message.token else {
		color_eyre::eyre::bail!("sign-in produced no assertion");
	};

	println!("issued {} for {} ({})", token.id(), token.subject(), sts.validate(&token));

	let renewed = sessions.renew(&session, token.id(), &issuer)?;

	println!("renewed into {}; original is now {}", renewed.id(), sts.validate(&token));

	chain.process(
		Message::new(MessageKind::LogoutRequest)
			.with_issuer("https://sp.example.com/saml")
			.with_session(session),
	)?;

	println!("after logout {} is {}", renewed.id(), sts.validate(&renewed));
	println!("active sessions: {}", sessions.active_session_count());

	for event in audit.take() {
		println!("{}", serde_json::to_string(&event)?);
	}

	Ok(())
}
