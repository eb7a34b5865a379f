// self
use crate::{
	_prelude::*,
	chain::{Fault, Handler, HandlerEnv, HandlerOutcome, HandlerSpec, Message},
	error::{ConfigError, FaultCode},
};

/// Rejects messages whose issuer host is outside the trusted domains.
///
/// Option `domains` (required) is a comma-separated list. A host is trusted when it equals a
/// listed domain or is a subdomain of one; comparison ignores ASCII case.
#[derive(Clone, Debug)]
pub struct IssuerTrustHandler {
	domains: Vec<String>,
}
impl IssuerTrustHandler {
	/// Creates a handler trusting the provided domains.
	pub fn new<I, S>(domains: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let domains = domains
			.into_iter()
			.map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
			.filter(|d| !d.is_empty())
			.collect();

		Self { domains }
	}

	/// Factory used by the handler registry.
	pub fn from_spec(spec: &HandlerSpec, _: &HandlerEnv) -> Result<Arc<dyn Handler>, ConfigError> {
		let handler = Self::new(spec.require("domains")?.split(','));

		if handler.domains.is_empty() {
			return Err(ConfigError::MissingOption { handler: spec.name.clone(), option: "domains" });
		}

		Ok(Arc::new(handler))
	}

	/// Returns true if `issuer` resolves to a trusted host.
	pub fn is_trusted(&self, issuer: &str) -> bool {
		let host = issuer_host(issuer);

		!host.is_empty()
			&& self.domains.iter().any(|domain| {
				host == *domain
					|| host.strip_suffix(domain.as_str()).is_some_and(|rest| rest.ends_with('.'))
			})
	}
}
impl Handler for IssuerTrustHandler {
	fn handle(&self, message: &mut Message) -> Result<HandlerOutcome, Fault> {
		let Some(issuer) = message.issuer.as_deref() else {
			return Err(Fault::new(FaultCode::MalformedMessage, "message carries no issuer"));
		};

		if !self.is_trusted(issuer) {
			return Err(Fault::new(
				FaultCode::IssuerNotTrusted,
				format!("issuer `{issuer}` is outside the trusted domains"),
			));
		}

		Ok(HandlerOutcome::Continue)
	}
}

// URL host when the issuer parses as a URL with a host, else everything before the first `/`.
fn issuer_host(issuer: &str) -> String {
	let issuer = issuer.trim();
	let host = match Url::parse(issuer) {
		Ok(url) => url.host_str().map(str::to_owned),
		Err(_) => None,
	};

	host.unwrap_or_else(|| issuer.split('/').next().unwrap_or_default().to_owned())
		.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::HandlerName, chain::MessageKind};

	#[test]
	fn hosts_match_exactly_or_as_subdomains() {
		let handler = IssuerTrustHandler::new(["example.com", " partner.org "]);

		assert!(handler.is_trusted("https://sp.example.com/saml"));
		assert!(handler.is_trusted("https://EXAMPLE.com"));
		assert!(handler.is_trusted("partner.org/a/tenant"));
		assert!(!handler.is_trusted("https://evil-example.com/"));
		assert!(!handler.is_trusted("https://example.com.evil.net/"));
		assert!(!handler.is_trusted(""));
	}

	#[test]
	fn untrusted_issuer_faults() {
		let handler = IssuerTrustHandler::new(["example.com"]);
		let mut message =
			Message::new(MessageKind::AuthnRequest).with_issuer("https://evil.example.org/");
		let fault = handler.handle(&mut message).expect_err("Untrusted issuer must fault.");

		assert_eq!(fault.code, FaultCode::IssuerNotTrusted);

		let mut anonymous = Message::new(MessageKind::AuthnRequest);

		assert_eq!(
			handler.handle(&mut anonymous).map_err(|f| f.code),
			Err(FaultCode::MalformedMessage)
		);
	}

	#[test]
	fn factory_requires_domains() {
		let spec = HandlerSpec::new(
			HandlerName::new("trust").expect("Handler name fixture should be valid."),
			"issuer-trust",
		);

		assert!(matches!(
			IssuerTrustHandler::from_spec(&spec, &HandlerEnv::default()),
			Err(ConfigError::MissingOption { option: "domains", .. })
		));

		let blank = spec.clone().option("domains", " , ");

		assert!(matches!(
			IssuerTrustHandler::from_spec(&blank, &HandlerEnv::default()),
			Err(ConfigError::MissingOption { .. })
		));
	}
}
