//! Handler chain declarations.

// self
use crate::{_prelude::*, auth::HandlerName, error::ConfigError};

/// Ordered pipeline declaration for one deployment.
///
/// ```json
/// {
///   "chain_class": "default",
///   "locking": true,
///   "handlers": [
///     { "name": "trust", "kind": "issuer-trust", "options": { "domains": "example.com" } }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerChainConfig {
	/// Executor override; `None` selects the `default` executor.
	#[serde(default)]
	pub chain_class: Option<String>,
	/// Handlers in execution order.
	#[serde(default)]
	pub handlers: Vec<HandlerSpec>,
	/// Freezes the handler list after build.
	#[serde(default)]
	pub locking: bool,
}
impl HandlerChainConfig {
	/// Creates an empty declaration.
	pub fn new(locking: bool) -> Self {
		Self { chain_class: None, handlers: Vec::new(), locking }
	}

	/// Parses a JSON declaration, reporting the path of the first offending value.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut deserializer).map_err(ConfigError::parse)
	}

	/// Selects a named executor.
	pub fn chain_class(mut self, name: impl Into<String>) -> Self {
		self.chain_class = Some(name.into());

		self
	}

	/// Appends a handler declaration.
	pub fn handler(mut self, spec: HandlerSpec) -> Self {
		self.handlers.push(spec);

		self
	}
}

/// One handler entry of a [`HandlerChainConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSpec {
	/// Name, unique within the chain.
	pub name: HandlerName,
	/// Factory key in the handler registry.
	#[serde(alias = "class")]
	pub kind: String,
	/// Handler-specific options.
	#[serde(default)]
	pub options: BTreeMap<String, String>,
}
impl HandlerSpec {
	/// Creates an entry without options.
	pub fn new(name: HandlerName, kind: impl Into<String>) -> Self {
		Self { name, kind: kind.into(), options: BTreeMap::new() }
	}

	/// Adds an option.
	pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.options.insert(key.into(), value.into());

		self
	}

	/// Returns a non-blank option value.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.options.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
	}

	/// Returns a non-blank option value or fails with [`ConfigError::MissingOption`].
	pub fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
		self.get(key)
			.ok_or_else(|| ConfigError::MissingOption { handler: self.name.clone(), option: key })
	}

	/// Parses a boolean option; absent options yield `default`.
	pub fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
		match self.get(key) {
			None => Ok(default),
			Some(value) => value.parse().map_err(|_| ConfigError::InvalidOption {
				handler: self.name.clone(),
				option: key,
				value: value.to_owned(),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_declaration_parses_in_order() {
		let config = HandlerChainConfig::from_json_str(
			r#"{
				"locking": true,
				"handlers": [
					{ "name": "trust", "kind": "issuer-trust", "options": { "domains": "example.com" } },
					{ "name": "issue", "class": "assertion-issuer" }
				]
			}"#,
		)
		.expect("Chain declaration should parse.");

		assert!(config.locking);
		assert_eq!(config.chain_class, None);
		assert_eq!(config.handlers.len(), 2);
		assert_eq!(config.handlers[0].require("domains").ok(), Some("example.com"));
		assert_eq!(config.handlers[1].kind, "assertion-issuer");
		assert!(config.handlers[1].options.is_empty());
	}

	#[test]
	fn parse_errors_name_the_path() {
		let err = HandlerChainConfig::from_json_str(
			r#"{ "handlers": [ { "name": "ok", "kind": "x" }, { "name": "bad name", "kind": "x" } ] }"#,
		)
		.expect_err("Whitespace in handler names must be rejected.");

		match err {
			ConfigError::Parse { path, .. } => assert_eq!(path, "handlers[1].name"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn flags_reject_garbage() {
		let spec = HandlerSpec::new(
			HandlerName::new("validator").expect("Handler name fixture should be valid."),
			"assertion-validator",
		)
		.option("required", "maybe");

		assert!(matches!(spec.flag("required", false), Err(ConfigError::InvalidOption { .. })));
		assert_eq!(spec.flag("absent", true).ok(), Some(true));
	}
}
