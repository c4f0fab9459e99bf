//! Declarative provider descriptors consumed by the registry.

// self
use crate::{_prelude::*, error::ConfigError, secret::Secret};

/// One provider's type and configuration, as written in a JSON descriptor file.
///
/// Only `type` and `name` are shared; every other field belongs to one or more backends and
/// is validated by that backend's constructor.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
	/// Backend selector (`google`, `microsoft`, `rancher`, `vault-k8s`, or an alias).
	#[serde(rename = "type", default)]
	pub kind: String,
	/// Unique (case-insensitive) provider name.
	#[serde(default)]
	pub name: String,

	/// Login user for `rancher`.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub username: String,
	/// Login password for `rancher`; bearer token for `vault-k8s`.
	#[serde(default, skip_serializing_if = "Secret::is_blank")]
	pub password: Secret,
	/// PEM trust anchor appended to the system roots for `rancher`.
	#[serde(rename = "rootCA", default, skip_serializing_if = "String::is_empty")]
	pub root_ca: String,
	/// Login URL for `rancher`; store address for `vault-k8s`.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub url: String,
	/// Lifetime override in seconds for `rancher` and `vault-k8s`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub short_expiration: Option<u64>,
	/// Secret path pattern override for `vault-k8s`; `[CLUSTER]` is substituted.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub path_pattern: String,

	/// OAuth2 client identifier for `microsoft`.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub client_id: String,
	/// OAuth2 client secret for `microsoft`.
	#[serde(default, skip_serializing_if = "Secret::is_blank")]
	pub client_secret: Secret,
	/// OAuth2 `resource` parameter for `microsoft`.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub resource: String,
	/// Token endpoint for `microsoft`.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub login_endpoint: String,
}
impl ProviderDescriptor {
	/// Creates a descriptor with only `type` and `name` populated.
	pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
		Self { kind: kind.into(), name: name.into(), ..Default::default() }
	}

	/// Returns `value` trimmed, or a [`ConfigError::MissingField`] naming this provider.
	pub(crate) fn require<'a>(
		&self,
		kind: &'static str,
		field: &'static str,
		value: &'a str,
	) -> Result<&'a str, ConfigError> {
		let trimmed = value.trim();

		if trimmed.is_empty() {
			Err(ConfigError::MissingField { kind, name: self.name.clone(), field })
		} else {
			Ok(trimmed)
		}
	}

	/// Like [`require`](Self::require) for secret fields.
	pub(crate) fn require_secret(
		&self,
		kind: &'static str,
		field: &'static str,
		value: &Secret,
	) -> Result<Secret, ConfigError> {
		if value.is_blank() {
			Err(ConfigError::MissingField { kind, name: self.name.clone(), field })
		} else {
			Ok(value.clone())
		}
	}

	/// Parses a required URL field.
	pub(crate) fn require_url(
		&self,
		kind: &'static str,
		field: &'static str,
		value: &str,
	) -> Result<Url, ConfigError> {
		let raw = self.require(kind, field, value)?;

		Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
			name: self.name.clone(),
			field,
			source,
		})
	}

	/// `shortExpiration` as a lifetime override.
	pub(crate) fn short_expiration(&self) -> Option<Duration> {
		self.short_expiration
			.filter(|secs| *secs > 0)
			.map(|secs| Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
	}
}
impl Debug for ProviderDescriptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderDescriptor")
			.field("kind", &self.kind)
			.field("name", &self.name)
			.field("username", &self.username)
			.field("password", &self.password)
			.field("root_ca_set", &!self.root_ca.is_empty())
			.field("url", &self.url)
			.field("short_expiration", &self.short_expiration)
			.field("path_pattern", &self.path_pattern)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("resource", &self.resource)
			.field("login_endpoint", &self.login_endpoint)
			.finish()
	}
}

/// Descriptor paired with the place it was read from, for error messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcedDescriptor {
	/// Human-readable origin, typically a file path.
	pub source: String,
	/// Parsed descriptor.
	pub descriptor: ProviderDescriptor,
}
impl SourcedDescriptor {
	/// Pairs a descriptor with its origin.
	pub fn new(source: impl Into<String>, descriptor: ProviderDescriptor) -> Self {
		Self { source: source.into(), descriptor }
	}

	/// Parses a JSON descriptor read from `source`.
	pub fn from_json(source: impl Into<String>, json: &[u8]) -> Result<Self, ConfigError> {
		let source = source.into();
		let mut deserializer = serde_json::Deserializer::from_slice(json);
		let descriptor = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|err| ConfigError::ParseDescriptor { source_name: source.clone(), source: err })?;

		Ok(Self { source, descriptor })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_camel_case_fields() {
		let sourced = SourcedDescriptor::from_json(
			"rancher.json",
			br#"{
				"type": "rancher",
				"name": "rancher-np",
				"username": "svc",
				"password": "pw",
				"url": "https://rancher.example.com/v3-public/localProviders/local?action=login",
				"rootCA": "-----BEGIN CERTIFICATE-----",
				"shortExpiration": 300
			}"#,
		)
		.expect("Descriptor should parse.");
		let descriptor = sourced.descriptor;

		assert_eq!(descriptor.kind, "rancher");
		assert_eq!(descriptor.password.expose(), "pw");
		assert_eq!(descriptor.root_ca, "-----BEGIN CERTIFICATE-----");
		assert_eq!(descriptor.short_expiration(), Some(Duration::seconds(300)));
	}

	#[test]
	fn parse_errors_name_the_source() {
		let err = SourcedDescriptor::from_json("cred.json", b"{")
			.expect_err("Truncated JSON should fail.");

		assert!(err.to_string().starts_with("parse provider config cred.json: "));
	}

	#[test]
	fn debug_redacts_credentials() {
		let mut descriptor = ProviderDescriptor::new("microsoft", "ms");

		descriptor.client_secret = Secret::new("shh");

		let rendered = format!("{descriptor:?}");

		assert!(!rendered.contains("shh"));
		assert!(rendered.contains("<redacted>"));
	}

	#[test]
	fn require_names_provider_and_field() {
		let descriptor = ProviderDescriptor::new("microsoft", "ms-test");
		let err = descriptor
			.require("microsoft", "clientId", "  ")
			.expect_err("Blank values should be rejected.");

		assert!(err.to_string().contains("ms-test"));
		assert!(err.to_string().contains("clientId"));
	}
}
