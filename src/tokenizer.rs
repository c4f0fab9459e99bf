//! The capability every backend implements and the dispatcher depends on.

// self
use crate::{_prelude::*, context::TokenContext};

/// Boxed future returned by [`Tokenizer::token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + 'a + Send>>;

/// Issues access tokens for one configured provider.
///
/// Implementations must tolerate concurrent calls against the same instance and must bound
/// every upstream call by the supplied [`TokenContext`]. On success the returned token is
/// never empty; failures are reported as [`Error`] values and never panic.
pub trait Tokenizer
where
	Self: Send + Sync,
{
	/// Returns an access token, reusing a cached one while it is fresh.
	fn token<'a>(&'a self, ctx: &'a TokenContext) -> TokenFuture<'a>;

	/// Backend type of this instance.
	fn kind(&self) -> ProviderKind;

	/// Whether the instance also serves requested names of the form `<registered>-<suffix>`.
	///
	/// The registry consults this during lookup; the suffix is interpreted by the backend
	/// through [`TokenContext::provider`].
	fn accepts_qualified_names(&self) -> bool {
		false
	}
}

/// Backend types a provider descriptor can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
	/// Co-located cloud metadata service.
	Google,
	/// OAuth2 client-credentials endpoint.
	Microsoft,
	/// Proprietary username/password login API.
	Rancher,
	/// Secret store holding per-cluster kubeconfig tokens.
	VaultK8s,
}
impl ProviderKind {
	/// Every supported kind, in descriptor documentation order.
	pub const ALL: [Self; 4] = [Self::Google, Self::Microsoft, Self::Rancher, Self::VaultK8s];

	/// Returns the canonical descriptor `type` string.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Google => "google",
			Self::Microsoft => "microsoft",
			Self::Rancher => "rancher",
			Self::VaultK8s => "vault-k8s",
		}
	}

	/// Returns the protocol-level alias accepted for the descriptor `type` field.
	pub const fn alias(self) -> &'static str {
		match self {
			Self::Google => "metadata-service",
			Self::Microsoft => "oauth2-client-credentials",
			Self::Rancher => "proprietary-login",
			Self::VaultK8s => "secret-store",
		}
	}

	/// Resolves a descriptor `type` string (canonical name or alias).
	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.as_str() == raw || kind.alias() == raw)
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
