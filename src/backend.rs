//! Concrete [`Tokenizer`](crate::tokenizer::Tokenizer) implementations, one per provider kind.

pub mod google;
pub mod microsoft;
pub mod rancher;
pub mod vault;

pub use google::GoogleTokenizer;
pub use microsoft::{MicrosoftConfig, MicrosoftTokenizer};
pub use rancher::{RancherConfig, RancherTokenizer};
pub use vault::{VaultConfig, VaultTokenizer};
