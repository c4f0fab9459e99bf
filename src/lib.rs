//! Credential broker that hands out short-lived access tokens from metadata, OAuth2, login, and
//! secret-store backends behind one shared API key, collapsing concurrent refreshes per provider.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod obs;
pub mod provider;
pub mod secret;
pub mod tokenizer;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime, PrimitiveDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
