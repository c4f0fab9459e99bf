//! Provider configuration: descriptors (data), the registry (live instances), and the loader.
//!
//! `descriptor` holds the JSON shape one provider file carries. `registry` validates a set of
//! descriptors all-or-nothing, constructs one [`Tokenizer`](crate::tokenizer::Tokenizer) per
//! descriptor, and resolves requested names at request time. `loader` reads descriptors from a
//! directory on disk.

pub mod descriptor;
pub mod loader;
pub mod registry;

pub use descriptor::*;
pub use loader::*;
pub use registry::*;
