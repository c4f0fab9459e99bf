//! Reads provider descriptors from a directory, one JSON document per file.

// std
use std::{fs, io, path::Path};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	provider::{ProviderRegistry, RegistryOptions, SourcedDescriptor},
};

/// Parses every regular file in `dir` as a descriptor.
///
/// Subdirectories and entries that cannot be read are skipped; symlinks are followed. Any file
/// that is not a valid descriptor aborts the load.
pub fn read_dir(dir: &Path) -> Result<Vec<SourcedDescriptor>, ConfigError> {
	let read_dir_error =
		|source: io::Error| ConfigError::ReadDirectory { dir: dir.to_path_buf(), source };
	let mut entries = fs::read_dir(dir)
		.map_err(read_dir_error)?
		.collect::<Result<Vec<_>, _>>()
		.map_err(read_dir_error)?;

	if entries.is_empty() {
		return Err(ConfigError::NoProvidersInDirectory { dir: dir.to_path_buf() });
	}

	// Directory order is unspecified; sort so duplicate reports are stable.
	entries.sort_by_key(|entry| entry.file_name());

	let mut descriptors = Vec::with_capacity(entries.len());

	for entry in entries {
		let path = entry.path();

		// `fs::metadata` follows symlinks.
		match fs::metadata(&path) {
			Ok(metadata) if metadata.is_file() => {},
			_ => continue,
		}

		let Ok(bytes) = fs::read(&path) else {
			#[cfg(feature = "tracing")]
			tracing::warn!(path = %path.display(), "skipping unreadable provider config");

			continue;
		};

		descriptors.push(SourcedDescriptor::from_json(path.display().to_string(), &bytes)?);
	}

	if descriptors.is_empty() {
		return Err(ConfigError::NoUsableProviders);
	}

	Ok(descriptors)
}

/// Reads `dir` and builds the registry from its descriptors.
pub fn load_dir(dir: &Path, options: &RegistryOptions) -> Result<ProviderRegistry, ConfigError> {
	ProviderRegistry::build(read_dir(dir)?, options)
}
