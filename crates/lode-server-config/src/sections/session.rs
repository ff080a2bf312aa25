// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session resolution configuration.

use serde::Deserialize;

/// Session resolution configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Ceiling on session list queries, in seconds.
	pub list_timeout_secs: u64,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			list_timeout_secs: 10,
		}
	}
}

/// Session configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfigLayer {
	#[serde(default)]
	pub list_timeout_secs: Option<u64>,
}

impl SessionConfigLayer {
	pub fn merge(&mut self, other: SessionConfigLayer) {
		if other.list_timeout_secs.is_some() {
			self.list_timeout_secs = other.list_timeout_secs;
		}
	}

	pub fn finalize(self) -> SessionConfig {
		SessionConfig {
			list_timeout_secs: self.list_timeout_secs.unwrap_or(10),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_timeout() {
		let config = SessionConfigLayer::default().finalize();
		assert_eq!(config.list_timeout_secs, 10);
	}

	#[test]
	fn test_custom_timeout() {
		let layer = SessionConfigLayer {
			list_timeout_secs: Some(30),
		};
		assert_eq!(layer.finalize().list_timeout_secs, 30);
	}
}
