// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity provider abstraction.
//!
//! The session layer never talks to the identity provider directly; it
//! observes sign-in state through [`IdentityProvider`] so tests and
//! alternative providers can be injected.

use lode_server_auth::types::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The authenticated identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Provider-issued user ID.
	pub user_id: UserId,
	/// Primary email address.
	pub email: String,
}

impl Identity {
	pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
		Self {
			user_id,
			email: email.into(),
		}
	}
}

/// Source of sign-in state changes.
///
/// `None` means signed out. Implementations must publish the current value
/// to new subscribers immediately.
pub trait IdentityProvider: Send + Sync {
	/// Subscribe to sign-in state changes.
	fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

	/// The current sign-in state.
	fn current(&self) -> Option<Identity>;
}

/// An identity provider driven through a watch channel.
///
/// Production wires provider callbacks into [`Self::sign_in`] and
/// [`Self::sign_out`]; tests drive it directly.
pub struct ChannelIdentityProvider {
	tx: watch::Sender<Option<Identity>>,
}

impl ChannelIdentityProvider {
	/// Create a provider in the signed-out state.
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(None);
		Self { tx }
	}

	/// Publish a sign-in.
	pub fn sign_in(&self, identity: Identity) {
		tracing::debug!(user_id = %identity.user_id, "identity signed in");
		self.tx.send_replace(Some(identity));
	}

	/// Publish a sign-out.
	pub fn sign_out(&self) {
		tracing::debug!("identity signed out");
		self.tx.send_replace(None);
	}
}

impl Default for ChannelIdentityProvider {
	fn default() -> Self {
		Self::new()
	}
}

impl IdentityProvider for ChannelIdentityProvider {
	fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
		self.tx.subscribe()
	}

	fn current(&self) -> Option<Identity> {
		self.tx.borrow().clone()
	}
}
