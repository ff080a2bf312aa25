// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reactive session context.
//!
//! [`SessionContext`] owns a background task that follows the identity
//! provider's sign-in state and republishes [`SessionState`] through a watch
//! channel. Consumers subscribe rather than poll, and every state they
//! observe has already been fully resolved.

use std::sync::Arc;
use std::time::Duration;

use lode_server_auth::{artifact::Artifact, types::UserId, PermissionSet};
use lode_server_config::SessionConfig;
use lode_server_db::error::StoreError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::identity::IdentityProvider;
use crate::resolve::{resolve_session, SessionState, SessionStores};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("Store query timed out after {0}s")]
	Timeout(u64),

	#[error("Not signed in")]
	NotSignedIn,
}

/// Reactive session state, driven by the identity provider.
pub struct SessionContext {
	provider: Arc<dyn IdentityProvider>,
	stores: SessionStores,
	config: SessionConfig,
	state_tx: watch::Sender<SessionState>,
	task: JoinHandle<()>,
}

impl SessionContext {
	/// Spawn the context and its resolution task.
	///
	/// The task re-resolves on every sign-in change until the provider is
	/// dropped or [`Self::shutdown`] is called.
	pub fn spawn(
		provider: Arc<dyn IdentityProvider>,
		stores: SessionStores,
		config: SessionConfig,
	) -> Self {
		let (state_tx, _) = watch::channel(SessionState::Unauthenticated);

		let task = {
			let provider = provider.clone();
			let stores = stores.clone();
			let state_tx = state_tx.clone();
			tokio::spawn(async move {
				let mut identity_rx = provider.subscribe();
				loop {
					let identity = identity_rx.borrow_and_update().clone();
					match identity {
						Some(identity) => {
							state_tx.send_replace(SessionState::Resolving(identity.clone()));
							let session = resolve_session(&stores, &identity).await;
							state_tx.send_replace(SessionState::Resolved(Box::new(session)));
						}
						None => {
							state_tx.send_replace(SessionState::Unauthenticated);
						}
					}
					if identity_rx.changed().await.is_err() {
						tracing::debug!("identity provider dropped, session task exiting");
						break;
					}
				}
			})
		};

		Self {
			provider,
			stores,
			config,
			state_tx,
			task,
		}
	}

	/// Subscribe to session state changes.
	pub fn subscribe(&self) -> watch::Receiver<SessionState> {
		self.state_tx.subscribe()
	}

	/// The current session state.
	pub fn state(&self) -> SessionState {
		self.state_tx.borrow().clone()
	}

	/// Permissions for the current state. Anonymous unless resolved.
	pub fn permissions(&self) -> PermissionSet {
		match &*self.state_tx.borrow() {
			SessionState::Resolved(session) => {
				PermissionSet::for_profile(&session.profile, session.organization.as_ref())
			}
			_ => PermissionSet::anonymous(),
		}
	}

	/// Re-run resolution for the currently signed-in identity.
	///
	/// Used after out-of-band changes (a join request approved elsewhere,
	/// an organization created in another window).
	pub async fn refresh(&self) {
		let Some(identity) = self.provider.current() else {
			self.state_tx.send_replace(SessionState::Unauthenticated);
			return;
		};
		self.state_tx
			.send_replace(SessionState::Resolving(identity.clone()));
		let session = resolve_session(&self.stores, &identity).await;
		self.state_tx
			.send_replace(SessionState::Resolved(Box::new(session)));
	}

	/// List research sessions for `target` as the signed-in user, bounded by
	/// the configured timeout so a wedged store cannot hang the UI.
	pub async fn list_sessions(&self, target: &UserId) -> Result<Vec<Artifact>, SessionError> {
		let (caller, is_admin) = match &*self.state_tx.borrow() {
			SessionState::Resolved(session) => {
				(session.profile.id.clone(), session.profile.is_admin)
			}
			_ => return Err(SessionError::NotSignedIn),
		};

		let secs = self.config.list_timeout_secs;
		let query = self
			.stores
			.artifacts
			.list_sessions_for_user(target, &caller, is_admin);
		match tokio::time::timeout(Duration::from_secs(secs), query).await {
			Ok(result) => Ok(result?),
			Err(_) => {
				tracing::warn!(target = %target, timeout_secs = secs, "session listing timed out");
				Err(SessionError::Timeout(secs))
			}
		}
	}

	/// Stop the background task. The last published state remains readable.
	pub fn shutdown(&self) {
		self.task.abort();
	}
}

impl Drop for SessionContext {
	fn drop(&mut self) {
		self.task.abort();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::identity::{ChannelIdentityProvider, Identity};
	use crate::resolve::MembershipStatus;
	use lode_server_auth::artifact::{Artifact, ArtifactKind};
	use lode_server_db::testing::create_full_test_pool;

	async fn wait_for_resolved(rx: &mut watch::Receiver<SessionState>) -> SessionState {
		loop {
			let state = rx.borrow_and_update().clone();
			if matches!(state, SessionState::Resolved(_)) {
				return state;
			}
			rx.changed().await.unwrap();
		}
	}

	fn test_context(
		stores: SessionStores,
	) -> (Arc<ChannelIdentityProvider>, SessionContext) {
		let provider = Arc::new(ChannelIdentityProvider::new());
		let context = SessionContext::spawn(
			provider.clone(),
			stores,
			SessionConfig::default(),
		);
		(provider, context)
	}

	#[tokio::test]
	async fn starts_unauthenticated() {
		let pool = create_full_test_pool().await;
		let (_provider, context) = test_context(SessionStores::from_pool(pool));

		assert_eq!(context.state(), SessionState::Unauthenticated);
		assert!(!context.permissions().can_upload_sessions());
	}

	#[tokio::test]
	async fn sign_in_resolves_session() {
		let pool = create_full_test_pool().await;
		let (provider, context) = test_context(SessionStores::from_pool(pool));
		let mut rx = context.subscribe();

		provider.sign_in(Identity::new(UserId::new("uid-1"), "a@example.com"));

		let state = wait_for_resolved(&mut rx).await;
		let SessionState::Resolved(session) = state else {
			panic!("expected resolved state");
		};
		assert_eq!(session.profile.id, UserId::new("uid-1"));
		assert_eq!(session.membership, MembershipStatus::NoOrganization);
		assert!(context.permissions().can_upload_sessions());
	}

	#[tokio::test]
	async fn sign_out_returns_to_unauthenticated() {
		let pool = create_full_test_pool().await;
		let (provider, context) = test_context(SessionStores::from_pool(pool));
		let mut rx = context.subscribe();

		provider.sign_in(Identity::new(UserId::new("uid-1"), "a@example.com"));
		wait_for_resolved(&mut rx).await;

		provider.sign_out();
		loop {
			rx.changed().await.unwrap();
			if *rx.borrow() == SessionState::Unauthenticated {
				break;
			}
		}
		assert!(!context.permissions().can_upload_sessions());
	}

	#[tokio::test]
	async fn list_sessions_requires_sign_in() {
		let pool = create_full_test_pool().await;
		let (_provider, context) = test_context(SessionStores::from_pool(pool));

		let result = context.list_sessions(&UserId::new("uid-1")).await;
		assert!(matches!(result, Err(SessionError::NotSignedIn)));
	}

	#[tokio::test]
	async fn list_sessions_returns_own_artifacts() {
		let pool = create_full_test_pool().await;
		let stores = SessionStores::from_pool(pool);
		let (provider, context) = test_context(stores.clone());
		let mut rx = context.subscribe();

		provider.sign_in(Identity::new(UserId::new("uid-1"), "a@example.com"));
		wait_for_resolved(&mut rx).await;

		let artifact = Artifact::new(
			ArtifactKind::Session,
			"Interview 1",
			UserId::new("uid-1"),
		);
		stores.artifacts.create_artifact(&artifact, None).await.unwrap();

		let sessions = context.list_sessions(&UserId::new("uid-1")).await.unwrap();
		assert_eq!(sessions.len(), 1);
		assert_eq!(sessions[0].title, "Interview 1");
	}

	#[tokio::test]
	async fn list_sessions_denies_other_users() {
		let pool = create_full_test_pool().await;
		let (provider, context) = test_context(SessionStores::from_pool(pool));
		let mut rx = context.subscribe();

		provider.sign_in(Identity::new(UserId::new("uid-1"), "a@example.com"));
		wait_for_resolved(&mut rx).await;

		let result = context.list_sessions(&UserId::new("uid-other")).await;
		assert!(matches!(
			result,
			Err(SessionError::Store(StoreError::PermissionDenied(_)))
		));
	}

	#[tokio::test]
	async fn refresh_picks_up_new_state() {
		let pool = create_full_test_pool().await;
		let stores = SessionStores::from_pool(pool.clone());
		let (provider, context) = test_context(stores.clone());
		let mut rx = context.subscribe();

		let owner = Identity::new(UserId::new("uid-owner"), "o@example.com");
		provider.sign_in(owner.clone());
		wait_for_resolved(&mut rx).await;

		// organization created out-of-band after the initial resolution
		let checker = lode_server_db::StoreSubdomainChecker::new(pool);
		stores
			.orgs
			.create_organization(
				lode_server_db::org::CreateOrganizationParams {
					name: "Acme".to_string(),
					subdomain: None,
				},
				&owner.user_id,
				&checker,
			)
			.await
			.unwrap();

		context.refresh().await;
		let SessionState::Resolved(session) = context.state() else {
			panic!("expected resolved state");
		};
		assert_eq!(session.membership, MembershipStatus::WithOrganization);
		assert!(session.organization.is_some());
	}
}
