// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session resolution.
//!
//! Resolution turns a signed-in identity into a full membership picture:
//! profile (bootstrapped on first login, schema-upgraded on every load),
//! organization link (with owner backfill and offline-approval pickup),
//! pending join request, and granted workspaces.
//!
//! Resolution never fails the session outright. A store failure degrades to
//! a minimal in-memory profile with no organization, so the user can still
//! reach screens that need only their identity.

use std::sync::Arc;

use lode_server_auth::{
	migrate::upgrade_profile,
	org::{OrgJoinRequest, Organization, Workspace},
	profile::{StoredProfile, UserProfile},
	types::JoinRequestId,
};
use lode_server_db::{
	error::StoreError, ArtifactRepository, ArtifactStore, JoinRequestRepository, JoinRequestStore,
	OrgRepository, OrgStore, ProfileStore, UserRepository, WorkspaceRepository, WorkspaceStore,
};
use sqlx::sqlite::SqlitePool;

use crate::identity::Identity;

/// The store handles resolution works against.
///
/// Trait objects so tests can swap in fakes per store.
#[derive(Clone)]
pub struct SessionStores {
	pub profiles: Arc<dyn ProfileStore>,
	pub orgs: Arc<dyn OrgStore>,
	pub workspaces: Arc<dyn WorkspaceStore>,
	pub join_requests: Arc<dyn JoinRequestStore>,
	pub artifacts: Arc<dyn ArtifactStore>,
}

impl SessionStores {
	/// Build the full repository set over one pool.
	pub fn from_pool(pool: SqlitePool) -> Self {
		Self {
			profiles: Arc::new(UserRepository::new(pool.clone())),
			orgs: Arc::new(OrgRepository::new(pool.clone())),
			workspaces: Arc::new(WorkspaceRepository::new(pool.clone())),
			join_requests: Arc::new(JoinRequestRepository::new(pool.clone())),
			artifacts: Arc::new(ArtifactRepository::new(pool)),
		}
	}
}

/// Where the user stands with respect to organizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipStatus {
	/// Linked to an organization.
	WithOrganization,
	/// No organization yet, but a join request awaits a decision.
	PendingRequest(JoinRequestId),
	/// No organization and no outstanding request.
	NoOrganization,
}

/// A fully resolved session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
	pub profile: UserProfile,
	pub organization: Option<Organization>,
	/// Workspaces granted to this user, in the organization's creation order.
	pub workspaces: Vec<Workspace>,
	pub membership: MembershipStatus,
}

/// Session lifecycle as published by the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
	/// No identity signed in.
	Unauthenticated,
	/// An identity is signed in; resolution is running.
	Resolving(Identity),
	/// Resolution finished.
	Resolved(Box<ResolvedSession>),
}

/// Resolve an identity into a session, degrading on store failure.
#[tracing::instrument(skip(stores, identity), fields(user_id = %identity.user_id))]
pub async fn resolve_session(stores: &SessionStores, identity: &Identity) -> ResolvedSession {
	match try_resolve(stores, identity).await {
		Ok(session) => session,
		Err(e) => {
			tracing::error!(user_id = %identity.user_id, error = %e, "session resolution failed, degrading to minimal profile");
			ResolvedSession {
				profile: UserProfile::bootstrap(identity.user_id.clone(), identity.email.clone()),
				organization: None,
				workspaces: Vec::new(),
				membership: MembershipStatus::NoOrganization,
			}
		}
	}
}

async fn try_resolve(
	stores: &SessionStores,
	identity: &Identity,
) -> Result<ResolvedSession, StoreError> {
	let mut profile = load_or_bootstrap_profile(stores, identity).await?;

	if profile.organization_id.is_none() {
		if let Some(status) = link_unattached_user(stores, &mut profile).await? {
			return finish(stores, profile, status).await;
		}
	}

	finish(stores, profile, MembershipStatus::WithOrganization).await
}

/// Load the stored profile, creating a bootstrap profile on first login.
/// The schema upgrade runs on every load; a changed profile is persisted
/// best-effort.
async fn load_or_bootstrap_profile(
	stores: &SessionStores,
	identity: &Identity,
) -> Result<UserProfile, StoreError> {
	let stored = match stores.profiles.get_profile(&identity.user_id).await? {
		Some(stored) => stored,
		None => {
			let profile = UserProfile::bootstrap(identity.user_id.clone(), identity.email.clone());
			let stored = StoredProfile::from_profile(&profile);
			stores.profiles.create_profile(&stored).await?;
			tracing::info!(user_id = %identity.user_id, "profile bootstrapped on first login");
			stored
		}
	};

	let (profile, changed) = upgrade_profile(&stored);
	if changed {
		if let Err(e) = stores
			.profiles
			.update_role_fields(&profile.id, &profile.role.to_string(), profile.is_admin)
			.await
		{
			tracing::warn!(user_id = %profile.id, error = %e, "failed to persist profile upgrade, will retry next load");
		} else {
			tracing::info!(user_id = %profile.id, "legacy profile upgraded");
		}
	}

	Ok(profile)
}

/// Try to attach a user who has no organization link.
///
/// In order: pick up an approval that happened while they were away, report
/// a still-pending request, or backfill the link for an organization they
/// own. Returns `None` when the link was established and resolution should
/// continue as a member.
async fn link_unattached_user(
	stores: &SessionStores,
	profile: &mut UserProfile,
) -> Result<Option<MembershipStatus>, StoreError> {
	if let Some(approved) = stores.join_requests.find_approved_for_user(&profile.id).await? {
		return match attach_from_request(stores, profile, &approved).await {
			Ok(()) => Ok(None),
			Err(e) => {
				tracing::warn!(user_id = %profile.id, error = %e, "failed to apply approved join request");
				Ok(Some(MembershipStatus::NoOrganization))
			}
		};
	}

	if let Some(pending) = stores.join_requests.find_pending_for_user(&profile.id).await? {
		return Ok(Some(MembershipStatus::PendingRequest(pending.id)));
	}

	if let Some(org) = stores.orgs.get_org_by_owner(&profile.id).await? {
		let workspace_ids: Vec<_> = stores
			.workspaces
			.list_for_org(&org.id)
			.await?
			.iter()
			.map(|w| w.id)
			.collect();
		stores
			.profiles
			.attach_organization(&profile.id, &org.id, true, &workspace_ids)
			.await?;
		profile.organization_id = Some(org.id);
		profile.is_admin = true;
		profile.workspace_ids = workspace_ids;
		tracing::info!(user_id = %profile.id, org_id = %org.id, "backfilled organization link for owner");
		return Ok(None);
	}

	Ok(Some(MembershipStatus::NoOrganization))
}

async fn attach_from_request(
	stores: &SessionStores,
	profile: &mut UserProfile,
	request: &OrgJoinRequest,
) -> Result<(), StoreError> {
	let workspaces = stores.workspaces.list_for_org(&request.organization_id).await?;
	let granted: Vec<_> = workspaces.first().map(|w| w.id).into_iter().collect();

	stores
		.profiles
		.attach_organization(&profile.id, &request.organization_id, false, &granted)
		.await?;
	profile.organization_id = Some(request.organization_id);
	profile.workspace_ids = granted;
	tracing::info!(user_id = %profile.id, org_id = %request.organization_id, "picked up approved join request");
	Ok(())
}

/// Fetch the organization and granted workspaces for the final picture.
async fn finish(
	stores: &SessionStores,
	profile: UserProfile,
	membership: MembershipStatus,
) -> Result<ResolvedSession, StoreError> {
	let Some(org_id) = profile.organization_id else {
		return Ok(ResolvedSession {
			profile,
			organization: None,
			workspaces: Vec::new(),
			membership: if membership == MembershipStatus::WithOrganization {
				MembershipStatus::NoOrganization
			} else {
				membership
			},
		});
	};

	let Some(organization) = stores.orgs.get_org_by_id(&org_id).await? else {
		// Dangling link; treat as unattached rather than failing the session.
		tracing::warn!(user_id = %profile.id, org_id = %org_id, "profile references missing organization");
		return Ok(ResolvedSession {
			profile,
			organization: None,
			workspaces: Vec::new(),
			membership: MembershipStatus::NoOrganization,
		});
	};

	let workspaces = stores
		.workspaces
		.list_for_org(&org_id)
		.await?
		.into_iter()
		.filter(|w| profile.workspace_ids.contains(&w.id))
		.collect();

	Ok(ResolvedSession {
		profile,
		organization: Some(organization),
		workspaces,
		membership: MembershipStatus::WithOrganization,
	})
}
