// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User profile types.
//!
//! This module provides:
//! - [`UserProfile`] - the current, normalized profile shape
//! - [`StoredProfile`] - the raw persisted shape, which may still carry
//!   legacy role strings and a missing admin flag
//!
//! A profile is created on a user's first authentication and is never
//! hard-deleted by this layer. The stored shape grew optional fields over
//! time, so reads go through the explicit schema upgrade in
//! [`crate::migrate`] before the profile is used anywhere else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrgId, Role, UserId, WorkspaceId};

/// A user's profile in its current, normalized shape.
///
/// # PII Handling
///
/// `email` is user PII and should be redacted in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Identity-provider-issued user ID.
	pub id: UserId,

	/// Primary email address, as reported by the identity provider.
	pub email: String,

	/// Organization role. Always `member` in the current model.
	pub role: Role,

	/// Whether this user has elevated access within their organization.
	pub is_admin: bool,

	/// The organization this user belongs to, if any.
	pub organization_id: Option<OrgId>,

	/// Workspaces this user has been granted, in grant order.
	pub workspace_ids: Vec<WorkspaceId>,

	/// When the profile was created.
	pub created_at: DateTime<Utc>,

	/// When the profile was last updated.
	pub updated_at: DateTime<Utc>,
}

impl UserProfile {
	/// Creates the default profile for a first login.
	///
	/// The user starts as a plain member with no organization; they must
	/// create or join one explicitly.
	pub fn bootstrap(id: UserId, email: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id,
			email: email.into(),
			role: Role::Member,
			is_admin: false,
			organization_id: None,
			workspace_ids: Vec::new(),
			created_at: now,
			updated_at: now,
		}
	}

	/// Returns true if this user belongs to the given organization.
	pub fn is_member_of(&self, org_id: OrgId) -> bool {
		self.organization_id == Some(org_id)
	}

	/// Returns true if this user is an admin of the given organization.
	pub fn is_admin_of(&self, org_id: OrgId) -> bool {
		self.is_admin && self.is_member_of(org_id)
	}
}

/// A profile exactly as persisted, before schema upgrade.
///
/// `role` is the raw stored string (possibly a legacy value) and `is_admin`
/// may be absent on rows written before the flag existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
	pub id: UserId,
	pub email: String,
	pub role: String,
	pub is_admin: Option<bool>,
	pub organization_id: Option<OrgId>,
	pub workspace_ids: Vec<WorkspaceId>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl StoredProfile {
	/// The stored form of a current-shape profile. Used when writing.
	pub fn from_profile(profile: &UserProfile) -> Self {
		Self {
			id: profile.id.clone(),
			email: profile.email.clone(),
			role: profile.role.to_string(),
			is_admin: Some(profile.is_admin),
			organization_id: profile.organization_id,
			workspace_ids: profile.workspace_ids.clone(),
			created_at: profile.created_at,
			updated_at: profile.updated_at,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn make_profile() -> UserProfile {
		UserProfile::bootstrap(UserId::new("uid-1"), "test@example.com")
	}

	#[test]
	fn bootstrap_defaults() {
		let profile = make_profile();
		assert_eq!(profile.role, Role::Member);
		assert!(!profile.is_admin);
		assert!(profile.organization_id.is_none());
		assert!(profile.workspace_ids.is_empty());
	}

	#[test]
	fn bootstrap_sets_timestamps() {
		let before = Utc::now();
		let profile = make_profile();
		let after = Utc::now();

		assert!(profile.created_at >= before && profile.created_at <= after);
		assert_eq!(profile.created_at, profile.updated_at);
	}

	#[test]
	fn is_member_of_checks_org() {
		let mut profile = make_profile();
		let org_id = OrgId::generate();
		assert!(!profile.is_member_of(org_id));

		profile.organization_id = Some(org_id);
		assert!(profile.is_member_of(org_id));
		assert!(!profile.is_member_of(OrgId::generate()));
	}

	#[test]
	fn is_admin_of_requires_membership_and_flag() {
		let mut profile = make_profile();
		let org_id = OrgId::generate();

		profile.is_admin = true;
		assert!(!profile.is_admin_of(org_id));

		profile.organization_id = Some(org_id);
		assert!(profile.is_admin_of(org_id));

		profile.is_admin = false;
		assert!(!profile.is_admin_of(org_id));
	}

	#[test]
	fn stored_form_of_current_profile_is_normalized() {
		let profile = make_profile();
		let stored = StoredProfile::from_profile(&profile);

		assert_eq!(stored.role, "member");
		assert_eq!(stored.is_admin, Some(false));
		assert_eq!(stored.id, profile.id);
	}

	#[test]
	fn serializes_correctly() {
		let profile = make_profile();
		let json = serde_json::to_string(&profile).unwrap();
		assert!(json.contains("\"role\":\"member\""));
		assert!(json.contains("\"is_admin\":false"));
	}
}
