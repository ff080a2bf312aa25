// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission predicates.
//!
//! Each predicate is a total, side-effect-free function of primitive inputs
//! (role, admin flag, tier, optional owner/caller pair) returning a boolean.
//! No predicate performs I/O; all attributes are pre-loaded by the caller.
//! An absent role or tier always yields `false`, never a panic.
//!
//! [`PermissionSet`] carries the predicates pre-bound to a resolved
//! profile/organization so call sites never re-derive role or tier manually.

use crate::org::Organization;
use crate::profile::UserProfile;
use crate::types::{Role, Tier, UserId};

/// True if the user may upload interview sessions.
///
/// Any authenticated member.
pub fn can_upload_sessions(role: Option<Role>, _is_admin: bool) -> bool {
	matches!(role, Some(Role::Member))
}

/// True if the user may create nuggets.
///
/// Any authenticated member.
pub fn can_create_nuggets(role: Option<Role>, _is_admin: bool) -> bool {
	matches!(role, Some(Role::Member))
}

/// True if the user may manage team membership.
///
/// Admins only.
pub fn can_manage_team(role: Option<Role>, is_admin: bool) -> bool {
	matches!(role, Some(Role::Member)) && is_admin
}

/// True if the user may manage billing.
///
/// Admins only.
pub fn can_manage_billing(role: Option<Role>, is_admin: bool) -> bool {
	matches!(role, Some(Role::Member)) && is_admin
}

/// True if the caller may edit a nugget.
///
/// Admins may edit any nugget; otherwise only the resource owner may. A
/// resource with no recorded owner is editable by admins alone.
pub fn can_edit_nuggets(
	role: Option<Role>,
	resource_owner: Option<&UserId>,
	caller: &UserId,
	is_admin: bool,
) -> bool {
	if role.is_none() {
		return false;
	}
	is_admin || resource_owner == Some(caller)
}

/// True if the user may configure per-workspace permissions.
///
/// Enterprise tier, admins only.
pub fn can_configure_workspace_permissions(
	tier: Option<Tier>,
	role: Option<Role>,
	is_admin: bool,
) -> bool {
	tier == Some(Tier::Enterprise) && matches!(role, Some(Role::Member)) && is_admin
}

/// True if the organization may use single sign-on.
///
/// Enterprise tier only.
pub fn can_use_sso(tier: Option<Tier>) -> bool {
	tier == Some(Tier::Enterprise)
}

/// True if the user may run bulk operations.
///
/// Enterprise tier, admins only.
pub fn can_bulk_operations(tier: Option<Tier>, role: Option<Role>, is_admin: bool) -> bool {
	tier == Some(Tier::Enterprise) && matches!(role, Some(Role::Member)) && is_admin
}

/// The permission predicates bound to a resolved identity.
///
/// Published by the session context so consumers query permissions without
/// holding the profile and organization themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet {
	user_id: Option<UserId>,
	role: Option<Role>,
	is_admin: bool,
	tier: Option<Tier>,
}

impl PermissionSet {
	/// Permissions of an unauthenticated caller: everything denied.
	pub fn anonymous() -> Self {
		Self {
			user_id: None,
			role: None,
			is_admin: false,
			tier: None,
		}
	}

	/// Binds the predicates to a resolved profile and, when the user has
	/// one, their organization's tier.
	pub fn for_profile(profile: &UserProfile, organization: Option<&Organization>) -> Self {
		Self {
			user_id: Some(profile.id.clone()),
			role: Some(profile.role),
			is_admin: profile.is_admin,
			tier: organization.map(|org| org.tier),
		}
	}

	pub fn can_upload_sessions(&self) -> bool {
		can_upload_sessions(self.role, self.is_admin)
	}

	pub fn can_create_nuggets(&self) -> bool {
		can_create_nuggets(self.role, self.is_admin)
	}

	pub fn can_manage_team(&self) -> bool {
		can_manage_team(self.role, self.is_admin)
	}

	pub fn can_manage_billing(&self) -> bool {
		can_manage_billing(self.role, self.is_admin)
	}

	pub fn can_edit_nuggets(&self, resource_owner: Option<&UserId>) -> bool {
		match &self.user_id {
			Some(caller) => can_edit_nuggets(self.role, resource_owner, caller, self.is_admin),
			None => false,
		}
	}

	pub fn can_configure_workspace_permissions(&self) -> bool {
		can_configure_workspace_permissions(self.tier, self.role, self.is_admin)
	}

	pub fn can_use_sso(&self) -> bool {
		can_use_sso(self.tier)
	}

	pub fn can_bulk_operations(&self) -> bool {
		can_bulk_operations(self.tier, self.role, self.is_admin)
	}
}
