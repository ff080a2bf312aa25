// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the authorization layer.
//!
//! This module defines the foundational types used throughout the auth system:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for entity types
//!   ([`OrgId`], [`WorkspaceId`], etc.) preventing accidental mixing, plus
//!   the string-backed [`UserId`] issued by the external identity provider
//! - **Role**: the single recognized organization role ([`Role::Member`]);
//!   elevated access is carried separately as an `is_admin` flag
//! - **Tier**: subscription plan levels gating feature predicates and the
//!   per-organization workspace limit
//! - **Status enums**: subscription state and join-request lifecycle
//!
//! All UUID-backed ID types implement transparent serde serialization (as
//! UUID strings) and provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(OrgId, "Unique identifier for an organization.");
define_id_type!(WorkspaceId, "Unique identifier for a workspace.");
define_id_type!(JoinRequestId, "Unique identifier for a join request.");
define_id_type!(ArtifactId, "Unique identifier for a research artifact.");

/// Unique identifier for a user.
///
/// Unlike the other ID types, user IDs are opaque strings issued by the
/// external identity provider. They are stable for the lifetime of the
/// account and are never generated by this layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
	/// Create a user ID from an identity-provider-issued string.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Get the ID as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Consume the ID, returning the inner string.
	pub fn into_inner(self) -> String {
		self.0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<String> for UserId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<&str> for UserId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

// =============================================================================
// Role
// =============================================================================

/// Roles within an organization.
///
/// The current data model recognizes a single role; historical role values
/// (`researcher`, `contributor`, `admin`) are normalized by the profile
/// schema upgrade in [`crate::migrate`]. Elevated access is a separate
/// `is_admin` flag on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Standard member access.
	Member,
}

impl Role {
	/// Parse a role from its stored string form.
	///
	/// Only the current role value is recognized; legacy values go through
	/// [`crate::migrate::upgrade_profile`] instead.
	pub fn parse(s: &str) -> Option<Role> {
		match s {
			"member" => Some(Role::Member),
			_ => None,
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Member => write!(f, "member"),
		}
	}
}

// =============================================================================
// Tier
// =============================================================================

/// Subscription plan levels.
///
/// Tiers gate feature predicates (SSO, bulk operations, workspace
/// permissions) and derive the per-organization workspace limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
	/// Entry plan for small research teams.
	SmallTeam,
	/// Mid plan with additional workspaces.
	GrowingTeam,
	/// Full plan: SSO, bulk operations, workspace permission configuration.
	Enterprise,
}

impl Tier {
	/// Returns all available tiers.
	pub fn all() -> &'static [Tier] {
		&[Tier::SmallTeam, Tier::GrowingTeam, Tier::Enterprise]
	}

	/// Maximum number of workspaces an organization on this tier may hold.
	pub fn workspace_limit(&self) -> u32 {
		match self {
			Tier::SmallTeam => 1,
			Tier::GrowingTeam => 3,
			Tier::Enterprise => 10,
		}
	}

	/// Parse a tier from its stored string form.
	pub fn parse(s: &str) -> Option<Tier> {
		match s {
			"small_team" => Some(Tier::SmallTeam),
			"growing_team" => Some(Tier::GrowingTeam),
			"enterprise" => Some(Tier::Enterprise),
			_ => None,
		}
	}
}

impl fmt::Display for Tier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Tier::SmallTeam => write!(f, "small_team"),
			Tier::GrowingTeam => write!(f, "growing_team"),
			Tier::Enterprise => write!(f, "enterprise"),
		}
	}
}

// =============================================================================
// Subscription Status
// =============================================================================

/// Billing state of an organization's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
	/// Inside the trial window; no payment method on file yet.
	Trialing,
	/// Paid and current.
	Active,
	/// A renewal charge failed.
	PastDue,
	/// Subscription ended.
	Canceled,
}

impl SubscriptionStatus {
	/// Parse a status from its stored string form.
	pub fn parse(s: &str) -> Option<SubscriptionStatus> {
		match s {
			"trialing" => Some(SubscriptionStatus::Trialing),
			"active" => Some(SubscriptionStatus::Active),
			"past_due" => Some(SubscriptionStatus::PastDue),
			"canceled" => Some(SubscriptionStatus::Canceled),
			_ => None,
		}
	}
}

impl fmt::Display for SubscriptionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SubscriptionStatus::Trialing => write!(f, "trialing"),
			SubscriptionStatus::Active => write!(f, "active"),
			SubscriptionStatus::PastDue => write!(f, "past_due"),
			SubscriptionStatus::Canceled => write!(f, "canceled"),
		}
	}
}

// =============================================================================
// Join Request Status
// =============================================================================

/// Lifecycle state of an organization join request.
///
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
	/// Awaiting a decision by an org admin or the owner.
	Pending,
	/// Accepted; the requester was linked to the organization.
	Approved,
	/// Declined.
	Rejected,
}

impl JoinRequestStatus {
	/// Parse a status from its stored string form.
	pub fn parse(s: &str) -> Option<JoinRequestStatus> {
		match s {
			"pending" => Some(JoinRequestStatus::Pending),
			"approved" => Some(JoinRequestStatus::Approved),
			"rejected" => Some(JoinRequestStatus::Rejected),
			_ => None,
		}
	}
}

impl fmt::Display for JoinRequestStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			JoinRequestStatus::Pending => write!(f, "pending"),
			JoinRequestStatus::Approved => write!(f, "approved"),
			JoinRequestStatus::Rejected => write!(f, "rejected"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod id_types {
		use super::*;

		#[test]
		fn org_id_roundtrips() {
			let uuid = Uuid::new_v4();
			let org_id = OrgId::new(uuid);
			assert_eq!(org_id.into_inner(), uuid);
		}

		#[test]
		fn org_id_generates_unique() {
			let id1 = OrgId::generate();
			let id2 = OrgId::generate();
			assert_ne!(id1, id2);
		}

		#[test]
		fn workspace_id_serializes_as_uuid() {
			let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
			let ws_id = WorkspaceId::new(uuid);
			let json = serde_json::to_string(&ws_id).unwrap();
			assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
		}

		#[test]
		fn user_id_is_opaque_string() {
			let user_id = UserId::new("auth0|abc123");
			assert_eq!(user_id.as_str(), "auth0|abc123");
			assert_eq!(user_id.to_string(), "auth0|abc123");
		}

		#[test]
		fn user_id_serializes_transparently() {
			let user_id = UserId::new("uid-1");
			let json = serde_json::to_string(&user_id).unwrap();
			assert_eq!(json, "\"uid-1\"");

			let back: UserId = serde_json::from_str(&json).unwrap();
			assert_eq!(back, user_id);
		}

		proptest! {
				#[test]
				fn org_id_roundtrip_any_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let org_id = OrgId::new(uuid);
						prop_assert_eq!(org_id.into_inner(), uuid);
						prop_assert_eq!(Uuid::from(org_id), uuid);
				}

				#[test]
				fn workspace_id_display_matches_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let ws_id = WorkspaceId::new(uuid);
						prop_assert_eq!(ws_id.to_string(), uuid.to_string());
				}

				#[test]
				fn user_id_roundtrip_any_string(
						s in "[a-zA-Z0-9|:_-]{1,64}"
				) {
						let user_id = UserId::new(s.clone());
						prop_assert_eq!(user_id.as_str(), s.as_str());
						prop_assert_eq!(user_id.into_inner(), s);
				}
		}
	}

	mod role {
		use super::*;

		#[test]
		fn parses_member_only() {
			assert_eq!(Role::parse("member"), Some(Role::Member));
			assert_eq!(Role::parse("admin"), None);
			assert_eq!(Role::parse("researcher"), None);
			assert_eq!(Role::parse(""), None);
		}

		#[test]
		fn serializes_snake_case() {
			let json = serde_json::to_string(&Role::Member).unwrap();
			assert_eq!(json, "\"member\"");
		}
	}

	mod tier {
		use super::*;

		#[test]
		fn workspace_limits_increase_with_tier() {
			assert!(Tier::SmallTeam.workspace_limit() < Tier::GrowingTeam.workspace_limit());
			assert!(Tier::GrowingTeam.workspace_limit() < Tier::Enterprise.workspace_limit());
		}

		#[test]
		fn all_tiers_parse_their_display_form() {
			for tier in Tier::all() {
				assert_eq!(Tier::parse(&tier.to_string()), Some(*tier));
			}
		}

		#[test]
		fn unknown_tier_does_not_parse() {
			assert_eq!(Tier::parse("platinum"), None);
			assert_eq!(Tier::parse(""), None);
		}

		#[test]
		fn serializes_snake_case() {
			let json = serde_json::to_string(&Tier::SmallTeam).unwrap();
			assert_eq!(json, "\"small_team\"");
		}
	}

	mod subscription_status {
		use super::*;

		#[test]
		fn roundtrips_display_and_parse() {
			for status in [
				SubscriptionStatus::Trialing,
				SubscriptionStatus::Active,
				SubscriptionStatus::PastDue,
				SubscriptionStatus::Canceled,
			] {
				assert_eq!(SubscriptionStatus::parse(&status.to_string()), Some(status));
			}
		}
	}

	mod join_request_status {
		use super::*;

		#[test]
		fn roundtrips_display_and_parse() {
			for status in [
				JoinRequestStatus::Pending,
				JoinRequestStatus::Approved,
				JoinRequestStatus::Rejected,
			] {
				assert_eq!(JoinRequestStatus::parse(&status.to_string()), Some(status));
			}
		}

		#[test]
		fn serializes_snake_case() {
			let json = serde_json::to_string(&JoinRequestStatus::Pending).unwrap();
			assert_eq!(json, "\"pending\"");
		}
	}
}
