// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization, workspace, and join-request entities.
//!
//! This module provides:
//! - [`Organization`] - the billing/tenancy root entity
//! - [`Workspace`] - a sub-division of an organization, bounded by a
//!   tier-derived limit
//! - [`OrgJoinRequest`] - a pending application to join an organization

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{JoinRequestId, JoinRequestStatus, OrgId, SubscriptionStatus, Tier, UserId, WorkspaceId};

/// An organization.
///
/// Organizations own workspaces and subscription state. Every organization
/// has exactly one owner; the owner is expected to also be a member
/// (resolution backfills `organization_id` for owners created before that
/// field existed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
	/// Unique identifier for this organization.
	pub id: OrgId,

	/// Display name.
	pub name: String,

	/// Globally unique, URL-safe subdomain, if one has been claimed.
	pub subdomain: Option<String>,

	/// Subscription plan level.
	pub tier: Tier,

	/// The owning user.
	pub owner_id: UserId,

	/// Billing state.
	pub subscription_status: SubscriptionStatus,

	/// When the trial window closes.
	pub trial_ends_at: DateTime<Utc>,

	/// Maximum number of workspaces, derived from the tier.
	pub workspace_limit: u32,

	/// When the organization was created.
	pub created_at: DateTime<Utc>,

	/// When the organization was last updated.
	pub updated_at: DateTime<Utc>,
}

impl Organization {
	/// Length of the trial window opened at creation.
	pub const TRIAL_DAYS: i64 = 14;

	/// Creates a new organization on the entry tier with a fresh trial.
	///
	/// Generates a new ID, sets `subscription_status` to trialing, opens a
	/// [`Self::TRIAL_DAYS`]-day trial window, and derives the workspace
	/// limit from the tier.
	pub fn new(name: impl Into<String>, subdomain: Option<String>, owner_id: UserId) -> Self {
		let now = Utc::now();
		let tier = Tier::SmallTeam;
		Self {
			id: OrgId::generate(),
			name: name.into(),
			subdomain,
			tier,
			owner_id,
			subscription_status: SubscriptionStatus::Trialing,
			trial_ends_at: now + Duration::days(Self::TRIAL_DAYS),
			workspace_limit: tier.workspace_limit(),
			created_at: now,
			updated_at: now,
		}
	}

	/// Returns true if the given user owns this organization.
	pub fn is_owned_by(&self, user_id: &UserId) -> bool {
		&self.owner_id == user_id
	}
}

/// A workspace within an organization.
///
/// Workspaces scope research resources. The referenced organization must
/// exist; the store enforces this at the application level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
	/// Unique identifier for this workspace.
	pub id: WorkspaceId,

	/// Display name.
	pub name: String,

	/// The organization this workspace belongs to.
	pub organization_id: OrgId,

	/// The user who created the workspace.
	pub created_by: UserId,

	/// When the workspace was created.
	pub created_at: DateTime<Utc>,
}

impl Workspace {
	/// Creates a new workspace with a generated ID.
	pub fn new(organization_id: OrgId, name: impl Into<String>, created_by: UserId) -> Self {
		Self {
			id: WorkspaceId::generate(),
			name: name.into(),
			organization_id,
			created_by,
			created_at: Utc::now(),
		}
	}
}

/// A user's application to join an organization they do not own.
///
/// At most one pending request may exist per (organization, user). Approval
/// and rejection are terminal; approval additionally links the requester to
/// the organization and its first workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgJoinRequest {
	/// Unique identifier for this request.
	pub id: JoinRequestId,

	/// The organization being applied to.
	pub organization_id: OrgId,

	/// The applying user.
	pub user_id: UserId,

	/// Lifecycle state.
	pub status: JoinRequestStatus,

	/// When the request was created.
	pub created_at: DateTime<Utc>,

	/// When the request was approved or rejected, if it has been.
	pub responded_at: Option<DateTime<Utc>>,

	/// Who approved or rejected the request, if anyone has.
	pub responded_by: Option<UserId>,
}

impl OrgJoinRequest {
	/// Creates a new pending request.
	pub fn new(organization_id: OrgId, user_id: UserId) -> Self {
		Self {
			id: JoinRequestId::generate(),
			organization_id,
			user_id,
			status: JoinRequestStatus::Pending,
			created_at: Utc::now(),
			responded_at: None,
			responded_by: None,
		}
	}

	/// Returns true if this request is still awaiting a decision.
	pub fn is_pending(&self) -> bool {
		self.status == JoinRequestStatus::Pending
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	mod organization {
		use super::*;

		#[test]
		fn new_opens_trial_on_entry_tier() {
			let owner = UserId::new("uid-owner");
			let org = Organization::new("Acme Research", Some("acme-research".to_string()), owner.clone());

			assert_eq!(org.tier, Tier::SmallTeam);
			assert_eq!(org.subscription_status, SubscriptionStatus::Trialing);
			assert_eq!(org.workspace_limit, Tier::SmallTeam.workspace_limit());
			assert!(org.is_owned_by(&owner));
		}

		#[test]
		fn new_sets_trial_window() {
			let org = Organization::new("Acme", None, UserId::new("uid-1"));
			let expected = org.created_at + Duration::days(Organization::TRIAL_DAYS);
			assert_eq!(org.trial_ends_at, expected);
		}

		#[test]
		fn new_generates_unique_ids() {
			let org1 = Organization::new("One", None, UserId::new("uid-1"));
			let org2 = Organization::new("Two", None, UserId::new("uid-1"));
			assert_ne!(org1.id, org2.id);
		}

		#[test]
		fn is_owned_by_rejects_other_users() {
			let org = Organization::new("Acme", None, UserId::new("uid-1"));
			assert!(!org.is_owned_by(&UserId::new("uid-2")));
		}

		#[test]
		fn serializes_correctly() {
			let org = Organization::new("Acme", Some("acme".to_string()), UserId::new("uid-1"));
			let json = serde_json::to_string(&org).unwrap();
			assert!(json.contains("\"tier\":\"small_team\""));
			assert!(json.contains("\"subscription_status\":\"trialing\""));
			assert!(json.contains("\"subdomain\":\"acme\""));
		}
	}

	mod workspace {
		use super::*;

		#[test]
		fn new_creates_workspace_with_generated_id() {
			let org_id = OrgId::generate();
			let creator = UserId::new("uid-1");
			let ws = Workspace::new(org_id, "General", creator.clone());

			assert_eq!(ws.organization_id, org_id);
			assert_eq!(ws.name, "General");
			assert_eq!(ws.created_by, creator);
		}

		#[test]
		fn new_generates_unique_ids() {
			let org_id = OrgId::generate();
			let ws1 = Workspace::new(org_id, "A", UserId::new("uid-1"));
			let ws2 = Workspace::new(org_id, "B", UserId::new("uid-1"));
			assert_ne!(ws1.id, ws2.id);
		}
	}

	mod join_request {
		use super::*;

		#[test]
		fn new_request_is_pending() {
			let request = OrgJoinRequest::new(OrgId::generate(), UserId::new("uid-1"));
			assert!(request.is_pending());
			assert!(request.responded_at.is_none());
			assert!(request.responded_by.is_none());
		}

		#[test]
		fn handled_request_is_not_pending() {
			let mut request = OrgJoinRequest::new(OrgId::generate(), UserId::new("uid-1"));
			request.status = JoinRequestStatus::Approved;
			assert!(!request.is_pending());

			request.status = JoinRequestStatus::Rejected;
			assert!(!request.is_pending());
		}

		#[test]
		fn deserializes_correctly() {
			let request = OrgJoinRequest::new(OrgId::generate(), UserId::new("uid-1"));
			let json = serde_json::to_string(&request).unwrap();

			let back: OrgJoinRequest = serde_json::from_str(&json).unwrap();
			assert_eq!(back, request);
		}
	}
}
