// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Join request repository.
//!
//! A join request is a user's application to an organization they do not
//! own. At most one pending request exists per (organization, user).
//! Approval and rejection are terminal and record who responded and when;
//! approval additionally links the requester to the organization and grants
//! its oldest workspace.

use async_trait::async_trait;
use chrono::Utc;
use lode_server_auth::{
	org::OrgJoinRequest,
	types::{JoinRequestId, JoinRequestStatus, OrgId, UserId},
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::org::OrgRepository;
use crate::user::UserRepository;
use crate::workspace::WorkspaceRepository;

#[async_trait]
pub trait JoinRequestStore: Send + Sync {
	async fn create_request(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<OrgJoinRequest, StoreError>;
	async fn get_request(&self, id: &JoinRequestId) -> Result<Option<OrgJoinRequest>, StoreError>;
	async fn find_pending_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Option<OrgJoinRequest>, StoreError>;
	async fn find_approved_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Option<OrgJoinRequest>, StoreError>;
	async fn list_pending_for_org(&self, org_id: &OrgId)
		-> Result<Vec<OrgJoinRequest>, StoreError>;
	async fn approve(&self, id: &JoinRequestId, responder: &UserId) -> Result<(), StoreError>;
	async fn reject(&self, id: &JoinRequestId, responder: &UserId) -> Result<(), StoreError>;
	async fn cancel(&self, id: &JoinRequestId, requester: &UserId) -> Result<bool, StoreError>;
}

/// Repository for join request database operations.
#[derive(Clone)]
pub struct JoinRequestRepository {
	pool: SqlitePool,
}

impl JoinRequestRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a pending join request.
	///
	/// # Errors
	/// Returns `StoreError::Validation` if the user owns the organization or
	/// already belongs to one, `StoreError::Conflict` if a pending request
	/// for this pair already exists, `StoreError::NotFound` if the
	/// organization does not exist.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	pub async fn create_request(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<OrgJoinRequest, StoreError> {
		let org = OrgRepository::new(self.pool.clone())
			.get_org_by_id(org_id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("organization {org_id}")))?;
		if org.is_owned_by(user_id) {
			return Err(StoreError::Validation(
				"Cannot request to join your own organization".to_string(),
			));
		}

		if let Some(profile) = UserRepository::new(self.pool.clone())
			.get_profile(user_id)
			.await?
		{
			if profile.organization_id.is_some() {
				return Err(StoreError::Validation(
					"Already a member of an organization".to_string(),
				));
			}
		}

		let pending: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM org_join_requests
			WHERE organization_id = ? AND user_id = ? AND status = 'pending'
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.fetch_one(&self.pool)
		.await?;
		if pending.0 > 0 {
			return Err(StoreError::Conflict(
				"A pending request for this organization already exists".to_string(),
			));
		}

		let request = OrgJoinRequest::new(*org_id, user_id.clone());
		sqlx::query(
			r#"
			INSERT INTO org_join_requests (id, organization_id, user_id, status, created_at, responded_at, responded_by)
			VALUES (?, ?, ?, ?, ?, NULL, NULL)
			"#,
		)
		.bind(request.id.to_string())
		.bind(request.organization_id.to_string())
		.bind(request.user_id.to_string())
		.bind(request.status.to_string())
		.bind(request.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::info!(join_request_id = %request.id, org_id = %org_id, user_id = %user_id, "join request created");
		Ok(request)
	}

	/// Get a join request by ID.
	#[tracing::instrument(skip(self), fields(join_request_id = %id))]
	pub async fn get_request(
		&self,
		id: &JoinRequestId,
	) -> Result<Option<OrgJoinRequest>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, organization_id, user_id, status, created_at, responded_at, responded_by
			FROM org_join_requests
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_request(&r)).transpose()
	}

	/// Find a user's pending join request, if any.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn find_pending_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Option<OrgJoinRequest>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, organization_id, user_id, status, created_at, responded_at, responded_by
			FROM org_join_requests
			WHERE user_id = ? AND status = 'pending'
			ORDER BY created_at ASC
			LIMIT 1
			"#,
		)
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_request(&r)).transpose()
	}

	/// Find a user's most recent approved join request, if any.
	///
	/// Resolution uses this to pick up an approval that happened while the
	/// user was offline and link them to the organization on next load.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn find_approved_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Option<OrgJoinRequest>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, organization_id, user_id, status, created_at, responded_at, responded_by
			FROM org_join_requests
			WHERE user_id = ? AND status = 'approved'
			ORDER BY responded_at DESC
			LIMIT 1
			"#,
		)
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_request(&r)).transpose()
	}

	/// List an organization's pending join requests, oldest first.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_pending_for_org(
		&self,
		org_id: &OrgId,
	) -> Result<Vec<OrgJoinRequest>, StoreError> {
		let rows = sqlx::query(
			r#"
			SELECT id, organization_id, user_id, status, created_at, responded_at, responded_by
			FROM org_join_requests
			WHERE organization_id = ? AND status = 'pending'
			ORDER BY created_at ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let requests: Result<Vec<_>, _> = rows.iter().map(|r| self.row_to_request(r)).collect();
		let requests = requests?;
		tracing::debug!(org_id = %org_id, count = requests.len(), "listed pending join requests");
		Ok(requests)
	}

	/// Approve a pending join request.
	///
	/// Marks the request approved, links the requester to the organization,
	/// and grants the organization's oldest workspace.
	///
	/// # Errors
	/// Returns `StoreError::Validation` if the request was already processed
	/// or the requester has since joined an organization,
	/// `StoreError::PermissionDenied` unless the responder owns the
	/// organization or is one of its admins.
	#[tracing::instrument(skip(self), fields(join_request_id = %id, responder = %responder))]
	pub async fn approve(&self, id: &JoinRequestId, responder: &UserId) -> Result<(), StoreError> {
		let request = self.load_pending(id, responder).await?;

		let users = UserRepository::new(self.pool.clone());
		let requester_profile = users
			.get_profile(&request.user_id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("user {}", request.user_id)))?;
		if requester_profile.organization_id.is_some() {
			return Err(StoreError::Validation(
				"Requester already belongs to an organization".to_string(),
			));
		}

		let workspaces = WorkspaceRepository::new(self.pool.clone())
			.list_for_org(&request.organization_id)
			.await?;
		let granted: Vec<_> = workspaces.first().map(|w| w.id).into_iter().collect();

		self.mark_responded(id, JoinRequestStatus::Approved, responder)
			.await?;
		users
			.attach_organization(&request.user_id, &request.organization_id, false, &granted)
			.await?;

		tracing::info!(join_request_id = %id, user_id = %request.user_id, org_id = %request.organization_id, "join request approved");
		Ok(())
	}

	/// Reject a pending join request.
	///
	/// # Errors
	/// Same permission and lifecycle rules as [`Self::approve`].
	#[tracing::instrument(skip(self), fields(join_request_id = %id, responder = %responder))]
	pub async fn reject(&self, id: &JoinRequestId, responder: &UserId) -> Result<(), StoreError> {
		self.load_pending(id, responder).await?;
		self.mark_responded(id, JoinRequestStatus::Rejected, responder)
			.await?;

		tracing::info!(join_request_id = %id, "join request rejected");
		Ok(())
	}

	/// Cancel a pending request. Only the requester may cancel.
	///
	/// # Returns
	/// `true` if a pending request was removed.
	#[tracing::instrument(skip(self), fields(join_request_id = %id, requester = %requester))]
	pub async fn cancel(&self, id: &JoinRequestId, requester: &UserId) -> Result<bool, StoreError> {
		let result = sqlx::query(
			r#"
			DELETE FROM org_join_requests
			WHERE id = ? AND user_id = ? AND status = 'pending'
			"#,
		)
		.bind(id.to_string())
		.bind(requester.to_string())
		.execute(&self.pool)
		.await?;

		let cancelled = result.rows_affected() > 0;
		if cancelled {
			tracing::debug!(join_request_id = %id, "join request cancelled");
		}
		Ok(cancelled)
	}

	/// Load a request, requiring it to be pending and the responder to
	/// manage its organization.
	async fn load_pending(
		&self,
		id: &JoinRequestId,
		responder: &UserId,
	) -> Result<OrgJoinRequest, StoreError> {
		let request = self
			.get_request(id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("join request {id}")))?;
		if !request.is_pending() {
			return Err(StoreError::Validation(
				"Join request was already processed".to_string(),
			));
		}

		let orgs = OrgRepository::new(self.pool.clone());
		let org = orgs
			.get_org_by_id(&request.organization_id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("organization {}", request.organization_id)))?;
		orgs.require_manage_permission(&org, responder).await?;

		Ok(request)
	}

	async fn mark_responded(
		&self,
		id: &JoinRequestId,
		status: JoinRequestStatus,
		responder: &UserId,
	) -> Result<(), StoreError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE org_join_requests
			SET status = ?, responded_at = ?, responded_by = ?
			WHERE id = ? AND status = 'pending'
			"#,
		)
		.bind(status.to_string())
		.bind(&now)
		.bind(responder.to_string())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	fn row_to_request(&self, row: &sqlx::sqlite::SqliteRow) -> Result<OrgJoinRequest, StoreError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("organization_id");
		let status_str: String = row.get("status");
		let created_at: String = row.get("created_at");
		let responded_at: Option<String> = row.get("responded_at");
		let responded_by: Option<String> = row.get("responded_by");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| StoreError::Internal(format!("Invalid join request ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| StoreError::Internal(format!("Invalid organization_id: {e}")))?;
		let status = JoinRequestStatus::parse(&status_str)
			.ok_or_else(|| StoreError::Internal(format!("Invalid status: {status_str}")))?;

		Ok(OrgJoinRequest {
			id: JoinRequestId::new(id),
			organization_id: OrgId::new(org_id),
			user_id: UserId::new(row.get::<String, _>("user_id")),
			status,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| StoreError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			responded_at: responded_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
			responded_by: responded_by.map(UserId::new),
		})
	}
}

#[async_trait]
impl JoinRequestStore for JoinRequestRepository {
	async fn create_request(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<OrgJoinRequest, StoreError> {
		self.create_request(org_id, user_id).await
	}

	async fn get_request(&self, id: &JoinRequestId) -> Result<Option<OrgJoinRequest>, StoreError> {
		self.get_request(id).await
	}

	async fn find_pending_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Option<OrgJoinRequest>, StoreError> {
		self.find_pending_for_user(user_id).await
	}

	async fn find_approved_for_user(
		&self,
		user_id: &UserId,
	) -> Result<Option<OrgJoinRequest>, StoreError> {
		self.find_approved_for_user(user_id).await
	}

	async fn list_pending_for_org(
		&self,
		org_id: &OrgId,
	) -> Result<Vec<OrgJoinRequest>, StoreError> {
		self.list_pending_for_org(org_id).await
	}

	async fn approve(&self, id: &JoinRequestId, responder: &UserId) -> Result<(), StoreError> {
		self.approve(id, responder).await
	}

	async fn reject(&self, id: &JoinRequestId, responder: &UserId) -> Result<(), StoreError> {
		self.reject(id, responder).await
	}

	async fn cancel(&self, id: &JoinRequestId, requester: &UserId) -> Result<bool, StoreError> {
		self.cancel(id, requester).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::org::{CreateOrganizationParams, StoreSubdomainChecker};
	use crate::testing::create_full_test_pool;
	use lode_server_auth::profile::{StoredProfile, UserProfile};

	struct Fixture {
		pool: SqlitePool,
		requests: JoinRequestRepository,
		owner: UserId,
		org_id: OrgId,
	}

	async fn seed_user(pool: &SqlitePool, user_id: &str) -> UserId {
		let user_id = UserId::new(user_id);
		let profile = StoredProfile::from_profile(&UserProfile::bootstrap(
			user_id.clone(),
			format!("{user_id}@example.com"),
		));
		UserRepository::new(pool.clone())
			.create_profile(&profile)
			.await
			.unwrap();
		user_id
	}

	async fn setup() -> Fixture {
		let pool = create_full_test_pool().await;
		let owner = seed_user(&pool, "uid-owner").await;

		let checker = StoreSubdomainChecker::new(pool.clone());
		let org = OrgRepository::new(pool.clone())
			.create_organization(
				CreateOrganizationParams {
					name: "Acme".to_string(),
					subdomain: Some("acme".to_string()),
				},
				&owner,
				&checker,
			)
			.await
			.unwrap();

		Fixture {
			requests: JoinRequestRepository::new(pool.clone()),
			pool,
			owner,
			org_id: org.id,
		}
	}

	#[tokio::test]
	async fn test_create_and_get_request() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;

		let request = fx
			.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();
		assert!(request.is_pending());

		let fetched = fx.requests.get_request(&request.id).await.unwrap().unwrap();
		assert_eq!(fetched.id, request.id);
		assert_eq!(fetched.user_id, requester);
	}

	#[tokio::test]
	async fn test_owner_cannot_request_own_org() {
		let fx = setup().await;
		let result = fx.requests.create_request(&fx.org_id, &fx.owner).await;
		assert!(matches!(result, Err(StoreError::Validation(_))));
	}

	#[tokio::test]
	async fn test_duplicate_pending_is_conflict() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;

		fx.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();
		let result = fx.requests.create_request(&fx.org_id, &requester).await;
		assert!(matches!(result, Err(StoreError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_approve_links_requester() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;

		let request = fx
			.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();
		fx.requests.approve(&request.id, &fx.owner).await.unwrap();

		let fetched = fx.requests.get_request(&request.id).await.unwrap().unwrap();
		assert_eq!(fetched.status, JoinRequestStatus::Approved);
		assert_eq!(fetched.responded_by, Some(fx.owner.clone()));
		assert!(fetched.responded_at.is_some());

		let profile = UserRepository::new(fx.pool.clone())
			.get_profile(&requester)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(profile.organization_id, Some(fx.org_id));
		assert_eq!(profile.is_admin, Some(false));
		assert_eq!(profile.workspace_ids.len(), 1);
	}

	#[tokio::test]
	async fn test_second_approval_fails() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;

		let request = fx
			.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();
		fx.requests.approve(&request.id, &fx.owner).await.unwrap();

		let result = fx.requests.approve(&request.id, &fx.owner).await;
		assert!(matches!(result, Err(StoreError::Validation(msg)) if msg.contains("already processed")));
	}

	#[tokio::test]
	async fn test_approve_requires_permission() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;
		let stranger = seed_user(&fx.pool, "uid-stranger").await;

		let request = fx
			.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();
		let result = fx.requests.approve(&request.id, &stranger).await;
		assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
	}

	#[tokio::test]
	async fn test_reject_is_terminal() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;

		let request = fx
			.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();
		fx.requests.reject(&request.id, &fx.owner).await.unwrap();

		let fetched = fx.requests.get_request(&request.id).await.unwrap().unwrap();
		assert_eq!(fetched.status, JoinRequestStatus::Rejected);

		// requester remains unlinked
		let profile = UserRepository::new(fx.pool.clone())
			.get_profile(&requester)
			.await
			.unwrap()
			.unwrap();
		assert!(profile.organization_id.is_none());

		let result = fx.requests.approve(&request.id, &fx.owner).await;
		assert!(matches!(result, Err(StoreError::Validation(_))));
	}

	#[tokio::test]
	async fn test_cancel_by_requester_only() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;
		let other = seed_user(&fx.pool, "uid-other").await;

		let request = fx
			.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();

		assert!(!fx.requests.cancel(&request.id, &other).await.unwrap());
		assert!(fx.requests.cancel(&request.id, &requester).await.unwrap());
		assert!(fx.requests.get_request(&request.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_find_pending_and_approved_for_user() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;

		assert!(fx
			.requests
			.find_pending_for_user(&requester)
			.await
			.unwrap()
			.is_none());

		let request = fx
			.requests
			.create_request(&fx.org_id, &requester)
			.await
			.unwrap();
		let pending = fx
			.requests
			.find_pending_for_user(&requester)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(pending.id, request.id);

		fx.requests.approve(&request.id, &fx.owner).await.unwrap();
		assert!(fx
			.requests
			.find_pending_for_user(&requester)
			.await
			.unwrap()
			.is_none());
		let approved = fx
			.requests
			.find_approved_for_user(&requester)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(approved.id, request.id);
	}

	#[tokio::test]
	async fn test_list_pending_for_org() {
		let fx = setup().await;
		let a = seed_user(&fx.pool, "uid-a").await;
		let b = seed_user(&fx.pool, "uid-b").await;

		fx.requests.create_request(&fx.org_id, &a).await.unwrap();
		fx.requests.create_request(&fx.org_id, &b).await.unwrap();

		let pending = fx.requests.list_pending_for_org(&fx.org_id).await.unwrap();
		assert_eq!(pending.len(), 2);
	}

	#[tokio::test]
	async fn test_member_cannot_request_another_org() {
		let fx = setup().await;
		let requester = seed_user(&fx.pool, "uid-requester").await;

		UserRepository::new(fx.pool.clone())
			.attach_organization(&requester, &OrgId::generate(), false, &[])
			.await
			.unwrap();

		let result = fx.requests.create_request(&fx.org_id, &requester).await;
		assert!(matches!(result, Err(StoreError::Validation(_))));
	}
}
