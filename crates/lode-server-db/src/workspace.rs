// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workspace repository.
//!
//! Workspace creation enforces the organization's tier-derived limit. The
//! count-then-insert pair is not atomic; concurrent creation can exceed the
//! limit by one. Accepted: the limit is a billing guardrail, not a safety
//! invariant.

use async_trait::async_trait;
use chrono::Utc;
use lode_server_auth::{
	org::Workspace,
	types::{OrgId, UserId, WorkspaceId},
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::org::OrgRepository;

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
	async fn create_workspace(
		&self,
		org_id: &OrgId,
		name: &str,
		caller: &UserId,
	) -> Result<Workspace, StoreError>;
	async fn get_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>, StoreError>;
	async fn list_for_org(&self, org_id: &OrgId) -> Result<Vec<Workspace>, StoreError>;
	async fn count_for_org(&self, org_id: &OrgId) -> Result<i64, StoreError>;
}

/// Repository for workspace database operations.
#[derive(Clone)]
pub struct WorkspaceRepository {
	pool: SqlitePool,
}

impl WorkspaceRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a workspace in an organization.
	///
	/// # Errors
	/// Returns `StoreError::Validation` when the organization is at its
	/// workspace limit, naming the limit and tier so callers can surface an
	/// upgrade prompt. Returns `StoreError::PermissionDenied` unless the
	/// caller owns the organization or is one of its admins.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, caller = %caller))]
	pub async fn create_workspace(
		&self,
		org_id: &OrgId,
		name: &str,
		caller: &UserId,
	) -> Result<Workspace, StoreError> {
		let orgs = OrgRepository::new(self.pool.clone());
		let org = orgs
			.get_org_by_id(org_id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("organization {org_id}")))?;
		orgs.require_manage_permission(&org, caller).await?;

		let count = self.count_for_org(org_id).await?;
		if count >= org.workspace_limit as i64 {
			return Err(StoreError::Validation(format!(
				"Workspace limit reached: the {} plan allows {} workspace(s)",
				org.tier, org.workspace_limit
			)));
		}

		let workspace = Workspace::new(*org_id, name, caller.clone());
		sqlx::query(
			r#"
			INSERT INTO workspaces (id, name, organization_id, created_by, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(workspace.id.to_string())
		.bind(&workspace.name)
		.bind(workspace.organization_id.to_string())
		.bind(workspace.created_by.to_string())
		.bind(workspace.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::info!(workspace_id = %workspace.id, org_id = %org_id, "workspace created");
		Ok(workspace)
	}

	/// Get a workspace by ID.
	#[tracing::instrument(skip(self), fields(workspace_id = %id))]
	pub async fn get_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, organization_id, created_by, created_at
			FROM workspaces
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_workspace(&r)).transpose()
	}

	/// List an organization's workspaces, oldest first.
	///
	/// The first element is the organization's default workspace; join-request
	/// approval grants it to new members.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn list_for_org(&self, org_id: &OrgId) -> Result<Vec<Workspace>, StoreError> {
		let rows = sqlx::query(
			r#"
			SELECT id, name, organization_id, created_by, created_at
			FROM workspaces
			WHERE organization_id = ?
			ORDER BY created_at ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let workspaces: Result<Vec<_>, _> = rows.iter().map(|r| self.row_to_workspace(r)).collect();
		let workspaces = workspaces?;
		tracing::debug!(org_id = %org_id, count = workspaces.len(), "listed workspaces");
		Ok(workspaces)
	}

	/// Count an organization's workspaces.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	pub async fn count_for_org(&self, org_id: &OrgId) -> Result<i64, StoreError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM workspaces
			WHERE organization_id = ?
			"#,
		)
		.bind(org_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0)
	}

	fn row_to_workspace(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Workspace, StoreError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("organization_id");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| StoreError::Internal(format!("Invalid workspace ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| StoreError::Internal(format!("Invalid organization_id: {e}")))?;

		Ok(Workspace {
			id: WorkspaceId::new(id),
			name: row.get("name"),
			organization_id: OrgId::new(org_id),
			created_by: UserId::new(row.get::<String, _>("created_by")),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| StoreError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl WorkspaceStore for WorkspaceRepository {
	async fn create_workspace(
		&self,
		org_id: &OrgId,
		name: &str,
		caller: &UserId,
	) -> Result<Workspace, StoreError> {
		self.create_workspace(org_id, name, caller).await
	}

	async fn get_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>, StoreError> {
		self.get_workspace(id).await
	}

	async fn list_for_org(&self, org_id: &OrgId) -> Result<Vec<Workspace>, StoreError> {
		self.list_for_org(org_id).await
	}

	async fn count_for_org(&self, org_id: &OrgId) -> Result<i64, StoreError> {
		self.count_for_org(org_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::org::{CreateOrganizationParams, StoreSubdomainChecker};
	use crate::testing::create_org_test_pool;
	use crate::user::UserRepository;
	use lode_server_auth::profile::{StoredProfile, UserProfile};
	use lode_server_auth::types::Tier;

	async fn setup() -> (SqlitePool, WorkspaceRepository, OrgRepository, UserId, OrgId) {
		let pool = create_org_test_pool().await;
		let owner = UserId::new("uid-owner");
		let profile = StoredProfile::from_profile(&UserProfile::bootstrap(
			owner.clone(),
			"owner@example.com",
		));
		UserRepository::new(pool.clone())
			.create_profile(&profile)
			.await
			.unwrap();

		let orgs = OrgRepository::new(pool.clone());
		let checker = StoreSubdomainChecker::new(pool.clone());
		let org = orgs
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

		let repo = WorkspaceRepository::new(pool.clone());
		(pool, repo, orgs, owner, org.id)
	}

	#[tokio::test]
	async fn test_default_workspace_counts_toward_limit() {
		let (_pool, repo, _orgs, owner, org_id) = setup().await;

		// small_team allows one workspace; the default "General" fills it
		let result = repo.create_workspace(&org_id, "Second", &owner).await;
		assert!(matches!(result, Err(StoreError::Validation(msg)) if msg.contains("small_team")));
	}

	#[tokio::test]
	async fn test_create_after_tier_upgrade() {
		let (_pool, repo, orgs, owner, org_id) = setup().await;

		orgs
			.update_org_tier(&org_id, Tier::GrowingTeam, &owner)
			.await
			.unwrap();

		let ws = repo.create_workspace(&org_id, "Second", &owner).await.unwrap();
		assert_eq!(ws.name, "Second");
		assert_eq!(repo.count_for_org(&org_id).await.unwrap(), 2);
	}

	#[tokio::test]
	async fn test_create_requires_permission() {
		let (pool, repo, _orgs, _owner, org_id) = setup().await;

		let stranger = UserId::new("uid-stranger");
		let profile = StoredProfile::from_profile(&UserProfile::bootstrap(
			stranger.clone(),
			"stranger@example.com",
		));
		UserRepository::new(pool)
			.create_profile(&profile)
			.await
			.unwrap();

		let result = repo.create_workspace(&org_id, "Sneaky", &stranger).await;
		assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
	}

	#[tokio::test]
	async fn test_list_is_ordered_oldest_first() {
		let (_pool, repo, orgs, owner, org_id) = setup().await;

		orgs
			.update_org_tier(&org_id, Tier::Enterprise, &owner)
			.await
			.unwrap();
		repo.create_workspace(&org_id, "Second", &owner).await.unwrap();
		repo.create_workspace(&org_id, "Third", &owner).await.unwrap();

		let workspaces = repo.list_for_org(&org_id).await.unwrap();
		assert_eq!(workspaces.len(), 3);
		assert_eq!(workspaces[0].name, "General");
	}

	#[tokio::test]
	async fn test_get_workspace() {
		let (_pool, repo, _orgs, _owner, org_id) = setup().await;

		let workspaces = repo.list_for_org(&org_id).await.unwrap();
		let fetched = repo.get_workspace(&workspaces[0].id).await.unwrap().unwrap();
		assert_eq!(fetched.id, workspaces[0].id);

		assert!(repo
			.get_workspace(&WorkspaceId::generate())
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_create_in_missing_org() {
		let (_pool, repo, _orgs, owner, _org_id) = setup().await;
		let result = repo
			.create_workspace(&OrgId::generate(), "Ghost", &owner)
			.await;
		assert!(matches!(result, Err(StoreError::NotFound(_))));
	}
}
