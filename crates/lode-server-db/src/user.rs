// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User profile repository.
//!
//! Profiles are keyed by the identity-provider-issued user ID and are read
//! back in their raw stored shape ([`StoredProfile`]); the schema upgrade in
//! `lode_server_auth::migrate` runs above this layer. `workspace_ids` is a
//! JSON array column.

use async_trait::async_trait;
use chrono::Utc;
use lode_server_auth::{
	profile::StoredProfile,
	types::{OrgId, UserId, WorkspaceId},
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::StoreError;

#[async_trait]
pub trait ProfileStore: Send + Sync {
	async fn create_profile(&self, profile: &StoredProfile) -> Result<(), StoreError>;
	async fn get_profile(&self, user_id: &UserId) -> Result<Option<StoredProfile>, StoreError>;
	async fn update_role_fields(
		&self,
		user_id: &UserId,
		role: &str,
		is_admin: bool,
	) -> Result<(), StoreError>;
	async fn attach_organization(
		&self,
		user_id: &UserId,
		org_id: &OrgId,
		is_admin: bool,
		workspace_ids: &[WorkspaceId],
	) -> Result<(), StoreError>;
}

/// Repository for user profile database operations.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a profile row.
	///
	/// # Errors
	/// Returns `StoreError::Sqlx` if insert fails (e.g., duplicate user ID).
	#[tracing::instrument(skip(self, profile), fields(user_id = %profile.id))]
	pub async fn create_profile(&self, profile: &StoredProfile) -> Result<(), StoreError> {
		let workspace_ids = serde_json::to_string(&profile.workspace_ids)?;
		sqlx::query(
			r#"
			INSERT INTO users (id, email, role, is_admin, organization_id, workspace_ids, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(profile.id.to_string())
		.bind(&profile.email)
		.bind(&profile.role)
		.bind(profile.is_admin.map(|a| a as i32))
		.bind(profile.organization_id.map(|o| o.to_string()))
		.bind(workspace_ids)
		.bind(profile.created_at.to_rfc3339())
		.bind(profile.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %profile.id, "profile created");
		Ok(())
	}

	/// Get a profile in its raw stored shape.
	///
	/// # Returns
	/// `None` if no profile exists for this user.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_profile(&self, user_id: &UserId) -> Result<Option<StoredProfile>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, role, is_admin, organization_id, workspace_ids, created_at, updated_at
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_profile(&r)).transpose()
	}

	/// Update the role and admin flag of a profile.
	///
	/// Used by the lazy schema upgrade to persist normalized role fields.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, role = %role, is_admin))]
	pub async fn update_role_fields(
		&self,
		user_id: &UserId,
		role: &str,
		is_admin: bool,
	) -> Result<(), StoreError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE users
			SET role = ?, is_admin = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(role)
		.bind(is_admin as i32)
		.bind(&now)
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %user_id, "role fields updated");
		Ok(())
	}

	/// Link a profile to an organization and grant workspaces.
	///
	/// Overwrites any previous organization link and workspace grants.
	#[tracing::instrument(skip(self, workspace_ids), fields(user_id = %user_id, org_id = %org_id, is_admin))]
	pub async fn attach_organization(
		&self,
		user_id: &UserId,
		org_id: &OrgId,
		is_admin: bool,
		workspace_ids: &[WorkspaceId],
	) -> Result<(), StoreError> {
		let workspace_json = serde_json::to_string(workspace_ids)?;
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE users
			SET organization_id = ?, is_admin = ?, workspace_ids = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(is_admin as i32)
		.bind(&workspace_json)
		.bind(&now)
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(StoreError::NotFound(format!("user {user_id}")));
		}

		tracing::debug!(user_id = %user_id, org_id = %org_id, "profile linked to organization");
		Ok(())
	}

	fn row_to_profile(&self, row: &sqlx::sqlite::SqliteRow) -> Result<StoredProfile, StoreError> {
		let is_admin: Option<i32> = row.get("is_admin");
		let organization_id: Option<String> = row.get("organization_id");
		let workspace_ids: String = row.get("workspace_ids");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let organization_id = organization_id
			.map(|o| {
				Uuid::parse_str(&o)
					.map(OrgId::new)
					.map_err(|e| StoreError::Internal(format!("Invalid organization_id: {e}")))
			})
			.transpose()?;
		let workspace_ids: Vec<WorkspaceId> = serde_json::from_str(&workspace_ids)?;

		Ok(StoredProfile {
			id: UserId::new(row.get::<String, _>("id")),
			email: row.get("email"),
			role: row.get("role"),
			is_admin: is_admin.map(|a| a != 0),
			organization_id,
			workspace_ids,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| StoreError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
				.map_err(|e| StoreError::Internal(format!("Invalid updated_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl ProfileStore for UserRepository {
	async fn create_profile(&self, profile: &StoredProfile) -> Result<(), StoreError> {
		self.create_profile(profile).await
	}

	async fn get_profile(&self, user_id: &UserId) -> Result<Option<StoredProfile>, StoreError> {
		self.get_profile(user_id).await
	}

	async fn update_role_fields(
		&self,
		user_id: &UserId,
		role: &str,
		is_admin: bool,
	) -> Result<(), StoreError> {
		self.update_role_fields(user_id, role, is_admin).await
	}

	async fn attach_organization(
		&self,
		user_id: &UserId,
		org_id: &OrgId,
		is_admin: bool,
		workspace_ids: &[WorkspaceId],
	) -> Result<(), StoreError> {
		self
			.attach_organization(user_id, org_id, is_admin, workspace_ids)
			.await
	}
}
