// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Artifact repository.
//!
//! Access checks live next to the queries they guard: listing another user's
//! sessions requires admin, creation requires the target workspace to sit in
//! the caller's organization, and mutation goes through the ownership and
//! contributor rules on [`Artifact`].

use async_trait::async_trait;
use chrono::Utc;
use lode_server_auth::{
	artifact::{Artifact, ArtifactKind},
	types::{ArtifactId, OrgId, UserId, WorkspaceId},
	validation::workspace_matches_org,
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::workspace::WorkspaceRepository;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
	async fn create_artifact(
		&self,
		artifact: &Artifact,
		caller_org: Option<OrgId>,
	) -> Result<(), StoreError>;
	async fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Artifact>, StoreError>;
	async fn list_sessions_for_user(
		&self,
		target: &UserId,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<Vec<Artifact>, StoreError>;
	async fn update_title(
		&self,
		id: &ArtifactId,
		title: &str,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<(), StoreError>;
	async fn delete_artifact(
		&self,
		id: &ArtifactId,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<bool, StoreError>;
}

/// Repository for artifact database operations.
///
/// `contributor_ids` is a JSON array column.
#[derive(Clone)]
pub struct ArtifactRepository {
	pool: SqlitePool,
}

impl ArtifactRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create an artifact.
	///
	/// # Errors
	/// Returns `StoreError::PermissionDenied` if the artifact is scoped to a
	/// workspace outside the caller's organization.
	#[tracing::instrument(skip(self, artifact), fields(artifact_id = %artifact.id, kind = %artifact.kind, user_id = %artifact.user_id))]
	pub async fn create_artifact(
		&self,
		artifact: &Artifact,
		caller_org: Option<OrgId>,
	) -> Result<(), StoreError> {
		if let Some(ws_id) = artifact.workspace_id {
			let workspace = WorkspaceRepository::new(self.pool.clone())
				.get_workspace(&ws_id)
				.await?
				.ok_or_else(|| StoreError::NotFound(format!("workspace {ws_id}")))?;
			if !workspace_matches_org(Some(workspace.organization_id), caller_org) {
				return Err(StoreError::PermissionDenied(
					"Workspace belongs to another organization".to_string(),
				));
			}
		}

		let contributor_ids = serde_json::to_string(&artifact.contributor_ids)?;
		sqlx::query(
			r#"
			INSERT INTO artifacts (id, kind, title, user_id, workspace_id, team_id, contributor_ids, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(artifact.id.to_string())
		.bind(artifact.kind.to_string())
		.bind(&artifact.title)
		.bind(artifact.user_id.to_string())
		.bind(artifact.workspace_id.map(|w| w.to_string()))
		.bind(&artifact.team_id)
		.bind(contributor_ids)
		.bind(artifact.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(artifact_id = %artifact.id, "artifact created");
		Ok(())
	}

	/// Get an artifact by ID.
	#[tracing::instrument(skip(self), fields(artifact_id = %id))]
	pub async fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Artifact>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, kind, title, user_id, workspace_id, team_id, contributor_ids, created_at
			FROM artifacts
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_artifact(&r)).transpose()
	}

	/// List a user's session artifacts, newest first.
	///
	/// # Errors
	/// Returns `StoreError::PermissionDenied` when a non-admin caller asks
	/// for another user's sessions.
	#[tracing::instrument(skip(self), fields(target = %target, caller = %caller, caller_is_admin))]
	pub async fn list_sessions_for_user(
		&self,
		target: &UserId,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<Vec<Artifact>, StoreError> {
		if target != caller && !caller_is_admin {
			return Err(StoreError::PermissionDenied(
				"Cannot list another user's sessions".to_string(),
			));
		}

		let rows = sqlx::query(
			r#"
			SELECT id, kind, title, user_id, workspace_id, team_id, contributor_ids, created_at
			FROM artifacts
			WHERE user_id = ? AND kind = 'session'
			ORDER BY created_at DESC
			"#,
		)
		.bind(target.to_string())
		.fetch_all(&self.pool)
		.await?;

		let sessions: Result<Vec<_>, _> = rows.iter().map(|r| self.row_to_artifact(r)).collect();
		let sessions = sessions?;
		tracing::debug!(target = %target, count = sessions.len(), "listed sessions");
		Ok(sessions)
	}

	/// Rename an artifact.
	///
	/// # Errors
	/// Returns `StoreError::PermissionDenied` unless the caller may modify
	/// the artifact (owner, admin, or contributor for themes and problem
	/// spaces).
	#[tracing::instrument(skip(self), fields(artifact_id = %id, caller = %caller))]
	pub async fn update_title(
		&self,
		id: &ArtifactId,
		title: &str,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<(), StoreError> {
		let artifact = self
			.get_artifact(id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("artifact {id}")))?;
		if !artifact.can_modify(caller, caller_is_admin) {
			return Err(StoreError::PermissionDenied(format!(
				"user {caller} may not modify artifact {id}"
			)));
		}

		sqlx::query(
			r#"
			UPDATE artifacts
			SET title = ?
			WHERE id = ?
			"#,
		)
		.bind(title)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(artifact_id = %id, "artifact renamed");
		Ok(())
	}

	/// Delete an artifact. Owner or admin only.
	///
	/// # Returns
	/// `true` if an artifact was deleted.
	#[tracing::instrument(skip(self), fields(artifact_id = %id, caller = %caller))]
	pub async fn delete_artifact(
		&self,
		id: &ArtifactId,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<bool, StoreError> {
		let Some(artifact) = self.get_artifact(id).await? else {
			return Ok(false);
		};
		if !artifact.can_delete(caller, caller_is_admin) {
			return Err(StoreError::PermissionDenied(format!(
				"user {caller} may not delete artifact {id}"
			)));
		}

		let result = sqlx::query(
			r#"
			DELETE FROM artifacts
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::debug!(artifact_id = %id, "artifact deleted");
		}
		Ok(deleted)
	}

	fn row_to_artifact(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Artifact, StoreError> {
		let id_str: String = row.get("id");
		let kind_str: String = row.get("kind");
		let workspace_id: Option<String> = row.get("workspace_id");
		let contributor_ids: String = row.get("contributor_ids");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| StoreError::Internal(format!("Invalid artifact ID: {e}")))?;
		let kind = ArtifactKind::parse(&kind_str)
			.ok_or_else(|| StoreError::Internal(format!("Invalid artifact kind: {kind_str}")))?;
		let workspace_id = workspace_id
			.map(|w| {
				Uuid::parse_str(&w)
					.map(WorkspaceId::new)
					.map_err(|e| StoreError::Internal(format!("Invalid workspace_id: {e}")))
			})
			.transpose()?;
		let contributor_ids: Vec<UserId> = serde_json::from_str(&contributor_ids)?;

		Ok(Artifact {
			id: ArtifactId::new(id),
			kind,
			title: row.get("title"),
			user_id: UserId::new(row.get::<String, _>("user_id")),
			workspace_id,
			team_id: row.get("team_id"),
			contributor_ids,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| StoreError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl ArtifactStore for ArtifactRepository {
	async fn create_artifact(
		&self,
		artifact: &Artifact,
		caller_org: Option<OrgId>,
	) -> Result<(), StoreError> {
		self.create_artifact(artifact, caller_org).await
	}

	async fn get_artifact(&self, id: &ArtifactId) -> Result<Option<Artifact>, StoreError> {
		self.get_artifact(id).await
	}

	async fn list_sessions_for_user(
		&self,
		target: &UserId,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<Vec<Artifact>, StoreError> {
		self
			.list_sessions_for_user(target, caller, caller_is_admin)
			.await
	}

	async fn update_title(
		&self,
		id: &ArtifactId,
		title: &str,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<(), StoreError> {
		self.update_title(id, title, caller, caller_is_admin).await
	}

	async fn delete_artifact(
		&self,
		id: &ArtifactId,
		caller: &UserId,
		caller_is_admin: bool,
	) -> Result<bool, StoreError> {
		self.delete_artifact(id, caller, caller_is_admin).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::org::{CreateOrganizationParams, OrgRepository, StoreSubdomainChecker};
	use crate::testing::create_full_test_pool;
	use crate::user::UserRepository;
	use lode_server_auth::profile::{StoredProfile, UserProfile};

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

	#[tokio::test]
	async fn test_create_and_get_artifact() {
		let pool = create_full_test_pool().await;
		let repo = ArtifactRepository::new(pool.clone());
		let owner = seed_user(&pool, "uid-owner").await;

		let artifact = Artifact::new(ArtifactKind::Session, "Interview 1", owner.clone());
		repo.create_artifact(&artifact, None).await.unwrap();

		let fetched = repo.get_artifact(&artifact.id).await.unwrap().unwrap();
		assert_eq!(fetched.id, artifact.id);
		assert_eq!(fetched.kind, ArtifactKind::Session);
		assert_eq!(fetched.title, "Interview 1");
		assert!(fetched.workspace_id.is_none());
	}

	#[tokio::test]
	async fn test_workspace_scoped_creation_checks_org() {
		let pool = create_full_test_pool().await;
		let repo = ArtifactRepository::new(pool.clone());
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
		let workspaces = WorkspaceRepository::new(pool.clone())
			.list_for_org(&org.id)
			.await
			.unwrap();
		let ws_id = workspaces[0].id;

		let artifact =
			Artifact::new(ArtifactKind::Project, "Q3", owner.clone()).with_workspace(ws_id);

		// caller in the right org
		repo.create_artifact(&artifact, Some(org.id)).await.unwrap();

		// caller in another org, or no org at all
		let other = Artifact::new(ArtifactKind::Project, "Q4", owner.clone()).with_workspace(ws_id);
		let result = repo.create_artifact(&other, Some(OrgId::generate())).await;
		assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
		let result = repo.create_artifact(&other, None).await;
		assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
	}

	#[tokio::test]
	async fn test_list_sessions_permission() {
		let pool = create_full_test_pool().await;
		let repo = ArtifactRepository::new(pool.clone());
		let owner = seed_user(&pool, "uid-owner").await;
		let other = seed_user(&pool, "uid-other").await;

		let session = Artifact::new(ArtifactKind::Session, "Interview 1", owner.clone());
		repo.create_artifact(&session, None).await.unwrap();
		let project = Artifact::new(ArtifactKind::Project, "Not a session", owner.clone());
		repo.create_artifact(&project, None).await.unwrap();

		// self
		let sessions = repo
			.list_sessions_for_user(&owner, &owner, false)
			.await
			.unwrap();
		assert_eq!(sessions.len(), 1);
		assert_eq!(sessions[0].kind, ArtifactKind::Session);

		// admin
		let sessions = repo
			.list_sessions_for_user(&owner, &other, true)
			.await
			.unwrap();
		assert_eq!(sessions.len(), 1);

		// stranger
		let result = repo.list_sessions_for_user(&owner, &other, false).await;
		assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
	}

	#[tokio::test]
	async fn test_update_title_respects_contributors() {
		let pool = create_full_test_pool().await;
		let repo = ArtifactRepository::new(pool.clone());
		let owner = seed_user(&pool, "uid-owner").await;
		let contributor = seed_user(&pool, "uid-contrib").await;

		let mut theme = Artifact::new(ArtifactKind::Theme, "Friction", owner.clone());
		theme.contributor_ids.push(contributor.clone());
		repo.create_artifact(&theme, None).await.unwrap();

		repo
			.update_title(&theme.id, "Onboarding friction", &contributor, false)
			.await
			.unwrap();
		let fetched = repo.get_artifact(&theme.id).await.unwrap().unwrap();
		assert_eq!(fetched.title, "Onboarding friction");

		// contributor on a session has no edit rights
		let mut session = Artifact::new(ArtifactKind::Session, "Interview", owner.clone());
		session.contributor_ids.push(contributor.clone());
		repo.create_artifact(&session, None).await.unwrap();
		let result = repo
			.update_title(&session.id, "Renamed", &contributor, false)
			.await;
		assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
	}

	#[tokio::test]
	async fn test_delete_is_owner_or_admin_only() {
		let pool = create_full_test_pool().await;
		let repo = ArtifactRepository::new(pool.clone());
		let owner = seed_user(&pool, "uid-owner").await;
		let contributor = seed_user(&pool, "uid-contrib").await;

		let mut theme = Artifact::new(ArtifactKind::Theme, "Friction", owner.clone());
		theme.contributor_ids.push(contributor.clone());
		repo.create_artifact(&theme, None).await.unwrap();

		let result = repo.delete_artifact(&theme.id, &contributor, false).await;
		assert!(matches!(result, Err(StoreError::PermissionDenied(_))));

		assert!(repo.delete_artifact(&theme.id, &owner, false).await.unwrap());
		assert!(repo.get_artifact(&theme.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_delete_missing_returns_false() {
		let pool = create_full_test_pool().await;
		let repo = ArtifactRepository::new(pool);
		let caller = UserId::new("uid-1");
		assert!(!repo
			.delete_artifact(&ArtifactId::generate(), &caller, true)
			.await
			.unwrap());
	}
}
