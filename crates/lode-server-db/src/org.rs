// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization repository for database operations.
//!
//! This module provides database access for organization management including:
//! - Organization creation (subdomain derivation, default workspace, owner link)
//! - Organization lookup by ID, owner, and subdomain
//! - Organization updates, gated on owner/admin permission
//! - Subdomain availability checking with a store-backed fallback

use async_trait::async_trait;
use chrono::Utc;
use lode_server_auth::{
	org::{Organization, Workspace},
	types::{OrgId, SubscriptionStatus, Tier, UserId},
	validation::{derive_subdomain, validate_subdomain},
};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::StoreError;

/// Parameters for creating an organization.
#[derive(Debug, Clone)]
pub struct CreateOrganizationParams {
	/// Display name.
	pub name: String,
	/// Explicit subdomain; derived from the name when absent.
	pub subdomain: Option<String>,
}

/// Availability oracle for subdomains.
///
/// The primary implementation queries an external availability service; the
/// store falls back to its own uniqueness check when the oracle fails, so an
/// availability outage degrades to a weaker check instead of blocking signup.
#[async_trait]
pub trait SubdomainChecker: Send + Sync {
	/// Returns `true` if the subdomain is available.
	async fn is_available(&self, subdomain: &str) -> Result<bool, StoreError>;
}

/// Availability check backed by the organizations table itself.
#[derive(Clone)]
pub struct StoreSubdomainChecker {
	pool: SqlitePool,
}

impl StoreSubdomainChecker {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl SubdomainChecker for StoreSubdomainChecker {
	async fn is_available(&self, subdomain: &str) -> Result<bool, StoreError> {
		let row: (i64,) = sqlx::query_as(
			r#"
			SELECT COUNT(*) FROM organizations
			WHERE subdomain = ?
			"#,
		)
		.bind(subdomain)
		.fetch_one(&self.pool)
		.await?;

		Ok(row.0 == 0)
	}
}

#[async_trait]
pub trait OrgStore: Send + Sync {
	async fn create_organization(
		&self,
		params: CreateOrganizationParams,
		owner_id: &UserId,
		checker: &dyn SubdomainChecker,
	) -> Result<Organization, StoreError>;
	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, StoreError>;
	async fn get_org_by_owner(&self, owner_id: &UserId) -> Result<Option<Organization>, StoreError>;
	async fn get_org_by_subdomain(&self, subdomain: &str)
		-> Result<Option<Organization>, StoreError>;
	async fn update_org_name(
		&self,
		id: &OrgId,
		name: &str,
		caller: &UserId,
	) -> Result<(), StoreError>;
	async fn update_org_tier(
		&self,
		id: &OrgId,
		tier: Tier,
		caller: &UserId,
	) -> Result<Organization, StoreError>;
}

/// Repository for organization database operations.
///
/// All UUID-backed IDs are stored as strings in SQLite; user IDs are stored
/// as the opaque provider-issued strings.
#[derive(Clone)]
pub struct OrgRepository {
	pool: SqlitePool,
}

impl OrgRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create an organization with a default workspace and link the owner.
	///
	/// Derives a subdomain from the name when none is given, validates it,
	/// and confirms availability through `checker`. When the checker fails
	/// with a transport error the store's own uniqueness check is used
	/// instead.
	///
	/// The default "General" workspace and the owner profile link are applied
	/// after the organization row commits; a failure there is logged and the
	/// created organization is still returned, since resolution backfills the
	/// owner link on next load.
	///
	/// # Errors
	/// Returns `StoreError::Validation` for an invalid or taken subdomain.
	#[tracing::instrument(skip(self, params, checker), fields(owner_id = %owner_id, name = %params.name))]
	pub async fn create_organization(
		&self,
		params: CreateOrganizationParams,
		owner_id: &UserId,
		checker: &dyn SubdomainChecker,
	) -> Result<Organization, StoreError> {
		let subdomain = match params.subdomain {
			Some(s) => s,
			None => derive_subdomain(&params.name),
		};
		validate_subdomain(&subdomain).map_err(|e| StoreError::Validation(e.to_string()))?;

		let available = match checker.is_available(&subdomain).await {
			Ok(available) => available,
			Err(e) => {
				tracing::warn!(error = %e, subdomain = %subdomain, "subdomain checker failed, falling back to store uniqueness");
				StoreSubdomainChecker::new(self.pool.clone())
					.is_available(&subdomain)
					.await?
			}
		};
		if !available {
			return Err(StoreError::Validation(format!(
				"Subdomain '{subdomain}' is already taken"
			)));
		}

		let org = Organization::new(params.name, Some(subdomain), owner_id.clone());
		sqlx::query(
			r#"
			INSERT INTO organizations
				(id, name, subdomain, tier, owner_id, subscription_status, trial_ends_at, workspace_limit, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(org.id.to_string())
		.bind(&org.name)
		.bind(&org.subdomain)
		.bind(org.tier.to_string())
		.bind(org.owner_id.to_string())
		.bind(org.subscription_status.to_string())
		.bind(org.trial_ends_at.to_rfc3339())
		.bind(org.workspace_limit as i32)
		.bind(org.created_at.to_rfc3339())
		.bind(org.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::info!(org_id = %org.id, "organization created");

		if let Err(e) = self.link_owner_with_default_workspace(&org, owner_id).await {
			tracing::warn!(org_id = %org.id, owner_id = %owner_id, error = %e, "owner link after org creation failed");
		}

		Ok(org)
	}

	async fn link_owner_with_default_workspace(
		&self,
		org: &Organization,
		owner_id: &UserId,
	) -> Result<(), StoreError> {
		let workspace = Workspace::new(org.id, "General", owner_id.clone());
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

		let workspace_ids = serde_json::to_string(&vec![workspace.id])?;
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE users
			SET organization_id = ?, is_admin = 1, workspace_ids = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(org.id.to_string())
		.bind(&workspace_ids)
		.bind(&now)
		.bind(owner_id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %org.id, workspace_id = %workspace.id, "default workspace created and owner linked");
		Ok(())
	}

	/// Get an organization by ID.
	///
	/// # Returns
	/// `None` if no organization exists with this ID.
	#[tracing::instrument(skip(self), fields(org_id = %id))]
	pub async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, subdomain, tier, owner_id, subscription_status, trial_ends_at, workspace_limit, created_at, updated_at
			FROM organizations
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_org(&r)).transpose()
	}

	/// Get the organization owned by a user.
	///
	/// # Returns
	/// `None` if the user owns no organization. A user owns at most one.
	#[tracing::instrument(skip(self), fields(owner_id = %owner_id))]
	pub async fn get_org_by_owner(
		&self,
		owner_id: &UserId,
	) -> Result<Option<Organization>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, subdomain, tier, owner_id, subscription_status, trial_ends_at, workspace_limit, created_at, updated_at
			FROM organizations
			WHERE owner_id = ?
			LIMIT 1
			"#,
		)
		.bind(owner_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_org(&r)).transpose()
	}

	/// Get an organization by subdomain.
	#[tracing::instrument(skip(self), fields(subdomain = %subdomain))]
	pub async fn get_org_by_subdomain(
		&self,
		subdomain: &str,
	) -> Result<Option<Organization>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, subdomain, tier, owner_id, subscription_status, trial_ends_at, workspace_limit, created_at, updated_at
			FROM organizations
			WHERE subdomain = ?
			"#,
		)
		.bind(subdomain)
		.fetch_optional(&self.pool)
		.await?;

		let result = row.map(|r| self.row_to_org(&r)).transpose()?;
		if let Some(ref org) = result {
			tracing::debug!(org_id = %org.id, "organization found by subdomain");
		}
		Ok(result)
	}

	/// Rename an organization.
	///
	/// # Errors
	/// Returns `StoreError::PermissionDenied` unless the caller owns the
	/// organization or is one of its admins, `StoreError::NotFound` if the
	/// organization does not exist.
	#[tracing::instrument(skip(self), fields(org_id = %id, caller = %caller))]
	pub async fn update_org_name(
		&self,
		id: &OrgId,
		name: &str,
		caller: &UserId,
	) -> Result<(), StoreError> {
		let org = self
			.get_org_by_id(id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("organization {id}")))?;
		self.require_manage_permission(&org, caller).await?;

		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE organizations
			SET name = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(name)
		.bind(&now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %id, "organization renamed");
		Ok(())
	}

	/// Change an organization's tier.
	///
	/// The workspace limit is recomputed from the new tier. Existing
	/// workspaces above a lowered limit are kept; the limit only constrains
	/// new creation.
	///
	/// # Errors
	/// Returns `StoreError::PermissionDenied` unless the caller owns the
	/// organization or is one of its admins.
	#[tracing::instrument(skip(self), fields(org_id = %id, tier = %tier, caller = %caller))]
	pub async fn update_org_tier(
		&self,
		id: &OrgId,
		tier: Tier,
		caller: &UserId,
	) -> Result<Organization, StoreError> {
		let mut org = self
			.get_org_by_id(id)
			.await?
			.ok_or_else(|| StoreError::NotFound(format!("organization {id}")))?;
		self.require_manage_permission(&org, caller).await?;

		let now = Utc::now();
		sqlx::query(
			r#"
			UPDATE organizations
			SET tier = ?, workspace_limit = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(tier.to_string())
		.bind(tier.workspace_limit() as i32)
		.bind(now.to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		org.tier = tier;
		org.workspace_limit = tier.workspace_limit();
		org.updated_at = now;

		tracing::info!(org_id = %id, tier = %tier, "organization tier changed");
		Ok(org)
	}

	/// Require that the caller owns the organization or is one of its admins.
	pub(crate) async fn require_manage_permission(
		&self,
		org: &Organization,
		caller: &UserId,
	) -> Result<(), StoreError> {
		if org.is_owned_by(caller) {
			return Ok(());
		}

		let row = sqlx::query(
			r#"
			SELECT is_admin, organization_id FROM users
			WHERE id = ?
			"#,
		)
		.bind(caller.to_string())
		.fetch_optional(&self.pool)
		.await?;

		if let Some(row) = row {
			let is_admin: Option<i32> = row.get("is_admin");
			let org_id: Option<String> = row.get("organization_id");
			if is_admin.unwrap_or(0) != 0 && org_id.as_deref() == Some(&org.id.to_string()) {
				return Ok(());
			}
		}

		Err(StoreError::PermissionDenied(format!(
			"user {caller} may not manage organization {}",
			org.id
		)))
	}

	fn row_to_org(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Organization, StoreError> {
		let id_str: String = row.get("id");
		let tier_str: String = row.get("tier");
		let status_str: String = row.get("subscription_status");
		let workspace_limit: i32 = row.get("workspace_limit");
		let trial_ends_at: String = row.get("trial_ends_at");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| StoreError::Internal(format!("Invalid org ID: {e}")))?;
		let tier = Tier::parse(&tier_str)
			.ok_or_else(|| StoreError::Internal(format!("Invalid tier: {tier_str}")))?;
		let subscription_status = SubscriptionStatus::parse(&status_str)
			.ok_or_else(|| StoreError::Internal(format!("Invalid subscription status: {status_str}")))?;

		Ok(Organization {
			id: OrgId::new(id),
			name: row.get("name"),
			subdomain: row.get("subdomain"),
			tier,
			owner_id: UserId::new(row.get::<String, _>("owner_id")),
			subscription_status,
			trial_ends_at: chrono::DateTime::parse_from_rfc3339(&trial_ends_at)
				.map_err(|e| StoreError::Internal(format!("Invalid trial_ends_at: {e}")))?
				.with_timezone(&Utc),
			workspace_limit: workspace_limit as u32,
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
impl OrgStore for OrgRepository {
	async fn create_organization(
		&self,
		params: CreateOrganizationParams,
		owner_id: &UserId,
		checker: &dyn SubdomainChecker,
	) -> Result<Organization, StoreError> {
		self.create_organization(params, owner_id, checker).await
	}

	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, StoreError> {
		self.get_org_by_id(id).await
	}

	async fn get_org_by_owner(&self, owner_id: &UserId) -> Result<Option<Organization>, StoreError> {
		self.get_org_by_owner(owner_id).await
	}

	async fn get_org_by_subdomain(
		&self,
		subdomain: &str,
	) -> Result<Option<Organization>, StoreError> {
		self.get_org_by_subdomain(subdomain).await
	}

	async fn update_org_name(
		&self,
		id: &OrgId,
		name: &str,
		caller: &UserId,
	) -> Result<(), StoreError> {
		self.update_org_name(id, name, caller).await
	}

	async fn update_org_tier(
		&self,
		id: &OrgId,
		tier: Tier,
		caller: &UserId,
	) -> Result<Organization, StoreError> {
		self.update_org_tier(id, tier, caller).await
	}
}
