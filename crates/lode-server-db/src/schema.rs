// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema bootstrap and index declarations.
//!
//! All tables and indexes are declared here, in one place, so the set of
//! indexes the query layer relies on is visible and checkable. Startup calls
//! [`init_schema`] followed by [`verify_indexes`]; a missing index is a
//! deployment error, not a silent performance cliff.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::StoreError;

/// Indexes the repositories depend on for their hot queries.
///
/// Each entry is `(index_name, create_statement)`. [`verify_indexes`] checks
/// the names against `sqlite_master` after schema initialization.
pub const REQUIRED_INDEXES: &[(&str, &str)] = &[
	(
		"idx_organizations_owner_id",
		"CREATE INDEX IF NOT EXISTS idx_organizations_owner_id ON organizations(owner_id)",
	),
	(
		"idx_organizations_subdomain",
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_organizations_subdomain ON organizations(subdomain) WHERE subdomain IS NOT NULL",
	),
	(
		"idx_workspaces_organization_id",
		"CREATE INDEX IF NOT EXISTS idx_workspaces_organization_id ON workspaces(organization_id)",
	),
	(
		"idx_join_requests_user_status",
		"CREATE INDEX IF NOT EXISTS idx_join_requests_user_status ON org_join_requests(user_id, status)",
	),
	(
		"idx_join_requests_org_status",
		"CREATE INDEX IF NOT EXISTS idx_join_requests_org_status ON org_join_requests(organization_id, status)",
	),
	(
		"idx_artifacts_user_kind",
		"CREATE INDEX IF NOT EXISTS idx_artifacts_user_kind ON artifacts(user_id, kind)",
	),
];

/// Create all tables and indexes if they do not exist.
///
/// Idempotent; safe to call on every startup.
#[tracing::instrument(skip(pool))]
pub async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS users (
			id TEXT PRIMARY KEY,
			email TEXT NOT NULL,
			role TEXT NOT NULL,
			is_admin INTEGER,
			organization_id TEXT,
			workspace_ids TEXT NOT NULL DEFAULT '[]',
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS organizations (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			subdomain TEXT,
			tier TEXT NOT NULL,
			owner_id TEXT NOT NULL,
			subscription_status TEXT NOT NULL,
			trial_ends_at TEXT NOT NULL,
			workspace_limit INTEGER NOT NULL,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS workspaces (
			id TEXT PRIMARY KEY,
			name TEXT NOT NULL,
			organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
			created_by TEXT NOT NULL,
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS org_join_requests (
			id TEXT PRIMARY KEY,
			organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
			user_id TEXT NOT NULL,
			status TEXT NOT NULL DEFAULT 'pending',
			created_at TEXT NOT NULL,
			responded_at TEXT,
			responded_by TEXT
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS artifacts (
			id TEXT PRIMARY KEY,
			kind TEXT NOT NULL,
			title TEXT NOT NULL,
			user_id TEXT NOT NULL,
			workspace_id TEXT,
			team_id TEXT,
			contributor_ids TEXT NOT NULL DEFAULT '[]',
			created_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	for (name, statement) in REQUIRED_INDEXES {
		sqlx::query(statement).execute(pool).await?;
		tracing::trace!(index = name, "index ensured");
	}

	tracing::debug!("schema initialized");
	Ok(())
}

/// Verify that every declared index exists.
///
/// # Errors
/// Returns `StoreError::Internal` naming the first missing index.
#[tracing::instrument(skip(pool))]
pub async fn verify_indexes(pool: &SqlitePool) -> Result<(), StoreError> {
	for (name, _) in REQUIRED_INDEXES {
		let row = sqlx::query(
			r#"
			SELECT name FROM sqlite_master
			WHERE type = 'index' AND name = ?
			"#,
		)
		.bind(name)
		.fetch_optional(pool)
		.await?;

		if row.is_none() {
			return Err(StoreError::Internal(format!("Missing required index: {name}")));
		}
		let found: String = row.map(|r| r.get("name")).unwrap_or_default();
		tracing::trace!(index = %found, "index verified");
	}

	tracing::debug!(count = REQUIRED_INDEXES.len(), "all required indexes present");
	Ok(())
}
