// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Lode authorization layer.
//!
//! Each entity gets a repository over a shared [`sqlx::SqlitePool`], fronted
//! by an `async_trait` store trait so the resolution layer can be tested
//! against fakes. Timestamps are stored as RFC3339 strings; list-valued
//! columns are JSON arrays.

pub mod artifact;
pub mod error;
pub mod join_request;
pub mod org;
pub mod pool;
pub mod schema;
pub mod testing;
pub mod user;
pub mod workspace;

pub use artifact::{ArtifactRepository, ArtifactStore};
pub use error::{Result, StoreError};
pub use join_request::{JoinRequestRepository, JoinRequestStore};
pub use org::{
	CreateOrganizationParams, OrgRepository, OrgStore, StoreSubdomainChecker, SubdomainChecker,
};
pub use pool::create_pool;
pub use schema::{init_schema, verify_indexes, REQUIRED_INDEXES};
pub use user::{ProfileStore, UserRepository};
pub use workspace::{WorkspaceRepository, WorkspaceStore};
