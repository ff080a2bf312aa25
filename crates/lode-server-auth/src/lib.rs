// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization and tenancy domain model for Lode.
//!
//! This crate is pure: entities, permission predicates, subdomain
//! validation, and the lazy profile schema upgrade. It performs no I/O;
//! persistence lives in `lode-server-db` and resolution in
//! `lode-server-session`.

pub mod artifact;
pub mod migrate;
pub mod org;
pub mod permissions;
pub mod profile;
pub mod types;
pub mod validation;

pub use artifact::{Artifact, ArtifactKind};
pub use migrate::upgrade_profile;
pub use org::{OrgJoinRequest, Organization, Workspace};
pub use permissions::PermissionSet;
pub use profile::{StoredProfile, UserProfile};
pub use types::{
	ArtifactId, JoinRequestId, JoinRequestStatus, OrgId, Role, SubscriptionStatus, Tier, UserId,
	WorkspaceId,
};
pub use validation::{derive_subdomain, is_subdomain_reserved, validate_subdomain, workspace_matches_org};
