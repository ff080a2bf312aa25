// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile schema upgrade.
//!
//! Earlier versions of the product persisted role values `researcher`,
//! `contributor`, and `admin`, and had no separate admin flag. The current
//! shape is `{role: member, is_admin: bool}`. [`upgrade_profile`] normalizes
//! a stored profile into that shape; it is pure and idempotent, and the
//! caller persists the result when the returned flag reports a change.
//! This is a lazy, self-healing migration run on load, not a batch job.

use crate::profile::{StoredProfile, UserProfile};
use crate::types::Role;

/// Role values that have appeared in persisted profiles over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyRole {
	Researcher,
	Contributor,
	Admin,
	Member,
	/// Empty, missing, or unrecognized.
	Unknown,
}

impl LegacyRole {
	fn parse(s: &str) -> LegacyRole {
		match s {
			"researcher" => LegacyRole::Researcher,
			"contributor" => LegacyRole::Contributor,
			"admin" => LegacyRole::Admin,
			"member" => LegacyRole::Member,
			_ => LegacyRole::Unknown,
		}
	}
}

/// Normalizes a stored profile into the current shape.
///
/// Mapping:
/// - `researcher` / `contributor` → `{member, is_admin: false}`
/// - `admin` → `{member, is_admin: true}`
/// - `member` with a missing admin flag → `{member, is_admin: false}`
/// - unknown or empty role strings → `{member, is_admin: false}`, dropping
///   any stored admin flag: an unrecognized role is not trusted to carry
///   elevated access
///
/// Returns the upgraded profile and whether any field changed. Applying the
/// upgrade to an already-current profile returns it unchanged with `false`.
pub fn upgrade_profile(stored: &StoredProfile) -> (UserProfile, bool) {
	let is_admin = match LegacyRole::parse(&stored.role) {
		LegacyRole::Researcher | LegacyRole::Contributor => false,
		LegacyRole::Admin => true,
		LegacyRole::Member => stored.is_admin.unwrap_or(false),
		LegacyRole::Unknown => false,
	};

	let changed = stored.role != Role::Member.to_string() || stored.is_admin != Some(is_admin);

	let profile = UserProfile {
		id: stored.id.clone(),
		email: stored.email.clone(),
		role: Role::Member,
		is_admin,
		organization_id: stored.organization_id,
		workspace_ids: stored.workspace_ids.clone(),
		created_at: stored.created_at,
		updated_at: stored.updated_at,
	};

	(profile, changed)
}
