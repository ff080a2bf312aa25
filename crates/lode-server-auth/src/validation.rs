// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation helpers.
//!
//! This module provides:
//! - subdomain validation and derivation for organization creation
//! - the cross-entity check that a resource's workspace belongs to the
//!   caller's organization

use crate::types::OrgId;

/// Reserved subdomains that cannot be claimed by organizations.
/// These are reserved for system use or could cause confusion.
pub const RESERVED_SUBDOMAINS: &[&str] = &[
	// System/admin
	"admin",
	"administrator",
	"root",
	"system",
	"support",
	"help",
	"security",
	"abuse",
	"noreply",
	"no-reply",
	// Product surfaces
	"lode",
	"api",
	"app",
	"auth",
	"login",
	"logout",
	"signup",
	"register",
	"settings",
	"account",
	"billing",
	"docs",
	"status",
	// Web/static
	"www",
	"web",
	"static",
	"assets",
	"cdn",
	"mail",
	"blog",
	// Misc reserved
	"test",
	"demo",
	"example",
	"null",
	"undefined",
];

/// Check if a subdomain is reserved.
pub fn is_subdomain_reserved(subdomain: &str) -> bool {
	let lower = subdomain.to_lowercase();
	RESERVED_SUBDOMAINS.iter().any(|&reserved| reserved == lower)
}

/// Validates a subdomain.
/// Rules:
/// - 3-50 characters
/// - Lowercase letters, digits, and hyphens only
/// - Cannot start or end with a hyphen
/// - Cannot be a reserved subdomain
pub fn validate_subdomain(subdomain: &str) -> Result<(), &'static str> {
	if subdomain.len() < 3 {
		return Err("Subdomain must be at least 3 characters");
	}
	if subdomain.len() > 50 {
		return Err("Subdomain must be at most 50 characters");
	}
	if !subdomain
		.chars()
		.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
	{
		return Err("Subdomain can only contain lowercase letters, numbers, and hyphens");
	}
	if subdomain.starts_with('-') {
		return Err("Subdomain cannot start with a hyphen");
	}
	if subdomain.ends_with('-') {
		return Err("Subdomain cannot end with a hyphen");
	}
	if is_subdomain_reserved(subdomain) {
		return Err("This subdomain is reserved");
	}
	Ok(())
}

/// Derives a candidate subdomain from an organization name.
/// Lowercases, replaces runs of non-alphanumeric characters with a single
/// hyphen, and pads or truncates into the valid length range.
pub fn derive_subdomain(name: &str) -> String {
	let sanitized: String = name
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() {
				c.to_ascii_lowercase()
			} else {
				'-'
			}
		})
		.collect();

	let collapsed: String = sanitized
		.split('-')
		.filter(|s| !s.is_empty())
		.collect::<Vec<_>>()
		.join("-");

	let mut candidate = if collapsed.len() < 3 {
		format!("org-{}", collapsed)
	} else if collapsed.len() > 50 {
		collapsed[..50].to_string()
	} else {
		collapsed
	};

	while candidate.ends_with('-') {
		candidate.pop();
	}
	candidate
}

/// Checks that a resource's workspace belongs to the caller's organization.
///
/// A resource with no workspace is not constrained by this rule. A resource
/// whose workspace sits in another organization, or whose caller has no
/// organization at all, is denied regardless of other checks.
pub fn workspace_matches_org(
	resource_workspace_org: Option<OrgId>,
	caller_org: Option<OrgId>,
) -> bool {
	match resource_workspace_org {
		None => true,
		Some(org_id) => caller_org == Some(org_id),
	}
}
