// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Research artifact types.
//!
//! Artifacts are the resources whose access the authorization layer gates:
//! interview sessions, projects, and themes/problem spaces. Each carries an
//! owner, an optional workspace scope, and an optional team tag; themes and
//! problem spaces additionally carry contributors who may modify them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ArtifactId, UserId, WorkspaceId};

/// Kinds of research artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
	/// An uploaded interview session (transcript plus annotations).
	Session,
	/// A project grouping sessions and nuggets.
	Project,
	/// A theme clustering related nuggets.
	Theme,
	/// A problem space clustering related themes.
	ProblemSpace,
}

impl ArtifactKind {
	/// Parse a kind from its stored string form.
	pub fn parse(s: &str) -> Option<ArtifactKind> {
		match s {
			"session" => Some(ArtifactKind::Session),
			"project" => Some(ArtifactKind::Project),
			"theme" => Some(ArtifactKind::Theme),
			"problem_space" => Some(ArtifactKind::ProblemSpace),
			_ => None,
		}
	}

	/// True for kinds that support contributor-based editing.
	pub fn supports_contributors(&self) -> bool {
		matches!(self, ArtifactKind::Theme | ArtifactKind::ProblemSpace)
	}
}

impl std::fmt::Display for ArtifactKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ArtifactKind::Session => write!(f, "session"),
			ArtifactKind::Project => write!(f, "project"),
			ArtifactKind::Theme => write!(f, "theme"),
			ArtifactKind::ProblemSpace => write!(f, "problem_space"),
		}
	}
}

/// A research artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
	/// Unique identifier for this artifact.
	pub id: ArtifactId,

	/// What kind of artifact this is.
	pub kind: ArtifactKind,

	/// Display title.
	pub title: String,

	/// The owning user.
	pub user_id: UserId,

	/// The workspace scoping this artifact, if any.
	pub workspace_id: Option<WorkspaceId>,

	/// Free-form team tag, if any.
	pub team_id: Option<String>,

	/// Users other than the owner who may modify this artifact.
	/// Only meaningful for themes and problem spaces.
	pub contributor_ids: Vec<UserId>,

	/// When the artifact was created.
	pub created_at: DateTime<Utc>,
}

impl Artifact {
	/// Creates a new artifact owned by the given user.
	pub fn new(kind: ArtifactKind, title: impl Into<String>, user_id: UserId) -> Self {
		Self {
			id: ArtifactId::generate(),
			kind,
			title: title.into(),
			user_id,
			workspace_id: None,
			team_id: None,
			contributor_ids: Vec::new(),
			created_at: Utc::now(),
		}
	}

	/// Builder: scope to a workspace.
	pub fn with_workspace(mut self, workspace_id: WorkspaceId) -> Self {
		self.workspace_id = Some(workspace_id);
		self
	}

	/// Builder: tag with a team.
	pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
		self.team_id = Some(team_id.into());
		self
	}

	/// True if the caller may modify this artifact.
	///
	/// The owner and admins always may; contributors may for kinds that
	/// support them.
	pub fn can_modify(&self, caller: &UserId, is_admin: bool) -> bool {
		if is_admin || &self.user_id == caller {
			return true;
		}
		self.kind.supports_contributors() && self.contributor_ids.contains(caller)
	}

	/// True if the caller may delete this artifact.
	///
	/// Deletion is owner-or-admin only; contributors cannot delete.
	pub fn can_delete(&self, caller: &UserId, is_admin: bool) -> bool {
		is_admin || &self.user_id == caller
	}
}
