// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session resolution and reactive auth context for Lode.
//!
//! Bridges the identity provider and the stores: when a sign-in lands, the
//! background task in [`SessionContext`] resolves the user's profile,
//! organization link, and workspaces, and publishes the result through a
//! watch channel. Profile bootstrapping and the legacy role upgrade happen
//! here, on every resolution.

pub mod context;
pub mod identity;
pub mod resolve;

pub use context::{SessionContext, SessionError};
pub use identity::{ChannelIdentityProvider, Identity, IdentityProvider};
pub use resolve::{
	resolve_session, MembershipStatus, ResolvedSession, SessionState, SessionStores,
};
