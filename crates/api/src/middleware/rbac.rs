//! Role-based access control with per-operation voter policies.
//!
//! Each protected [`Operation`] maps to a [`RolePolicy`]. Handlers call
//! [`authorize`] with the facts they know about the target resource; the
//! decision itself is made by [`warden_core::authz::decide_on`].

use std::collections::HashMap;

use warden_core::authz::{decide_on, Decision, DenyReason, ResourceContext, RolePolicy, Vote, Voter};
use warden_core::principal::Principal;
use warden_core::roles::{ROLE_ADMIN, ROLE_USER};

use super::auth::AuthUser;
use crate::error::AppResult;
use crate::state::AppState;

/// Operations guarded by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ViewSelf,
    ListUsers,
    ViewUser,
    ChangePassword,
    ChangeRole,
}

/// Policies keyed by operation. Operations without a policy are denied.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: HashMap<Operation, RolePolicy>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, operation: Operation, policy: RolePolicy) -> Self {
        self.policies.insert(operation, policy);
        self
    }

    pub fn get(&self, operation: Operation) -> Option<&RolePolicy> {
        self.policies.get(&operation)
    }

    pub fn decide(
        &self,
        operation: Operation,
        principal: &Principal,
        ctx: &ResourceContext,
    ) -> Decision {
        match self.get(operation) {
            Some(policy) => decide_on(principal, policy, ctx),
            None => {
                tracing::warn!(?operation, "No policy registered, denying");
                Decision::Deny(DenyReason::RoleNotAllowed)
            }
        }
    }
}

/// Deny when the principal targets itself; abstain otherwise.
fn not_self(principal: &Principal, ctx: &ResourceContext) -> Vote {
    match &ctx.owner_subject_id {
        Some(target) if *target == principal.subject_id => Vote::Deny,
        _ => Vote::Abstain,
    }
}

/// The policies served by the HTTP API.
///
/// ```text
/// ViewSelf        admin, user
/// ListUsers       admin
/// ViewUser        admin, user   [allow admin] [owner only]
/// ChangePassword  admin, user   [owner only]
/// ChangeRole      admin         [not self]
/// ```
pub fn default_policies() -> PolicySet {
    PolicySet::new()
        .with(Operation::ViewSelf, RolePolicy::allow([ROLE_ADMIN, ROLE_USER]))
        .with(Operation::ListUsers, RolePolicy::allow([ROLE_ADMIN]))
        .with(
            Operation::ViewUser,
            RolePolicy::allow([ROLE_ADMIN, ROLE_USER])
                .with_voter(Voter::allow_roles([ROLE_ADMIN]))
                .with_voter(Voter::OwnerOnly),
        )
        .with(
            Operation::ChangePassword,
            RolePolicy::allow([ROLE_ADMIN, ROLE_USER]).with_voter(Voter::OwnerOnly),
        )
        .with(
            Operation::ChangeRole,
            RolePolicy::allow([ROLE_ADMIN]).with_voter(Voter::predicate("not_self", not_self)),
        )
}

/// Authorize `user` for `operation` on the resource described by `ctx`.
pub fn authorize(
    state: &AppState,
    user: &AuthUser,
    operation: Operation,
    ctx: &ResourceContext,
) -> AppResult<()> {
    state
        .policies
        .decide(operation, &user.principal, ctx)
        .into_result()
        .map_err(|e| {
            tracing::info!(
                user_id = user.user_id,
                ?operation,
                reason = %e,
                "Authorization denied"
            );
            e.into()
        })
}
