//! Role-based authorization with composable voters.
//!
//! A [`RolePolicy`] pairs a coarse allow-list of roles with an ordered list of
//! [`Voter`]s. [`decide`] first checks the role; if it is allowed, voters are
//! consulted in order and the first non-[`Vote::Abstain`] vote is final. When
//! every voter abstains the role check stands.
//!
//! Voters are a closed set of pure decision functions. A voter that depends on
//! external state (e.g. who owns a resource) reads it from the
//! [`ResourceContext`]; a failed lookup leaves the owner unknown and the voter
//! abstains rather than allowing.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::AuthError;
use crate::principal::Principal;

// ---------------------------------------------------------------------------
// Votes and decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Allow,
    Deny,
    Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The principal's role is not in the policy's allow-list.
    RoleNotAllowed,
    /// A voter denied; carries the voter's name.
    Voter(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::RoleNotAllowed) => Err(AuthError::RoleNotAllowed),
            Decision::Deny(DenyReason::Voter(name)) => Err(AuthError::VoterDenied(name)),
        }
    }
}

// ---------------------------------------------------------------------------
// Resource context
// ---------------------------------------------------------------------------

/// Per-request facts about the resource being acted on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceContext {
    /// Subject id of the resource owner, when known.
    pub owner_subject_id: Option<String>,
}

impl ResourceContext {
    /// No resource facts; owner-dependent voters abstain.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owner_subject_id: Some(owner.into()),
        }
    }

    /// Build a context from the outcome of an ownership lookup.
    ///
    /// A failed lookup yields an unknown owner, never an implicit match.
    pub fn from_lookup<E: fmt::Display>(lookup: Result<Option<String>, E>) -> Self {
        match lookup {
            Ok(owner) => Self {
                owner_subject_id: owner,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Ownership lookup failed, owner treated as unknown");
                Self::none()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Voters
// ---------------------------------------------------------------------------

/// Signature of a named predicate voter. Must be side-effect free.
pub type VoteFn = fn(&Principal, &ResourceContext) -> Vote;

#[derive(Debug, Clone)]
pub enum Voter {
    /// Always returns the same vote.
    Constant(Vote),
    /// Allow when the principal holds one of these roles, otherwise abstain.
    AllowRoles(BTreeSet<String>),
    /// Deny when the principal holds one of these roles, otherwise abstain.
    DenyRoles(BTreeSet<String>),
    /// Allow the resource owner, deny everyone else, abstain if the owner is unknown.
    OwnerOnly,
    /// A named pure function.
    Predicate { name: &'static str, vote: VoteFn },
}

impl Voter {
    pub fn allow_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Voter::AllowRoles(roles.into_iter().map(Into::into).collect())
    }

    pub fn deny_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Voter::DenyRoles(roles.into_iter().map(Into::into).collect())
    }

    pub fn predicate(name: &'static str, vote: VoteFn) -> Self {
        Voter::Predicate { name, vote }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Voter::Constant(Vote::Allow) => "always_allow",
            Voter::Constant(Vote::Deny) => "always_deny",
            Voter::Constant(Vote::Abstain) => "always_abstain",
            Voter::AllowRoles(_) => "allow_roles",
            Voter::DenyRoles(_) => "deny_roles",
            Voter::OwnerOnly => "owner_only",
            Voter::Predicate { name, .. } => *name,
        }
    }

    pub fn vote(&self, principal: &Principal, ctx: &ResourceContext) -> Vote {
        match self {
            Voter::Constant(vote) => *vote,
            Voter::AllowRoles(roles) if roles.contains(&principal.role) => Vote::Allow,
            Voter::DenyRoles(roles) if roles.contains(&principal.role) => Vote::Deny,
            Voter::AllowRoles(_) | Voter::DenyRoles(_) => Vote::Abstain,
            Voter::OwnerOnly => match &ctx.owner_subject_id {
                Some(owner) if *owner == principal.subject_id => Vote::Allow,
                Some(_) => Vote::Deny,
                None => Vote::Abstain,
            },
            Voter::Predicate { vote, .. } => vote(principal, ctx),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Allowed roles plus ordered voters for one protected operation.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    allowed_roles: BTreeSet<String>,
    voters: Vec<Voter>,
}

impl RolePolicy {
    pub fn allow<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_roles: roles.into_iter().map(Into::into).collect(),
            voters: Vec::new(),
        }
    }

    /// Append a voter; voters run in insertion order.
    pub fn with_voter(mut self, voter: Voter) -> Self {
        self.voters.push(voter);
        self
    }

    pub fn allowed_roles(&self) -> &BTreeSet<String> {
        &self.allowed_roles
    }

    pub fn voters(&self) -> &[Voter] {
        &self.voters
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Decide with no resource facts.
pub fn decide(principal: &Principal, policy: &RolePolicy) -> Decision {
    decide_on(principal, policy, &ResourceContext::none())
}

/// Decide whether `principal` may perform the operation guarded by `policy`.
///
/// - No IO
/// - No panics
pub fn decide_on(principal: &Principal, policy: &RolePolicy, ctx: &ResourceContext) -> Decision {
    if !policy.allowed_roles.contains(&principal.role) {
        tracing::debug!(
            subject = %principal.subject_id,
            role = %principal.role,
            "Role not allowed"
        );
        return Decision::Deny(DenyReason::RoleNotAllowed);
    }

    for voter in &policy.voters {
        match voter.vote(principal, ctx) {
            Vote::Abstain => continue,
            Vote::Allow => return Decision::Allow,
            Vote::Deny => {
                tracing::debug!(
                    subject = %principal.subject_id,
                    voter = voter.name(),
                    "Voter denied"
                );
                return Decision::Deny(DenyReason::Voter(voter.name()));
            }
        }
    }

    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Principal {
        Principal::new("1", "admin")
    }

    fn user(id: &str) -> Principal {
        Principal::new(id, "user")
    }

    #[test]
    fn role_outside_allow_list_is_denied() {
        let policy = RolePolicy::allow(["admin"]);
        assert_eq!(
            decide(&user("2"), &policy),
            Decision::Deny(DenyReason::RoleNotAllowed)
        );
    }

    #[test]
    fn allowed_role_with_no_voters_is_allowed() {
        let policy = RolePolicy::allow(["admin"]);
        assert_eq!(decide(&admin(), &policy), Decision::Allow);
    }

    #[test]
    fn denying_voter_overrides_role_allow() {
        let policy = RolePolicy::allow(["admin"]).with_voter(Voter::Constant(Vote::Deny));
        assert_eq!(
            decide(&admin(), &policy),
            Decision::Deny(DenyReason::Voter("always_deny"))
        );
    }

    #[test]
    fn voters_cannot_rescue_a_disallowed_role() {
        let policy = RolePolicy::allow(["admin"]).with_voter(Voter::Constant(Vote::Allow));
        assert_eq!(
            decide(&user("2"), &policy),
            Decision::Deny(DenyReason::RoleNotAllowed)
        );
    }

    #[test]
    fn first_non_abstain_vote_wins() {
        let policy = RolePolicy::allow(["user"])
            .with_voter(Voter::Constant(Vote::Abstain))
            .with_voter(Voter::Constant(Vote::Allow))
            .with_voter(Voter::Constant(Vote::Deny));
        assert_eq!(decide(&user("2"), &policy), Decision::Allow);
    }

    #[test]
    fn all_abstain_keeps_role_decision() {
        let policy = RolePolicy::allow(["user"])
            .with_voter(Voter::Constant(Vote::Abstain))
            .with_voter(Voter::OwnerOnly);
        assert_eq!(decide(&user("2"), &policy), Decision::Allow);
    }

    #[test]
    fn owner_only_allows_owner_and_denies_others() {
        let policy = RolePolicy::allow(["user"]).with_voter(Voter::OwnerOnly);
        let ctx = ResourceContext::owned_by("7");

        assert_eq!(decide_on(&user("7"), &policy, &ctx), Decision::Allow);
        assert_eq!(
            decide_on(&user("8"), &policy, &ctx),
            Decision::Deny(DenyReason::Voter("owner_only"))
        );
    }

    #[test]
    fn admin_bypass_precedes_owner_check() {
        let policy = RolePolicy::allow(["admin", "user"])
            .with_voter(Voter::allow_roles(["admin"]))
            .with_voter(Voter::OwnerOnly);
        let ctx = ResourceContext::owned_by("7");

        assert_eq!(decide_on(&admin(), &policy, &ctx), Decision::Allow);
        assert!(!decide_on(&user("8"), &policy, &ctx).is_allowed());
    }

    #[test]
    fn deny_roles_only_fires_for_listed_roles() {
        let policy = RolePolicy::allow(["admin", "user"]).with_voter(Voter::deny_roles(["user"]));
        assert!(decide(&admin(), &policy).is_allowed());
        assert_eq!(
            decide(&user("2"), &policy),
            Decision::Deny(DenyReason::Voter("deny_roles"))
        );
    }

    #[test]
    fn failed_lookup_abstains_instead_of_allowing() {
        let ctx = ResourceContext::from_lookup::<&str>(Err("store down"));
        assert_eq!(ctx, ResourceContext::none());

        // With a deny fallback after the owner check, an unknown owner must not allow.
        let policy = RolePolicy::allow(["user"])
            .with_voter(Voter::OwnerOnly)
            .with_voter(Voter::Constant(Vote::Deny));
        assert!(!decide_on(&user("7"), &policy, &ctx).is_allowed());
    }

    #[test]
    fn predicate_voter_receives_context() {
        fn not_self(principal: &Principal, ctx: &ResourceContext) -> Vote {
            match &ctx.owner_subject_id {
                Some(owner) if *owner == principal.subject_id => Vote::Deny,
                _ => Vote::Abstain,
            }
        }

        let policy = RolePolicy::allow(["admin"]).with_voter(Voter::predicate("not_self", not_self));
        assert_eq!(
            decide_on(&admin(), &policy, &ResourceContext::owned_by("1")),
            Decision::Deny(DenyReason::Voter("not_self"))
        );
        assert!(decide_on(&admin(), &policy, &ResourceContext::owned_by("2")).is_allowed());
    }

    #[test]
    fn decision_converts_to_auth_error() {
        assert_eq!(Decision::Allow.into_result(), Ok(()));
        assert_eq!(
            Decision::Deny(DenyReason::RoleNotAllowed).into_result(),
            Err(AuthError::RoleNotAllowed)
        );
        assert_eq!(
            Decision::Deny(DenyReason::Voter("owner_only")).into_result(),
            Err(AuthError::VoterDenied("owner_only"))
        );
    }
}
