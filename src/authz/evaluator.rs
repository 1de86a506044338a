use super::condition::{AccessCondition, ConditionContext};
use super::permission::{role_has_permission, Permission};
use super::role::Role;
use crate::repository::UserAccount;
use crate::AuthError;

/// A single access check: roles, permissions, conditions, and (optionally)
/// the organization that owns the target resource.
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    /// Role check passes if the user's granted set intersects this list.
    /// Empty means no role requirement.
    pub required_roles: Vec<Role>,
    /// Every listed permission must be in the user's permission table row.
    pub required_permissions: Vec<Permission>,
    /// Every listed condition must evaluate to true.
    pub conditions: Vec<AccessCondition>,
    /// Organization owning the target resource; non-admins must match it.
    pub resource_organization: Option<i64>,
}

/// The specifics of a denied check, for audit logging.
///
/// This never reaches the caller-facing error, which is a bare `Forbidden`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessDenial {
    pub missing_roles: Vec<Role>,
    pub missing_permissions: Vec<Permission>,
    pub failed_conditions: Vec<&'static str>,
    pub organization_mismatch: bool,
}

impl AccessDenial {
    pub fn is_denied(&self) -> bool {
        !self.missing_roles.is_empty()
            || !self.missing_permissions.is_empty()
            || !self.failed_conditions.is_empty()
            || self.organization_mismatch
    }
}

/// Evaluates access requests against the role hierarchy, the permission
/// table, organization scoping, and conditional predicates.
///
/// Checks are pure and lock-free; the evaluator holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionEvaluator;

impl PermissionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Runs every check and collects all failures rather than stopping at
    /// the first, so the denial log carries the complete picture.
    pub fn evaluate(
        &self,
        user: &UserAccount,
        request: &AccessRequest,
        ctx: &ConditionContext,
    ) -> Result<(), AccessDenial> {
        let mut denial = AccessDenial::default();

        if !request.required_roles.is_empty() && !user.role.has_role(&request.required_roles) {
            denial.missing_roles = request.required_roles.clone();
        }

        for permission in &request.required_permissions {
            if !role_has_permission(user.role, *permission) {
                denial.missing_permissions.push(*permission);
            }
        }

        if let Some(resource_org) = request.resource_organization {
            if !user.role.bypasses_org_scope() && user.organization_id != Some(resource_org) {
                denial.organization_mismatch = true;
            }
        }

        for condition in &request.conditions {
            if !condition.evaluate(user, ctx) {
                denial.failed_conditions.push(condition.name());
            }
        }

        if denial.is_denied() {
            Err(denial)
        } else {
            Ok(())
        }
    }

    /// Like [`evaluate`](Self::evaluate), but logs the denial detail and
    /// collapses it to the generic `Forbidden` for the caller.
    pub fn check(
        &self,
        user: &UserAccount,
        request: &AccessRequest,
        ctx: &ConditionContext,
    ) -> Result<(), AuthError> {
        self.evaluate(user, request, ctx).map_err(|denial| {
            log::warn!(
                target: "palisade_authz",
                "msg=\"access_denied\" user_id={} role={} missing_roles={:?} missing_permissions={:?} failed_conditions={:?} org_mismatch={}",
                user.id,
                user.role,
                denial.missing_roles,
                denial.missing_permissions,
                denial.failed_conditions,
                denial.organization_mismatch,
            );
            AuthError::Forbidden
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::AccountStatus;

    fn user(role: Role, org: Option<i64>) -> UserAccount {
        let mut user = UserAccount::fixture(7, "user@example.com", role);
        user.organization_id = org;
        user.status = AccountStatus::Active;
        user
    }

    #[test]
    fn test_role_check() {
        let evaluator = PermissionEvaluator::new();
        let request = AccessRequest {
            required_roles: vec![Role::Instructor],
            ..Default::default()
        };
        let ctx = ConditionContext::default();

        assert!(evaluator
            .evaluate(&user(Role::Admin, None), &request, &ctx)
            .is_ok());

        let denial = evaluator
            .evaluate(&user(Role::Student, None), &request, &ctx)
            .unwrap_err();
        assert_eq!(denial.missing_roles, vec![Role::Instructor]);
    }

    #[test]
    fn test_permission_check_is_flat_lookup() {
        let evaluator = PermissionEvaluator::new();
        let request = AccessRequest {
            required_permissions: vec![Permission::CourseDelete],
            ..Default::default()
        };
        let ctx = ConditionContext::default();

        // Instructor passes the coarse role check for Student-level things but
        // has no CourseDelete in the table.
        let denial = evaluator
            .evaluate(&user(Role::Instructor, None), &request, &ctx)
            .unwrap_err();
        assert_eq!(denial.missing_permissions, vec![Permission::CourseDelete]);

        assert!(evaluator
            .evaluate(&user(Role::OrgAdmin, None), &request, &ctx)
            .is_ok());
    }

    #[test]
    fn test_org_scoping() {
        let evaluator = PermissionEvaluator::new();
        let request = AccessRequest {
            resource_organization: Some(42),
            ..Default::default()
        };
        let ctx = ConditionContext::default();

        assert!(evaluator
            .evaluate(&user(Role::Instructor, Some(42)), &request, &ctx)
            .is_ok());

        let denial = evaluator
            .evaluate(&user(Role::Instructor, Some(9)), &request, &ctx)
            .unwrap_err();
        assert!(denial.organization_mismatch);

        // Admins bypass org scoping.
        assert!(evaluator
            .evaluate(&user(Role::Admin, Some(9)), &request, &ctx)
            .is_ok());
    }

    #[test]
    fn test_conditions_all_must_pass() {
        let evaluator = PermissionEvaluator::new();
        let request = AccessRequest {
            conditions: vec![
                AccessCondition::AccountActive,
                AccessCondition::EmailVerified,
            ],
            ..Default::default()
        };
        let ctx = ConditionContext::default();

        let mut u = user(Role::Student, None);
        u.email_verified_at = None;
        let denial = evaluator.evaluate(&u, &request, &ctx).unwrap_err();
        assert_eq!(denial.failed_conditions, vec!["email_verified"]);
    }

    #[test]
    fn test_check_collapses_to_forbidden() {
        let evaluator = PermissionEvaluator::new();
        let request = AccessRequest {
            required_roles: vec![Role::Admin],
            ..Default::default()
        };
        let result = evaluator.check(
            &user(Role::Student, None),
            &request,
            &ConditionContext::default(),
        );
        assert_eq!(result.unwrap_err(), AuthError::Forbidden);
    }

    #[test]
    fn test_denial_collects_every_failure() {
        let evaluator = PermissionEvaluator::new();
        let request = AccessRequest {
            required_roles: vec![Role::Admin],
            required_permissions: vec![Permission::SystemAdmin],
            resource_organization: Some(1),
            conditions: vec![AccessCondition::EmailVerified],
        };
        let mut u = user(Role::Student, Some(2));
        u.email_verified_at = None;

        let denial = evaluator
            .evaluate(&u, &request, &ConditionContext::default())
            .unwrap_err();
        assert!(!denial.missing_roles.is_empty());
        assert!(!denial.missing_permissions.is_empty());
        assert!(!denial.failed_conditions.is_empty());
        assert!(denial.organization_mismatch);
    }
}
