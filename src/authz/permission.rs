use serde::{Deserialize, Serialize};

use super::Role;

/// Fine-grained permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CourseView,
    CourseCreate,
    CourseEdit,
    CourseDelete,
    EnrollmentManage,
    UserView,
    UserManage,
    OrganizationManage,
    ReportsView,
    SystemAdmin,
}

/// Static role → permission table.
///
/// Looked up directly by role; permissions are NOT inherited through the
/// role hierarchy. A role's full permission set must be spelled out here.
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Guest => &[Permission::CourseView],
        Role::Student => &[Permission::CourseView],
        Role::Instructor => &[
            Permission::CourseView,
            Permission::CourseCreate,
            Permission::CourseEdit,
            Permission::EnrollmentManage,
        ],
        Role::OrgAdmin => &[
            Permission::CourseView,
            Permission::CourseCreate,
            Permission::CourseEdit,
            Permission::CourseDelete,
            Permission::EnrollmentManage,
            Permission::UserView,
            Permission::UserManage,
            Permission::ReportsView,
        ],
        Role::Admin => &[
            Permission::CourseView,
            Permission::CourseCreate,
            Permission::CourseEdit,
            Permission::CourseDelete,
            Permission::EnrollmentManage,
            Permission::UserView,
            Permission::UserManage,
            Permission::OrganizationManage,
            Permission::ReportsView,
        ],
        Role::SuperAdmin => &[
            Permission::CourseView,
            Permission::CourseCreate,
            Permission::CourseEdit,
            Permission::CourseDelete,
            Permission::EnrollmentManage,
            Permission::UserView,
            Permission::UserManage,
            Permission::OrganizationManage,
            Permission::ReportsView,
            Permission::SystemAdmin,
        ],
    }
}

/// Returns true if the role's permission set contains the permission.
pub fn role_has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_cannot_create_courses() {
        assert!(role_has_permission(Role::Student, Permission::CourseView));
        assert!(!role_has_permission(Role::Student, Permission::CourseCreate));
    }

    #[test]
    fn test_instructor_cannot_delete_courses() {
        assert!(role_has_permission(Role::Instructor, Permission::CourseEdit));
        assert!(!role_has_permission(Role::Instructor, Permission::CourseDelete));
    }

    #[test]
    fn test_only_super_admin_has_system_admin() {
        assert!(role_has_permission(Role::SuperAdmin, Permission::SystemAdmin));
        assert!(!role_has_permission(Role::Admin, Permission::SystemAdmin));
    }

    #[test]
    fn test_table_is_not_hierarchy_derived() {
        // OrgAdmin dominates Instructor in the hierarchy, but the permission
        // table is looked up flat; both facts must hold independently.
        assert!(Role::OrgAdmin.has_role(&[Role::Instructor]));
        for p in permissions_for(Role::Instructor) {
            assert!(role_has_permission(Role::OrgAdmin, *p));
        }
    }
}
