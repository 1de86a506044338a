use serde::{Deserialize, Serialize};

/// Platform roles, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Guest,
    Student,
    Instructor,
    OrgAdmin,
    Admin,
    SuperAdmin,
}

impl Role {
    /// The set of roles whose permissions this role also holds, itself
    /// included. This is the superset relation of the hierarchy; it is a
    /// configuration table, not an ordering derived from enum discriminants.
    pub fn grants(self) -> &'static [Role] {
        match self {
            Role::Guest => &[Role::Guest],
            Role::Student => &[Role::Student, Role::Guest],
            Role::Instructor => &[Role::Instructor, Role::Student, Role::Guest],
            Role::OrgAdmin => &[
                Role::OrgAdmin,
                Role::Instructor,
                Role::Student,
                Role::Guest,
            ],
            Role::Admin => &[
                Role::Admin,
                Role::OrgAdmin,
                Role::Instructor,
                Role::Student,
                Role::Guest,
            ],
            Role::SuperAdmin => &[
                Role::SuperAdmin,
                Role::Admin,
                Role::OrgAdmin,
                Role::Instructor,
                Role::Student,
                Role::Guest,
            ],
        }
    }

    /// Returns true if this role satisfies any of the required roles.
    ///
    /// The check is a superset intersection: `Admin` satisfies `[Student]`
    /// but `Student` does not satisfy `[Admin]`.
    pub fn has_role(self, required: &[Role]) -> bool {
        let granted = self.grants();
        required.iter().any(|r| granted.contains(r))
    }

    /// Admins and super-admins bypass organization scoping.
    pub fn bypasses_org_scope(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Student => "student",
            Role::Instructor => "instructor",
            Role::OrgAdmin => "org_admin",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_is_superset_not_symmetric() {
        assert!(!Role::Student.has_role(&[Role::Admin]));
        assert!(Role::Admin.has_role(&[Role::Student]));
    }

    #[test]
    fn test_has_role_any_of() {
        assert!(Role::Instructor.has_role(&[Role::Admin, Role::Instructor]));
        assert!(!Role::Guest.has_role(&[Role::Student, Role::Instructor]));
    }

    #[test]
    fn test_every_role_grants_itself() {
        for role in [
            Role::Guest,
            Role::Student,
            Role::Instructor,
            Role::OrgAdmin,
            Role::Admin,
            Role::SuperAdmin,
        ] {
            assert!(role.has_role(&[role]));
        }
    }

    #[test]
    fn test_org_scope_bypass() {
        assert!(Role::Admin.bypasses_org_scope());
        assert!(Role::SuperAdmin.bypasses_org_scope());
        assert!(!Role::OrgAdmin.bypasses_org_scope());
        assert!(!Role::Instructor.bypasses_org_scope());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Role::OrgAdmin).unwrap();
        assert_eq!(json, "\"org_admin\"");
        let role: Role = serde_json::from_str("\"super_admin\"").unwrap();
        assert_eq!(role, Role::SuperAdmin);
    }
}
