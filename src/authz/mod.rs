//! Role hierarchy, permission tables, and conditional access checks.
//!
//! Two independent mechanisms are kept deliberately separate:
//!
//! - the role hierarchy, a superset relation used for coarse checks
//!   (`admin` holds everything `student` holds), and
//! - the role → permission table, a flat static configuration used for
//!   fine-grained checks.
//!
//! Neither is derived from the other; they are kept consistent by
//! configuration so a change to one cannot silently widen the other.

mod condition;
mod evaluator;
mod permission;
mod role;

pub use condition::{AccessCondition, ConditionContext};
pub use evaluator::{AccessDenial, AccessRequest, PermissionEvaluator};
pub use permission::{permissions_for, Permission};
pub use role::Role;
