//! Access policy
//!
//! A pure decision table keyed by resource class, operation and actor role.
//! Handlers call [`authorize`] before touching any repository.

use std::fmt;

use crate::models::Role;

/// Operations a request can perform on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_read(&self) -> bool {
        matches!(self, Self::List | Self::Retrieve)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Retrieve => write!(f, "retrieve"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Resources as the policy sees them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Category,
    Tag,
    Product,
    ProductImage,
    /// The admin listing of every profile
    ProfileList,
    /// The caller's own profile
    OwnProfile,
    Dashboard,
    ProductStats,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Product => "product",
            Self::ProductImage => "product_image",
            Self::ProfileList => "profile_list",
            Self::OwnProfile => "own_profile",
            Self::Dashboard => "dashboard",
            Self::ProductStats => "product_stats",
        };
        f.write_str(name)
    }
}

/// How a resource is guarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyClass {
    /// Reads need any authenticated actor; writes need staff
    StaffWrite,
    /// Every operation needs admin
    AdminOnly,
    /// Any authenticated actor may read and update their own record; nothing else
    SelfScoped,
}

impl Resource {
    pub fn policy_class(&self) -> PolicyClass {
        match self {
            Self::Category | Self::Tag | Self::Product | Self::ProductImage => {
                PolicyClass::StaffWrite
            }
            Self::ProfileList | Self::Dashboard | Self::ProductStats => PolicyClass::AdminOnly,
            Self::OwnProfile => PolicyClass::SelfScoped,
        }
    }
}

/// The caller as seen by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    /// No authenticated actor
    Unauthenticated,
    /// Authenticated, but the role or operation is not allowed
    Forbidden,
}

/// Minimum role required, or `None` when the operation is never allowed
pub fn required_role(class: PolicyClass, operation: Operation) -> Option<Role> {
    match (class, operation) {
        (PolicyClass::StaffWrite, op) if op.is_read() => Some(Role::Plain),
        (PolicyClass::StaffWrite, _) => Some(Role::Staff),
        (PolicyClass::AdminOnly, _) => Some(Role::Admin),
        (PolicyClass::SelfScoped, Operation::Retrieve | Operation::Update) => Some(Role::Plain),
        (PolicyClass::SelfScoped, _) => None,
    }
}

/// Decide whether `actor` may perform `operation` on `resource`.
pub fn authorize(
    actor: Option<&Principal>,
    resource: Resource,
    operation: Operation,
) -> Result<(), AccessDenied> {
    let Some(actor) = actor else {
        return Err(AccessDenied::Unauthenticated);
    };

    match required_role(resource.policy_class(), operation) {
        Some(required) if actor.role >= required => Ok(()),
        _ => Err(AccessDenied::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OPERATIONS: [Operation; 5] = [
        Operation::List,
        Operation::Retrieve,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    fn actor(role: Role) -> Principal {
        Principal { user_id: 1, role }
    }

    #[test]
    fn test_anonymous_is_always_unauthenticated() {
        for operation in ALL_OPERATIONS {
            assert_eq!(
                authorize(None, Resource::Product, operation),
                Err(AccessDenied::Unauthenticated)
            );
        }
    }

    #[test]
    fn test_staff_write_resources() {
        let plain = actor(Role::Plain);
        let staff = actor(Role::Staff);
        for resource in [Resource::Category, Resource::Tag, Resource::Product, Resource::ProductImage] {
            assert!(authorize(Some(&plain), resource, Operation::List).is_ok());
            assert!(authorize(Some(&plain), resource, Operation::Retrieve).is_ok());
            assert_eq!(
                authorize(Some(&plain), resource, Operation::Create),
                Err(AccessDenied::Forbidden)
            );
            for operation in ALL_OPERATIONS {
                assert!(authorize(Some(&staff), resource, operation).is_ok());
            }
        }
    }

    #[test]
    fn test_admin_only_resources() {
        for resource in [Resource::ProfileList, Resource::Dashboard, Resource::ProductStats] {
            assert_eq!(
                authorize(Some(&actor(Role::Staff)), resource, Operation::List),
                Err(AccessDenied::Forbidden)
            );
            assert!(authorize(Some(&actor(Role::Admin)), resource, Operation::List).is_ok());
        }
    }

    #[test]
    fn test_own_profile_has_no_delete() {
        let admin = actor(Role::Admin);
        let plain = actor(Role::Plain);
        assert!(authorize(Some(&plain), Resource::OwnProfile, Operation::Retrieve).is_ok());
        assert!(authorize(Some(&plain), Resource::OwnProfile, Operation::Update).is_ok());
        for operation in [Operation::Delete, Operation::Create, Operation::List] {
            assert_eq!(
                authorize(Some(&admin), Resource::OwnProfile, operation),
                Err(AccessDenied::Forbidden)
            );
        }
    }

    #[test]
    fn test_admin_holds_staff_privileges() {
        let admin = actor(Role::Admin);
        assert!(authorize(Some(&admin), Resource::Category, Operation::Delete).is_ok());
    }
}
