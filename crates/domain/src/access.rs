//! Principals, roles and the order access policy.
//!
//! The rules here are pure: the caller resolves the owner of the order's
//! store (if it needs to) and passes it in.

use std::str::FromStr;

use common::{StoreId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::Order;

/// Role attached to an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperUser,
    Store,
    Delivery,
    Client,
}

impl Role {
    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperUser => "superuser",
            Role::Store => "store",
            Role::Delivery => "delivery",
            Role::Client => "client",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "superuser" => Ok(Role::SuperUser),
            "store" => Ok(Role::Store),
            "delivery" => Ok(Role::Delivery),
            "client" => Ok(Role::Client),
            other => Err(DomainError::InvalidRole(other.to_string())),
        }
    }
}

/// The authenticated identity making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    /// Creates a new principal.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns true if the principal is a superuser.
    pub fn is_superuser(&self) -> bool {
        self.role == Role::SuperUser
    }
}

/// Returns true if `principal` may read `order`.
///
/// `store_owner` is the owner of the order's store, when known.
pub fn can_view(order: &Order, principal: &Principal, store_owner: Option<UserId>) -> bool {
    principal.is_superuser()
        || order.user_id == principal.user_id
        || store_owner == Some(principal.user_id)
}

/// Returns true if `principal` may change the status of `order`.
///
/// The placing user alone is not enough to change status.
pub fn can_mutate_status(
    _order: &Order,
    principal: &Principal,
    store_owner: Option<UserId>,
) -> bool {
    principal.is_superuser() || store_owner == Some(principal.user_id)
}

/// Which orders a listing request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Orders placed by this user.
    OwnOrders(UserId),
    /// Orders placed against this store.
    Store(StoreId),
}

impl ListScope {
    /// Resolves the scope for a principal and an optional store filter.
    ///
    /// Clients always get their own orders, even when a store filter is
    /// supplied. Other roles get the filtered store's orders; ownership of
    /// that store is not re-checked here.
    pub fn resolve(principal: &Principal, store_filter: Option<StoreId>) -> Self {
        match (principal.role, store_filter) {
            (Role::Client, _) | (_, None) => ListScope::OwnOrders(principal.user_id),
            (_, Some(store_id)) => ListScope::Store(store_id),
        }
    }
}
