// src/auth/mod.rs
//! Session tokens, the auth manager and role-based gating.

pub mod manager;
pub mod permissions;
pub mod token;

pub use manager::{AuthListener, AuthManager, ListenerId};
pub use permissions::{
    can_access_route, has_permission, is_public_route, permissions_for, Permission, PermissionSet,
};
pub use token::{is_expired, is_valid_token, TokenPayload};
