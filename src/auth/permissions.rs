// src/auth/permissions.rs
//! Role → capability table and route gating.

use serde::{Deserialize, Serialize};

use crate::types::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    CanViewJobs,
    CanCreateJobs,
    CanEditJobs,
    CanDeleteJobs,
    CanApplyToJobs,
    CanViewApplications,
    CanManageApplications,
    CanViewProfiles,
    CanEditOwnProfile,
    CanEditAnyProfile,
    CanViewAllUsers,
    CanCreateUsers,
    CanEditUsers,
    CanDeleteUsers,
    CanAccessAdminPanel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub can_view_jobs: bool,
    pub can_create_jobs: bool,
    pub can_edit_jobs: bool,
    pub can_delete_jobs: bool,
    pub can_apply_to_jobs: bool,
    pub can_view_applications: bool,
    pub can_manage_applications: bool,
    pub can_view_profiles: bool,
    pub can_edit_own_profile: bool,
    pub can_edit_any_profile: bool,
    pub can_view_all_users: bool,
    pub can_create_users: bool,
    pub can_edit_users: bool,
    pub can_delete_users: bool,
    pub can_access_admin_panel: bool,
}

impl PermissionSet {
    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::CanViewJobs => self.can_view_jobs,
            Permission::CanCreateJobs => self.can_create_jobs,
            Permission::CanEditJobs => self.can_edit_jobs,
            Permission::CanDeleteJobs => self.can_delete_jobs,
            Permission::CanApplyToJobs => self.can_apply_to_jobs,
            Permission::CanViewApplications => self.can_view_applications,
            Permission::CanManageApplications => self.can_manage_applications,
            Permission::CanViewProfiles => self.can_view_profiles,
            Permission::CanEditOwnProfile => self.can_edit_own_profile,
            Permission::CanEditAnyProfile => self.can_edit_any_profile,
            Permission::CanViewAllUsers => self.can_view_all_users,
            Permission::CanCreateUsers => self.can_create_users,
            Permission::CanEditUsers => self.can_edit_users,
            Permission::CanDeleteUsers => self.can_delete_users,
            Permission::CanAccessAdminPanel => self.can_access_admin_panel,
        }
    }
}

const JOB_SEEKER_PERMISSIONS: PermissionSet = PermissionSet {
    can_view_jobs: true,
    can_create_jobs: false,
    can_edit_jobs: false,
    can_delete_jobs: false,
    can_apply_to_jobs: true,
    can_view_applications: true,
    can_manage_applications: false,
    can_view_profiles: false,
    can_edit_own_profile: true,
    can_edit_any_profile: false,
    can_view_all_users: false,
    can_create_users: false,
    can_edit_users: false,
    can_delete_users: false,
    can_access_admin_panel: false,
};

const EMPLOYER_PERMISSIONS: PermissionSet = PermissionSet {
    can_view_jobs: true,
    can_create_jobs: true,
    can_edit_jobs: true,
    can_delete_jobs: true,
    can_apply_to_jobs: false,
    can_view_applications: true,
    can_manage_applications: true,
    can_view_profiles: true,
    can_edit_own_profile: true,
    can_edit_any_profile: false,
    can_view_all_users: false,
    can_create_users: false,
    can_edit_users: false,
    can_delete_users: false,
    can_access_admin_panel: false,
};

const ADMIN_PERMISSIONS: PermissionSet = PermissionSet {
    can_view_jobs: true,
    can_create_jobs: true,
    can_edit_jobs: true,
    can_delete_jobs: true,
    can_apply_to_jobs: true,
    can_view_applications: true,
    can_manage_applications: true,
    can_view_profiles: true,
    can_edit_own_profile: true,
    can_edit_any_profile: true,
    can_view_all_users: true,
    can_create_users: true,
    can_edit_users: true,
    can_delete_users: true,
    can_access_admin_panel: true,
};

impl Role {
    pub fn permissions(self) -> PermissionSet {
        match self {
            Role::JobSeeker => JOB_SEEKER_PERMISSIONS,
            Role::Employer => EMPLOYER_PERMISSIONS,
            Role::Admin => ADMIN_PERMISSIONS,
        }
    }
}

pub fn permissions_for(role: Role) -> PermissionSet {
    role.permissions()
}

pub fn has_permission(user: Option<&User>, permission: Permission) -> bool {
    user.map(|user| user.role.permissions().allows(permission))
        .unwrap_or(false)
}

// ===== Route gating =====

/// Exact public paths reachable without a session.
const PUBLIC_PATHS: &[&str] = &["/", "/jobs"];
/// Public path prefixes (the path itself and anything below it).
const PUBLIC_PREFIXES: &[&str] = &["/login", "/register", "/about", "/contact", "/forgot-password"];

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// `/jobs/{id}`: a single segment below `/jobs` that is not `create`.
fn is_job_detail(path: &str) -> bool {
    matches!(segments(path).as_slice(), ["jobs", id] if *id != "create")
}

fn is_job_create(path: &str) -> bool {
    under(path, "/jobs/create")
}

/// `/jobs/{id}/edit`
fn is_job_edit(path: &str) -> bool {
    matches!(segments(path).as_slice(), ["jobs", _, "edit", ..])
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

pub fn is_public_route(path: &str) -> bool {
    let path = normalize(path);
    PUBLIC_PATHS.contains(&path)
        || PUBLIC_PREFIXES.iter().any(|prefix| under(path, prefix))
        || is_job_detail(path)
}

/// First matching rule wins: admin → dashboard → job create/edit →
/// applications → profile → jobs browse → allow.
pub fn can_access_route(user: Option<&User>, path: &str) -> bool {
    let Some(user) = user else {
        return is_public_route(path);
    };

    let path = normalize(path);
    let permissions = user.role.permissions();

    if under(path, "/admin") {
        permissions.can_access_admin_panel
    } else if under(path, "/dashboard") {
        true
    } else if is_job_create(path) {
        permissions.can_create_jobs
    } else if is_job_edit(path) {
        permissions.can_edit_jobs
    } else if under(path, "/applications") {
        permissions.can_view_applications
    } else if under(path, "/profile") {
        permissions.can_edit_own_profile || permissions.can_view_profiles
    } else if under(path, "/jobs") {
        permissions.can_view_jobs
    } else {
        true
    }
}
