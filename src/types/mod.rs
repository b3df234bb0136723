// src/types/mod.rs
//! Wire records shared with the job-board backend.

pub mod ai;
pub mod application;
pub mod job;
pub mod profile;
pub mod response;
pub mod user;

pub use application::{ApplicationRequest, ApplicationStatus, JobApplication, StatusUpdate};
pub use job::{Job, JobFilter, JobInput};
pub use profile::{Education, Experience, Portfolio, Profile, ProfileSection, Skill};
pub use response::ApiResponse;
pub use user::{LoginRequest, RegisterRequest, Role, User, UserUpdate};
