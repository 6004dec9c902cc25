#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod identity;
pub mod roles;

pub use identity::{SecurityIdentity, SecurityIdentityBuilder};
pub use roles::RolesMapping;
