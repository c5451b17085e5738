pub mod access;
pub mod authz;
