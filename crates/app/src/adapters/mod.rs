pub mod auth;
pub mod git;
pub mod persistence;
