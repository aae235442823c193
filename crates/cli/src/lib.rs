//! bak - watch a file or directory and back up changed files to a
//! separate location at fixed intervals

pub mod config;
pub mod daemon;
