//! CLI commands: a thin smoke-test surface over the library crates (see
//! `kpt-cli`'s crate doc comment).

pub mod cache_list;
pub mod render;
