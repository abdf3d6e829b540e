//! Database module: insert/patch payloads and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: payloads accepted by the repositories.
//! - `repo`: SQL-only functions that map rows into the domain types in
//!   `crate::model`.
//!
//! Every list is ordered newest first.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{
    ContentPatch, IdeaPatch, NewContent, NewIdea, NewPrompt, NewSource, NewUser, PromptPatch,
    UserPatch,
};
