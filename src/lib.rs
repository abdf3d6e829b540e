//! Content automation backend: manage ideas and content, pick platforms and
//! content types per item, and fan the selection out to Make.com webhooks.

pub mod automation;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod dispatch;
pub mod model;
pub mod notify;
pub mod report;
pub mod selection;
pub mod session;
pub mod webhook;
