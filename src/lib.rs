//! Blog comments bridge.
//!
//! Lets a comment widget embedded on trusted external blogs read and write a
//! forum discussion thread bound to each article.

pub mod auth;
pub mod binding;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod feed;
pub mod forum;
pub mod linkback;
pub mod origin;
pub mod publish;
pub mod reaction;
pub mod redirect;
pub mod reply;
pub mod settings;
pub mod sites;
pub mod web;

pub use error::{BridgeError, BridgeResult};
