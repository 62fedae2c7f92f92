//! Taskhive - personal task management API with an AI assistant.
//!
//! Cookie-session REST service: per-user todo CRUD with a quota and a
//! retention window, semantic retrieval over todos via an external
//! embedding service, and a chat endpoint that walks a prioritized
//! model fallback chain.

pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod retrieval;
pub mod session;
pub mod validation;
