//! Dual-store consistency: keeps the vector index in line with PostgreSQL after
//! job, application, resume and moderation changes.

pub mod applied_jobs;
pub mod batch;
pub mod cascade;
pub mod decision;
pub mod handlers;
pub mod metadata;
pub mod reembed;
pub mod service;
