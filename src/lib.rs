//! bookshelf: a book catalog service with a read-through cache.
//!
//! Reads go through [`cache::CacheAccessor`], which serves JSON copies of
//! records from a key-value store and falls back to the relational store on a
//! miss. Writes hit the relational store first, then invalidate the affected
//! cache keys and publish a change event on a detached task.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod events;
pub mod infra;
