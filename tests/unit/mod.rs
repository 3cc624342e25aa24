//! Unit tests for the loaders and in-memory indexes

pub mod catalog;
