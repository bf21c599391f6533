//! Nivaas Core — domain models, error taxonomy, and repository traits.
//!
//! This crate has no storage dependency. Repository traits defined here are
//! implemented by `nivaas-db`; service crates (`nivaas-billing`,
//! `nivaas-workflow`) are generic over the traits so they never see
//! database types.

pub mod error;
pub mod models;
pub mod repository;
