// src/lib.rs
//! Client-side engine for bulk-editing device variation lists in product CSV
//! exports and driving batch jobs on the remote processing service.

pub mod batch;
pub mod devices;
pub mod service;
pub mod settings;
