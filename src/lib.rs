// src/lib.rs

pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod lifecycle;
pub mod repository;
pub mod routes;
pub mod service;
pub mod test_utils;
