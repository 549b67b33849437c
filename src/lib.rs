// Library exports for Foodgram
// This allows integration tests and the binary to share one router

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod recipes;
pub mod relations;
pub mod routes;
pub mod shopping;
pub mod state;
