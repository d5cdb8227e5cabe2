//! Core library for OAuth1 authentication and status posting against a
//! Twitter-style social API, shared by the `chirp` CLI and web integrations.

pub mod auth;
pub mod config;
pub mod rest;
pub mod services;
