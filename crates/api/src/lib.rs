//! HTTP API: routing, request/response mapping, service wiring.

pub mod app;
