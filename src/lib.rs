//! # Environment Monitor Library
//!
//! Humidity, temperature and pressure telemetry node with BLE publishing,
//! per-day SD card logging and field renaming.
//!
//! This library provides the node's operational core (frame codec, identity
//! store, log rotation, link state and the telemetry cycle) and the
//! consumer-side decoder used by the BLE central.

pub mod config;
pub mod error;
pub mod frame;
pub mod identity;
pub mod link;
pub mod telemetry;
pub mod node;
pub mod consumer;
