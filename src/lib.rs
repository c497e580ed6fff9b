// src/lib.rs
//! Orbit Bloom
//!
//! A real-time HDR rendering demo built on wgpu and winit: a textured building
//! lit by eight orbiting emissive lights, a cubemap skybox, and a bloom
//! post-process with tone mapping and gamma correction.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod orbits;
pub mod performance;
pub mod ui;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::DemoApp;
pub use config::DemoConfig;
pub use error::{DemoError, Result};
