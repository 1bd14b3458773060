//! PlaneSim - flight simulator frame core
//!
//! The application layer on top of `planesim_engine`: configuration, the
//! flight scene components, and the window and headless run modes.

pub mod components;
pub mod config;
pub mod scene;
pub mod systems;
