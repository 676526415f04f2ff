//! Doodle Drop game library
//!
//! A physics puzzle core: drawn outlines become rigid bodies that are dropped
//! into hand-authored levels with sensors, spiked hazards and buttons.

pub mod body;
pub mod button;
pub mod config;
pub mod constants;
pub mod drop;
pub mod error;
pub mod game;
pub mod geometry;
pub mod hazard;
pub mod input;
pub mod level;
pub mod lifecycle;
pub mod polygon;
pub mod rendering;
pub mod rules;
pub mod supplier;
pub mod svg_path;
