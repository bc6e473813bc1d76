//! Core types shared by geometry, tracking and the solver

pub mod ids;
pub mod vec2;

pub use ids::*;
pub use vec2::Vec2;
