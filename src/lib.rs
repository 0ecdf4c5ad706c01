pub mod config;
pub mod feedback;
pub mod gate;
pub mod geometry;
pub mod pose;
pub mod score;
pub mod session;
pub mod trainer;
