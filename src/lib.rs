pub mod assets;
pub mod config;
pub mod engine;
pub mod input;
pub mod motion;
pub mod quest;
pub mod renderer;
pub mod server;
pub mod session;
pub mod tilemap;
