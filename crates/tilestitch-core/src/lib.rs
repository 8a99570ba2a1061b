pub mod consts;
pub mod coords;
pub mod engine;
pub mod error;
pub mod params;
pub mod pipeline;
