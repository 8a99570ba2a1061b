pub mod args;
pub mod normalize;
pub mod params;
pub mod progress;
pub mod stitch;
