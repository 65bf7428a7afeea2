pub mod params;
pub mod reconstruction;
