pub mod console;
pub mod events;
pub mod params;
pub mod presets;
