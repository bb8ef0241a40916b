pub mod angle;
pub mod sanitize;
pub mod vec2;
