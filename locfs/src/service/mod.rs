pub mod file;
pub mod intent;
pub mod location;
pub mod range;
