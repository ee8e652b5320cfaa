pub mod filesystem;
pub mod peer;
