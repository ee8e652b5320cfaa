pub mod cli;
pub mod discovery;
pub mod state;
