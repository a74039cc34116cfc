pub mod batch;
pub mod cli;
pub mod health;
pub mod logging;
