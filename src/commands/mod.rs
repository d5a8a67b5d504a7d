pub mod process;
pub mod status;
pub mod tables;
