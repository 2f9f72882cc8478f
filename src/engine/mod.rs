pub mod assignment;
pub mod sweeper;
