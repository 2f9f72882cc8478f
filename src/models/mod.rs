pub mod assignment;
pub mod event;
pub mod presence;
