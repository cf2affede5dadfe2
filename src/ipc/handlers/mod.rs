pub mod attendance;
pub mod backup_exchange;
pub mod core;
pub mod recap;
pub mod session;
pub mod students;
