pub mod booking;
pub mod notify;
pub mod password;
pub mod schedule;
