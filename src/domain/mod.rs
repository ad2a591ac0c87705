pub mod booking;
pub mod models;
pub mod scoring;
pub mod slots;
