pub mod chart;
pub mod detector;
pub mod history_store;
pub mod notification;
pub mod poster;
pub mod scheduler;
pub mod source;
pub mod statistics;
pub mod verification;
pub mod youtube;
