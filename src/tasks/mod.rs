pub mod balance_listener;
pub mod feedback_sweeper;
