pub mod catalog;
pub mod mastery;
pub mod sessions;
pub mod users;
