pub mod client;
pub mod console;
pub mod file;
pub mod messages;
pub mod user;
