pub mod database;
pub mod package;
pub mod token;
