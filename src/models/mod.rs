pub mod dashboard;
pub mod like;
pub mod profile;
pub mod song;
pub mod upload;
