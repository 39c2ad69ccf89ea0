pub mod admin_service;
pub mod auth_service;
pub mod cleanup_service;
pub mod like_service;
pub mod profile_service;
pub mod search_service;
pub mod song_service;
pub mod upload_service;
