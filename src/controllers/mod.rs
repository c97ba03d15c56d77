pub mod home_controller;
pub mod auth_controller;
pub mod notifications_controller;
