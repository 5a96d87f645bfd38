pub mod notification_service;
pub mod refresh_scheduler;
