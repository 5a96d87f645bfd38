pub mod actors;
pub mod commands;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod services;
pub mod views;

#[cfg(test)]
pub mod test_helpers;
