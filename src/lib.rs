pub mod answerer;
pub mod auth;
pub mod banner;
pub mod batch;
pub mod config;
pub mod consts;
pub mod document;
pub mod events;
pub mod logging;
pub mod progress;
pub mod questions;
pub mod spinner;
pub mod throttle;
