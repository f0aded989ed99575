pub mod audio;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod form;
pub mod format;
pub mod models;
pub mod progress;
pub mod resource;
pub mod session;
pub mod transfer;
pub mod tui;
pub mod validate;
