pub mod apple_health;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod exporters;
pub mod reports;
pub mod sinks;
pub mod util;
pub mod xml_utils;
