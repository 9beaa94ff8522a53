pub mod commands;
pub mod logging;
pub mod proxy;
pub mod settings;
