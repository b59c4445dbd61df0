pub mod commands;
pub mod config;
pub mod consts;
pub mod decoder;
pub mod error;
pub mod events;
pub mod handle;
pub mod input;
pub mod page;
pub mod remover;
pub mod saver;
pub mod spinner;
pub mod workflow;
