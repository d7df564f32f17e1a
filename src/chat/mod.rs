//! Chat application module for interactive conversations with EcoBot.
//!
//! This module provides the REPL-facing pieces built on top of the
//! conversation store and the query dispatcher:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the single event-processing owner of conversation state
//! - [`commands`]: slash command parsing
//! - [`render`]: terminal output for turns

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::PlainTextRenderer;
pub use session::{ChatSession, SessionStats, Settled};
