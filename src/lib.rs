//! Brawl Arena - authoritative server for a real-time multiplayer arena fighter
//!
//! Each room runs a fixed-rate simulation on its own task: platformer physics,
//! melee hit detection, knockouts with timed respawns, and a match clock.
//! Clients talk to it over a WebSocket with JSON messages.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
