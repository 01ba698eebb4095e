#![allow(clippy::collapsible_if)]
#![allow(clippy::large_enum_variant)]

pub mod ai;
pub mod card;
pub mod config;
pub mod defaults;
pub mod events;
pub mod game;
pub mod lobby;
pub mod logging;
pub mod net;
pub mod turn;
