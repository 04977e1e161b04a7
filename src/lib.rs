//! template evaluation and conditional state rules for home-automation area cards
//!
//! the engine is [`template`] (sandboxed `${...}` expressions) and [`rules`]
//! (first matching state rule). [`card`] resolves a whole card configuration
//! against a [`hass::Hass`] snapshot; [`config`] and [`cli`] back the `acard`
//! binary.

pub mod card;
pub mod cli;
pub mod config;
pub mod error;
pub mod hass;
pub mod rules;
pub mod template;

pub use error::{Error, Result};
