//! Garden gameplay core
//!
//! A first-person player controller and a card-matching match against a
//! scripted opponent, written against an abstract host world. The
//! [`sandbox`] module provides an in-memory host for headless sessions and
//! tests.

pub mod config;
pub mod events;
pub mod game;
pub mod player;
pub mod sandbox;
pub mod scene;
pub mod task;
pub mod util;
pub mod world;
