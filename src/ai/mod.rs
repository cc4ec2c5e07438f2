//! Model-serving client

pub mod client;

pub use client::{OllamaClient, TextGenerator};
