//! Common objects shared by the Modcompat engine and its clients.

pub mod identifier;

pub use identifier::Identifier;
