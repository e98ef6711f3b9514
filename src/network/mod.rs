//! Network addressing types

pub mod address;

pub use address::ListenAddr;
