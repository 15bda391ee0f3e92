pub mod config;
pub mod diff;
pub mod roster;
pub mod storage;
pub mod tracker;
pub mod webhook;
