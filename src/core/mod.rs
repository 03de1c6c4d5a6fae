pub mod config;
pub mod engine;
pub mod lines;
pub mod navigation;
pub mod portrait;
pub mod sequencer;
pub mod tags;
pub mod timer;
