pub mod service;

pub use service::{OrphanSweeper, SweepStats};
