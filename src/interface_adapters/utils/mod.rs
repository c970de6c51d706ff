pub mod clock;

pub use clock::MonotonicClock;
