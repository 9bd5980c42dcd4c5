pub mod window;

pub use window::{SampleWindow, FPS_WINDOW_CAPACITY};
