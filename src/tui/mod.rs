mod progress;

pub use progress::TextProgress;
