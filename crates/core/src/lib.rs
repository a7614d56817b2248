pub mod error;
pub mod history;
pub mod labels;
pub mod model;
pub mod scoring;
pub mod time;

pub use error::Error;
pub use time::Clock;
