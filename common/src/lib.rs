pub mod buffer2;
pub mod parallel;
pub mod serde_format;

pub use buffer2::Buffer2;
