pub mod cpu;
pub mod frame;

pub use cpu::BlobPreProcessor;
pub use frame::{ColorFormat, ImageFrame};
