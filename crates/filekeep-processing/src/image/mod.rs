//! Image processing module
//!
//! - Target size computation for height-bound resizing (dimensions)
//! - The decode/resize/encode capability and its `image`-crate implementation (processor)

pub mod dimensions;
pub mod processor;

pub use dimensions::target_dimensions;
pub use processor::{ImageProcessing, RasterProcessor, ResizeConstraints};
