//! Product-photo composition: background removal, tight crop, proportional
//! resize and centred paste onto a template canvas.

pub mod archive;
pub mod engine;
pub mod error;
pub mod raster;
pub mod segment;
pub mod template;

pub use engine::{Composition, Compositor};
pub use error::{ComposeError, Result};
pub use raster::Placement;
pub use segment::{HttpSegmenter, SegmentError, Segmenter};
pub use template::{DirTemplateStore, Template, TemplateStore};
