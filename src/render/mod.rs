//! Renderers for recorded screens.
//!
//! - `svg` - window-chrome SVG documents and thumbnails
//! - `frame` - RGB pixel frames (PPM) for the video pipeline
//! - `font` - the embedded 8x16 bitmap font backing `frame`

pub mod font;
pub mod frame;
pub mod svg;

pub use frame::{frame_size, render_frame, FrameImage};
pub use svg::{render_svg, render_thumbnail, svg_size};
