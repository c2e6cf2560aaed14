pub mod data_url;
pub mod hit;
pub mod paint;
pub mod thumbnail;

pub use hit::{hit_test, hit_test_rect};
pub use paint::paint_document;
pub use thumbnail::{RenderError, preview_data_url, render, render_thumbnail};
