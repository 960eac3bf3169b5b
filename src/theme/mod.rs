pub mod renderer;

pub use renderer::{SiteInfo, ThemeRenderer};
