pub mod config;
pub mod driver;
pub mod locator;

pub use config::{BrowserConfig, Config, Viewport, WaitConfig};
pub use driver::Driver;
pub use locator::{Locator, Strategy};
