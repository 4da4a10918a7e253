#[cfg(feature = "chrome")]
pub mod chrome;
pub mod scripts;
pub mod window;

#[cfg(feature = "chrome")]
pub use chrome::ChromeDriver;
pub use window::{WindowHelper, WindowSession, MAIN_WINDOW_NAME, WINDOW_OPEN_TIMEOUT};
