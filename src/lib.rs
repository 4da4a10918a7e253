pub mod browser;
pub mod core;
pub mod dom;
pub mod element;
pub mod errors;
pub mod page;
pub mod testing;
pub mod types;
pub mod wait;

pub use crate::core::{Config, Driver, Locator, Strategy, WaitConfig};
pub use crate::dom::{ParseTree, TreeNode};
pub use element::{Element, ElementOptions};
pub use errors::{BrowserError, ErrorKind, Result};
pub use page::{Page, PageState};
pub use types::*;
