pub mod base;
pub mod capabilities;
pub mod mobile;
pub mod web;

pub use base::{
    AnchorElement, ButtonElement, Element, ElementOptions, LabelElement, LinkElement,
    SWIPE_DISTANCE_PX,
};
pub use capabilities::{
    Clickable, Editable, Locatable, Selectable, TextValued, Toggleable, Touchable,
};
pub use mobile::SwitchElement;
pub use web::{
    CheckboxElement, InputElement, Menu, Modal, RadioField, RadioInputElement, SelectElement,
};
