pub mod components;
pub mod layouts;
pub mod pages;

pub use components::{card, fit_note, money};
pub use layouts::desktop::desktop_layout;
