//! Dioxus hooks wrapping the loading engine

mod lazy;
mod progressive;

pub use lazy::*;
pub use progressive::*;
