pub mod pages;
pub mod process;

pub use pages::*;
pub use process::*;
