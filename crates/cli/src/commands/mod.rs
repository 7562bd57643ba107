pub mod config;
pub mod scan;
pub mod sections;
pub mod util;

pub use config::*;
pub use scan::*;
pub use sections::*;
pub use util::*;
