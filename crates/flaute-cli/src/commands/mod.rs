pub mod derive;
pub mod plan;
pub mod stats;
pub mod util;
