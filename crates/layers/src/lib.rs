pub mod config;
pub mod density;
pub mod feed;
pub mod metrics;
pub mod opacity;
pub mod placement;
pub mod post;

pub use config::*;
pub use density::*;
pub use feed::*;
pub use opacity::*;
pub use placement::*;
pub use post::*;
