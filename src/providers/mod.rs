pub mod ecb;

pub use ecb::{EcbFeed, parse_feed};
