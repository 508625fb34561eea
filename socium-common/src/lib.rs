pub mod geo;
pub mod model;
pub mod snowflake;
pub mod util;
