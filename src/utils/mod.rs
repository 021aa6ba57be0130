pub mod logging;
pub mod timeout;

pub use timeout::bounded;
