pub mod dispatch_loop;
pub mod registry;

pub use dispatch_loop::DispatchLoop;
pub use registry::{build_forecast, build_optimizer, FORECASTS, OPTIMIZERS};
