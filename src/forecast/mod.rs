pub mod historical;
pub mod sinusoidal;
pub mod types;

pub use historical::*;
pub use sinusoidal::*;
pub use types::*;
