pub mod dispatch;
pub mod horizon;
pub mod objective;
pub mod spec;
pub mod variables;

pub use dispatch::*;
pub use horizon::*;
pub use objective::*;
pub use spec::*;
pub use variables::*;
