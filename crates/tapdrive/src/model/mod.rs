pub mod gesture;
pub mod ids;
pub mod launch;
pub mod report;

pub use gesture::{GestureEvent, GestureKind, GestureScript};
pub use ids::RunId;
pub use launch::LaunchConfig;
pub use report::{ErrorInfo, ExitStatus, Phase, RunReport};
