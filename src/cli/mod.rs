mod args;
mod paths;

pub use args::{ApplyOptions, Cli, Commands, EngineAction};
pub use paths::resolve_workspace_root;
