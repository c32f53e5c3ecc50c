mod operation;
mod script;

pub use operation::{Operation, Outcome};
pub use script::{Script, ScriptError, ScriptOptions};
