pub mod apply;
pub mod command;
pub mod validation;

pub use apply::apply;
pub use command::{Command, CommandRecord, FeeDraft, FeePatch};
pub use validation::validate;
