pub mod dispatch;
pub mod evaluator;
pub mod post_command;
pub mod protocol;
pub mod server;
pub mod session;

pub use dispatch::{dispatch, finish, menu_rows, Directive, MenuAction, Outcome};
pub use evaluator::{Evaluator, QalcEvaluator};
pub use post_command::PostCommand;
pub use server::{run_server, serve};
pub use session::{Completion, EvaluationSession, Submission};
