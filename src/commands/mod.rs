mod config_cmd;
mod scheduler;
mod workflows;

pub use config_cmd::ConfigCommand;
pub use scheduler::SchedulerCommand;
pub use workflows::WorkflowsCommand;
