use crate::cli::Command;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// One-shot commands such as `migrator jobs list`.
    OneShot,
    /// Long-running `migrator watch`; quiet on the console unless verbose.
    Watch,
}

impl ExecutionContext {
    /// Returns `true` when console sinks should be disabled.
    pub fn disables_console(self, verbose: bool) -> bool {
        matches!(self, ExecutionContext::Watch) && !verbose
    }
}

/// Derive the active execution context from a parsed CLI command.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Watch(_) => ExecutionContext::Watch,
        Command::Jobs(_)
        | Command::Pipelines(_)
        | Command::Templates(_)
        | Command::Catalog(_)
        | Command::Refresh => ExecutionContext::OneShot,
    }
}
