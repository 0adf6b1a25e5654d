use clap::Parser;
use migrator::cli::{self, Args};
use migrator::core::{AppError, ErrorCategory};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            exit_code(&err)
        }
    }
}

fn report(err: &anyhow::Error) {
    eprintln!("Error: {:#}", err);
    if let Some(app_error) = err.downcast_ref::<AppError>() {
        for suggestion in &app_error.recovery_suggestions {
            eprintln!("  hint: {}", suggestion);
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<AppError>().map(|e| e.category) {
        Some(ErrorCategory::ActionNotAllowed) | Some(ErrorCategory::ValidationError) => {
            ExitCode::from(2)
        }
        Some(ErrorCategory::PersistenceError) | Some(ErrorCategory::ConfigurationError) => {
            ExitCode::from(3)
        }
        _ => ExitCode::FAILURE,
    }
}
