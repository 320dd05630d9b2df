use std::process::ExitCode;

use console::style;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match voorisync::cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style(format!("[ERROR] {e}")).red());
            ExitCode::FAILURE
        }
    }
}
