use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let data_dir = std::env::args().nth(1).map(PathBuf::from);
    if let Err(err) = ppewatch::run(data_dir).await {
        eprintln!("ppewatch: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
