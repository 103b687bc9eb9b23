use std::process::ExitCode;

fn main() -> ExitCode {
    pantrywise_cli::run()
}
