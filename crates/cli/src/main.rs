use std::process::ExitCode;

fn main() -> ExitCode {
    loanscout_cli::run()
}
