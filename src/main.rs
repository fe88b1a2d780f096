use std::process::ExitCode;

fn main() -> ExitCode {
    clipsave_lib::run()
}
