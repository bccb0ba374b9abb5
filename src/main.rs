use std::process::ExitCode;

fn main() -> ExitCode {
    match fyyur_lib::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("fyyur: {err:#}");
            ExitCode::FAILURE
        }
    }
}
