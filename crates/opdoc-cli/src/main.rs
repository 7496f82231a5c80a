use std::process;

fn main() {
    match opdoc_cli::run() {
        Ok(code) => process::exit(code as i32),
        Err(err) => {
            eprintln!("opdoc error: {err:#}");
            process::exit(opdoc_cli::exit_code_for(&err) as i32);
        }
    }
}
