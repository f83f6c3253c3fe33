use std::process;

fn main() {
    if let Err(e) = brisk::cli::run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
