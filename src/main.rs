//! Birda Gateway entry point.

#![allow(clippy::print_stderr)]

fn main() {
    if let Err(e) = birda_gateway::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
