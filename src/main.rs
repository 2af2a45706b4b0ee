fn main() {
    if let Err(err) = chatlens::cli::main() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
