fn main() {
    if let Err(err) = seatboard::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
