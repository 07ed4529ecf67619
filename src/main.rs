fn main() {
    if let Err(err) = irrigation_dashboard::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
