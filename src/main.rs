fn main() {
    if let Err(err) = project_sheet::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
