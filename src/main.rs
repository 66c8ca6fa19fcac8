fn main() {
    if let Err(err) = sheet2sql::run() {
        eprintln!("error: {err:#}");
        std::process::exit(sheet2sql::exit_code(&err));
    }
}
