fn main() {
    if let Err(err) = sales_metrics::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
