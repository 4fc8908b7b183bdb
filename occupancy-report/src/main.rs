fn main() {
    if let Err(err) = ev_dashboard::app::run_occupancy_report(std::env::args().skip(1).collect()) {
        eprintln!("occupancy report failed: {err}");
        std::process::exit(1);
    }
}
