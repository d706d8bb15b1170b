fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if handle_cli_flags(&args) {
        return;
    }

    stream_tui::app::init_logging();

    if args.first().map(String::as_str) == Some("test") {
        let concurrent = args.iter().skip(1).any(|arg| arg == "--concurrent");
        if let Err(err) = stream_tui::run_check(concurrent) {
            eprintln!("error: {err:?}");
            std::process::exit(1);
        }
        return;
    }

    if let Err(err) = stream_tui::run() {
        eprintln!("Alas, there's been an error: {err:#}");
        std::process::exit(1);
    }
}

fn handle_cli_flags(args: &[String]) -> bool {
    let mut saw_flag = false;
    for arg in args {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("stream-tui {}", stream_tui::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "stream-tui — Browse a remote content catalog from the terminal.\n\n  test                 Check every catalog URL and list the dead ones\n  test --concurrent    Same check, one request per item in parallel\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n\nType to filter; Enter, Esc or Ctrl-C quits."
                );
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
