use std::io::{self, Write as _};

use clap::Parser;
use vsmemcap::app;
use vsmemcap::cli::Cli;
use vsmemcap::exit_codes::ExitCode;
use vsmemcap::os::HostOs;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(v) => v,
        Err(err) => {
            use clap::error::ErrorKind;
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success,
                _ => ExitCode::Failure,
            };
            std::process::exit(code.as_i32());
        }
    };

    for warning in cli.warnings() {
        println!("{warning}");
    }

    let config = cli.into_config();
    app::init_tracing(config.debug);

    let mut out = io::stdout().lock();
    let code = match app::run(&config, &HostOs::default(), &mut out) {
        Ok(code) => code.as_i32(),
        Err(err) => {
            eprintln!("vsmemcap: {err}");
            err.exit_code().as_i32()
        }
    };
    let _ = out.flush();

    std::process::exit(code);
}
