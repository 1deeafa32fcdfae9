// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Tesuji CLI entrypoint.
//!
//! Runs the interactive TUI against the built-in demo server. `--log-file` mirrors
//! the in-app debug log to a file, which is the way to watch diagnostics while the
//! alternate screen is up.

use std::error::Error;
use std::sync::Arc;

use tesuji::client::demo::DemoClient;
use tesuji::tui::logger::LogSink;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--demo] [--log-file <path>]\n\nDemo mode is currently the only backend and is the default; the flag is\naccepted for forward compatibility.\n\n--log-file appends every debug-log line to <path>."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    demo: bool,
    log_file: Option<String>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--demo" => {
                if options.demo {
                    return Err(());
                }
                options.demo = true;
            }
            "--log-file" => {
                if options.log_file.is_some() {
                    return Err(());
                }
                let path = args.next().ok_or(())?;
                options.log_file = Some(path);
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "tesuji".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let log = match options.log_file {
            Some(path) => LogSink::with_mirror(path.into()),
            None => LogSink::new(),
        };
        log.info("starting in demo mode");

        let client = Arc::new(DemoClient::new());
        tesuji::tui::run(client, log)
    })();

    if let Err(err) = result {
        eprintln!("tesuji: {err}");
        std::process::exit(1);
    }
}
