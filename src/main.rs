// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod adapter;
mod classify;
mod cli;
mod error;
mod model;
mod payload;
mod report;
mod rules;
mod ui;

use report::export::{self, Manifest};

fn main() {
    env_logger::init();

    // Parse CLI arguments
    let args = cli::CliArgs::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    let options = args.export_options();
    log::debug!("export options: {:?}", options);

    let manifest = match export::run_export(&args.input, &options) {
        Ok(manifest) => manifest,
        Err(e) => {
            ui::print_error(&e.to_string());
            std::process::exit(1);
        }
    };

    print_manifest(&manifest);

    // A partial export under --isolate-renderers still fails the run
    let exit_code = if manifest.is_complete() { 0 } else { 1 };
    std::process::exit(exit_code);
}

/// Echo warnings and failures on stderr, then the manifest as JSON on stdout
fn print_manifest(manifest: &Manifest) {
    for warning in &manifest.warnings {
        ui::print_warning(warning);
    }
    for (format, failure) in &manifest.failures {
        ui::print_error(&format!("{} output not written: {}", format, failure));
    }

    match serde_json::to_string_pretty(manifest) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            ui::print_error(&format!("Failed to serialize manifest: {}", e));
            std::process::exit(1);
        }
    }
}
