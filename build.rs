// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: package file path
fn input_arg() -> Arg {
    Arg::new("input")
        .required(true)
        .value_name("PATH")
        .help("Path to the extension package (.crx or .xpi)")
}

fn build_cli() -> Command {
    Command::new("extconv")
        .version(env!("CARGO_PKG_VERSION"))
        .author("extconv Contributors")
        .about("Convert browser extensions between Chrome (.crx) and Firefox (.xpi)")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Path to the config file"),
        )
        .arg(
            Arg::new("history_file")
                .long("history-file")
                .value_name("PATH")
                .global(true)
                .help("Path to the history file"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Only print errors and results"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert a .crx into a .xpi, or a .xpi into a .crx")
                .arg(input_arg())
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .value_name("DIR")
                        .help("Directory for the converted package"),
                )
                .arg(
                    Arg::new("max_size")
                        .long("max-size")
                        .value_name("BYTES")
                        .help("Override the maximum input size in bytes"),
                )
                .arg(
                    Arg::new("no_history")
                        .long("no-history")
                        .action(clap::ArgAction::SetTrue)
                        .help("Do not record this conversion in the history file"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Show what an extension package contains")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("history")
                .about("Conversion history")
                .subcommand(
                    Command::new("list")
                        .about("List recorded conversions, newest first")
                        .arg(
                            Arg::new("limit")
                                .short('l')
                                .long("limit")
                                .help("Show at most this many entries"),
                        ),
                )
                .subcommand(
                    Command::new("remove")
                        .about("Remove one entry by id or unique id prefix")
                        .arg(Arg::new("id").required(true).help("Entry id or prefix")),
                )
                .subcommand(Command::new("clear").about("Remove all entries")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("extconv.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
