// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: result ledger file
fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Result ledger file")
}

/// Arguments shared by the commands that run experiments
fn pipeline_args() -> Vec<Arg> {
    vec![
        output_arg(),
        Arg::new("template_dir")
            .long("template-dir")
            .value_name("DIR")
            .help("Directory with container recipe templates"),
        Arg::new("scratch_dir")
            .long("scratch-dir")
            .value_name("DIR")
            .help("Parent directory for scratch build trees"),
        Arg::new("benchmark")
            .long("benchmark")
            .action(ArgAction::SetTrue)
            .help("Run the NetPIPE benchmark instead of the functional test"),
        Arg::new("net_iface")
            .long("net-iface")
            .value_name("IFACE")
            .help("Network interface for the vendor fabric configuration"),
        Arg::new("timeout")
            .long("timeout")
            .value_name("SECONDS")
            .help("Job deadline in seconds"),
        Arg::new("ranks")
            .long("ranks")
            .value_name("N")
            .help("Number of MPI ranks"),
    ]
}

fn build_cli() -> Command {
    Command::new("mpi-compat")
        .version(env!("CARGO_PKG_VERSION"))
        .author("mpi-compat Contributors")
        .about("Cross-version MPI compatibility testing between host and container")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable debug logging"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Run one experiment and record its result")
                .arg(Arg::new("implementation").required(true).help("openmpi, mpich or intel"))
                .arg(Arg::new("host_version").required(true).help("Host MPI version"))
                .arg(Arg::new("host_source").required(true).help("Host source (file:// path or URL)"))
                .arg(Arg::new("container_version").long("container-version").help("Container MPI version"))
                .arg(Arg::new("container_source").long("container-source").help("Container source"))
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Run even if the ledger already holds this pair"),
                )
                .args(pipeline_args()),
        )
        .subcommand(
            Command::new("sweep")
                .about("Run all experiments from a list file that have no recorded result")
                .arg(Arg::new("experiments").required(true).help("TOML file of [[experiment]] tables"))
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .default_value("1")
                        .help("Number of experiments to run at once"),
                )
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Only show which experiments would run"),
                )
                .args(pipeline_args()),
        )
        .subcommand(
            Command::new("results")
                .about("Print recorded results")
                .arg(output_arg())
                .arg(
                    Arg::new("failed")
                        .long("failed")
                        .action(ArgAction::SetTrue)
                        .help("Only show failures"),
                ),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Uninstall an Intel MPI host install using its bundled installer")
                .arg(Arg::new("source_dir").long("source-dir").required(true).help("Extracted Intel MPI distribution"))
                .arg(Arg::new("install_dir").long("install-dir").required(true).help("Install prefix to remove"))
                .arg(Arg::new("template_dir").long("template-dir").help("Installer configuration templates")),
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

    let man_path = man_dir.join("mpi-compat.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
