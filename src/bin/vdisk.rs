//! vdisk CLI
//!
//! One-shot subcommands against a disk image, or an interactive menu.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vdisk::{Config, DiskError, ListReport, SortReport, SortStrategy, VirtualDisk};

const MIB: u64 = 1024 * 1024;

/// Virtual disk with extent allocation and external sort
#[derive(Parser, Debug)]
#[command(name = "vdisk")]
#[command(about = "Block device emulator with a flat directory and external merge sort")]
#[command(version)]
struct Args {
    /// Backing image file
    #[arg(short, long, default_value = "./disco_virtual.img")]
    image: PathBuf,

    /// Device size in MiB
    #[arg(long, default_value = "1024")]
    device_mb: u64,

    /// Swap reservation in MiB
    #[arg(long, default_value = "100")]
    swap_mb: u64,

    /// Scratch buffer capacity in elements
    #[arg(long, default_value = "524288")]
    scratch: usize,

    /// Seed for payload generation
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a file of random 32-bit integers
    Create {
        name: String,
        /// Number of integers
        count: u64,
    },

    /// Delete a file
    Delete { name: String },

    /// List files and free space
    List,

    /// Sort a file in place
    Sort { name: String },

    /// Print elements start..=end of a file
    Read { name: String, start: u64, end: u64 },

    /// Concatenate two files into the first name
    Concat { first: String, second: String },

    /// Interactive menu (default)
    Shell,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vdisk=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut disk = match VirtualDisk::open(config) {
        Ok(disk) => disk,
        Err(e) => {
            tracing::error!("Failed to open virtual disk: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell(&mut disk),
        command => run(&mut disk, command),
    };

    if let Err(e) = disk.close() {
        tracing::error!("Failed to close virtual disk: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> vdisk::Result<Config> {
    let mut builder = Config::builder()
        .image_path(&args.image)
        .device_bytes(mib_to_bytes(args.device_mb, "--device-mb")?)
        .swap_bytes(mib_to_bytes(args.swap_mb, "--swap-mb")?)
        .scratch_capacity(args.scratch);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    Ok(builder.build())
}

fn mib_to_bytes(value: u64, flag: &str) -> vdisk::Result<u64> {
    value
        .checked_mul(MIB)
        .ok_or_else(|| DiskError::Config(format!("{} {} MiB overflows a byte count", flag, value)))
}

fn run(disk: &mut VirtualDisk, command: Commands) -> vdisk::Result<()> {
    match command {
        Commands::Create { name, count } => {
            disk.create(&name, count)?;
            println!("File '{}' created.", name);
        }
        Commands::Delete { name } => {
            disk.delete(&name)?;
            println!("File '{}' deleted.", name);
        }
        Commands::List => print_listing(&disk.list()),
        Commands::Sort { name } => print_sort(&name, &disk.sort(&name)?),
        Commands::Read { name, start, end } => {
            let values = disk.read(&name, start, end)?;
            println!("Sublist of '{}' ({} to {}):", name, start, end);
            let line: Vec<String> = values.iter().map(u32::to_string).collect();
            println!("{}", line.join(" "));
        }
        Commands::Concat { first, second } => {
            let entry = disk.concat(&first, &second)?;
            println!("Files '{}' and '{}' concatenated into '{}'.", first, second, entry.name);
        }
        Commands::Shell => {}
    }
    Ok(())
}

/// Numbered menu loop; operation errors are reported and the loop continues
fn shell(disk: &mut VirtualDisk) -> vdisk::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!("\n--- Menu ---");
        println!("1 - Create file");
        println!("2 - Delete file");
        println!("3 - List files");
        println!("4 - Sort file");
        println!("5 - Show sublist of a file");
        println!("6 - Concatenate two files");
        println!("0 - Exit");

        let choice = match prompt(&mut lines, "Choose an option: ")? {
            Some(choice) => choice,
            None => return Ok(()),
        };

        let command = match choice.trim() {
            "0" => {
                println!("Exiting...");
                return Ok(());
            }
            "1" => {
                let name = ask(&mut lines, "File name: ")?;
                let count = ask(&mut lines, "Number of integers: ")?;
                count.parse().ok().map(|count| Commands::Create { name, count })
            }
            "2" => Some(Commands::Delete {
                name: ask(&mut lines, "File name: ")?,
            }),
            "3" => Some(Commands::List),
            "4" => Some(Commands::Sort {
                name: ask(&mut lines, "File name: ")?,
            }),
            "5" => {
                let name = ask(&mut lines, "File name: ")?;
                let range = ask(&mut lines, "Start and end of the range: ")?;
                let mut bounds = range.split_whitespace().map(str::parse::<u64>);
                match (bounds.next(), bounds.next()) {
                    (Some(Ok(start)), Some(Ok(end))) => Some(Commands::Read { name, start, end }),
                    _ => None,
                }
            }
            "6" => {
                let first = ask(&mut lines, "First file name: ")?;
                let second = ask(&mut lines, "Second file name: ")?;
                Some(Commands::Concat { first, second })
            }
            _ => {
                println!("Invalid option! Try again.");
                continue;
            }
        };

        match command {
            Some(command) => {
                if let Err(e) = run(disk, command) {
                    println!("Error: {}", e);
                }
            }
            None => println!("Invalid input."),
        }
    }
}

fn prompt<B: BufRead>(lines: &mut io::Lines<B>, message: &str) -> vdisk::Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    Ok(lines.next().transpose()?)
}

fn ask<B: BufRead>(lines: &mut io::Lines<B>, message: &str) -> vdisk::Result<String> {
    Ok(prompt(lines, message)?
        .map(|line| line.trim().to_string())
        .unwrap_or_default())
}

fn print_listing(report: &ListReport) {
    println!("Files in directory:");
    for entry in &report.entries {
        println!("{}\t{} bytes", entry.name, entry.size_bytes);
    }
    println!();
    println!("Total space:     {} bytes ({:.2} MB)", report.total_bytes, mib(report.total_bytes));
    println!("Used space:      {} bytes ({:.2} MB)", report.used_bytes, mib(report.used_bytes));
    println!("Available space: {} bytes ({:.2} MB)", report.free_bytes, mib(report.free_bytes));
    println!("Swap reserved:   {} bytes ({:.2} MB)", report.swap_bytes, mib(report.swap_bytes));
}

fn print_sort(name: &str, report: &SortReport) {
    let ms = report.elapsed.as_secs_f64() * 1000.0;
    match report.strategy {
        SortStrategy::InMemory => println!("File '{}' sorted in {:.2} ms.", name, ms),
        SortStrategy::External { runs, merge_rounds } => println!(
            "File '{}' sorted in {:.2} ms (external, {} runs, {} merge rounds).",
            name, ms, runs, merge_rounds
        ),
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / MIB as f64
}
