use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use fdt::{BootInfo, FdtBuilder};

#[derive(Parser)]
#[command(name = "fdtinfo")]
#[command(about = "Device tree inspection and synthesis tool")]
struct Args {
    /// Print debug-level parser messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a device tree blob and print the boot summary
    Inspect {
        /// Device tree blob to read
        blob: PathBuf,
    },
    /// Write a minimal device tree blob
    Build {
        /// Output blob file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of cpu nodes under /cpus
        #[arg(long, default_value_t = 1)]
        cpus: u32,

        /// Id of the boot hart
        #[arg(long, default_value_t = 0)]
        boot_hart: u32,

        /// RAM region as BASE:SIZE (hexadecimal with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_region)]
        memory: Vec<(u64, u64)>,

        /// Reservation table entry as BASE:SIZE
        #[arg(long, value_parser = parse_region)]
        reserve: Vec<(u64, u64)>,

        /// Syscon device as NAME:BASE:SIZE, e.g. test@100000:0x100000:0x1000
        #[arg(long, value_parser = parse_syscon)]
        syscon: Vec<(String, u64, u64)>,
    },
}

/// Prints log records from the parser to stderr.
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn parse_number(s: &str) -> Result<u64, String> {
    let result = if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };
    result.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_region(s: &str) -> Result<(u64, u64), String> {
    let (base, size) = s
        .split_once(':')
        .ok_or_else(|| format!("expected BASE:SIZE, got '{}'", s))?;
    Ok((parse_number(base)?, parse_number(size)?))
}

fn parse_syscon(s: &str) -> Result<(String, u64, u64), String> {
    let (name, region) = s
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:BASE:SIZE, got '{}'", s))?;
    let (base, size) = parse_region(region)?;
    Ok((name.to_string(), base, size))
}

fn print_summary(info: &BootInfo) {
    println!("boot hart:   {}", info.boot_hart_id);
    println!("cores:       {}", info.core_count);
    println!("blob size:   {:#x}", info.dtb_size);

    println!("memory regions ({}):", info.memory_regions().len());
    for region in info.memory_regions() {
        println!("  {}", region);
    }

    println!("reserved regions ({}):", info.reserved_regions().len());
    for region in info.reserved_regions() {
        println!("  {}", region);
    }

    println!("syscon devices ({}):", info.syscon_devices().len());
    for device in info.syscon_devices() {
        println!("  {:<31} {:#x} +{:#x}", device.name(), device.base, device.size);
    }
}

fn inspect(blob: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(&blob)?;
    let header = fdt::FdtHeader::parse(&data)
        .map_err(|e| format!("{}: {}", blob.display(), e))?;
    println!("version:     {}", header.version);

    let info = fdt::parse(&data);
    print_summary(&info);
    Ok(())
}

fn build(
    output: PathBuf,
    cpus: u32,
    boot_hart: u32,
    memory: Vec<(u64, u64)>,
    reserve: Vec<(u64, u64)>,
    syscon: Vec<(String, u64, u64)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = FdtBuilder::new();
    builder.boot_cpu(boot_hart);
    for (base, size) in reserve {
        builder.reserve(base, size);
    }

    builder.begin_node("");
    builder.property_u32("#address-cells", 2);
    builder.property_u32("#size-cells", 2);
    builder.property_str("compatible", "riscv-virtio");

    builder.begin_node("cpus");
    builder.property_u32("#address-cells", 1);
    builder.property_u32("#size-cells", 0);
    for id in 0..cpus {
        builder.begin_node(&format!("cpu@{}", id));
        builder.property_str("device_type", "cpu");
        builder.property_u32("reg", id);
        builder.property_str("compatible", "riscv");
        builder.end_node();
    }
    builder.end_node();

    for (base, size) in memory {
        builder.begin_node(&format!("memory@{:x}", base));
        builder.property_str("device_type", "memory");
        builder.reg64(&[(base, size)]);
        builder.end_node();
    }

    if !syscon.is_empty() {
        builder.begin_node("soc");
        builder.property_strs("compatible", &["simple-bus"]);
        for (name, base, size) in &syscon {
            builder.begin_node(name);
            builder.property_strs("compatible", &["syscon"]);
            builder.reg64(&[(*base, *size)]);
            builder.end_node();
        }
        builder.end_node();
    }

    builder.end_node();

    let output_data = builder.build();
    let mut file = fs::File::create(&output)?;
    file.write_all(&output_data)?;

    println!("wrote {} bytes to {}", output_data.len(), output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    log::set_logger(&LOGGER).map_err(|e| format!("failed to install logger: {}", e))?;
    log::set_max_level(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });

    match args.command {
        Command::Inspect { blob } => inspect(blob),
        Command::Build {
            output,
            cpus,
            boot_hart,
            memory,
            reserve,
            syscon,
        } => build(output, cpus, boot_hart, memory, reserve, syscon),
    }
}
