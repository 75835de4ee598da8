//! `burst`: command-line front end for the burst DMA engine model.
//!
//! ```text
//! USAGE:
//!   burst variants                   List the variant presets and their capabilities
//!   burst regs --variant <v>         Register map of one variant
//!   burst copy [options]             Run one transfer against the memory model
//! ```

use anyhow::{Context, Result};
use burst_chip::{RegisterLayout, Variant};
use burst_engine::{
    BurstEngine, EngineConfig, Host, MemorySlave, ReadAcceptance, ReferenceModel, SlaveConfig,
    SparseMemory, TransferRequest,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "burst", about = "Burst DMA engine cycle model", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List the variant presets and their capability flags.
    Variants,
    /// Print the register map of one variant.
    Regs {
        /// Variant preset (basic, pipelined, multiply, multiply-divide).
        #[arg(long, default_value = "multiply-divide")]
        variant: Variant,
    },
    /// Run one transfer and verify the destination.
    Copy(CopyArgs),
}

#[derive(clap::Args)]
struct CopyArgs {
    /// Variant preset.
    #[arg(long, default_value = "pipelined")]
    variant: Variant,
    /// Source base address.
    #[arg(long, default_value = "0x1000", value_parser = parse_u32)]
    src: u32,
    /// Destination base address.
    #[arg(long, default_value = "0x5000", value_parser = parse_u32)]
    dst: u32,
    /// Requested length in bytes.
    #[arg(long, default_value = "2048", value_parser = parse_u32)]
    len: u32,
    /// Read burst size in words (programmable-burst variants).
    #[arg(long)]
    rd_burst: Option<u32>,
    /// Write burst size in words (programmable-burst variants).
    #[arg(long)]
    wr_burst: Option<u32>,
    /// Transform coefficient (transform variants).
    #[arg(long)]
    coeff: Option<u32>,
    /// Source word i holds `pattern_base + i`.
    #[arg(long, default_value = "0xA000", value_parser = parse_u32)]
    pattern_base: u32,
    /// Chance (percent) of read back-pressure per step.
    #[arg(long, default_value_t = 0)]
    read_stall_pct: u8,
    /// Chance (percent) of write back-pressure per step.
    #[arg(long, default_value_t = 0)]
    write_stall_pct: u8,
    /// Slave read latency in steps.
    #[arg(long, default_value_t = 1)]
    latency: u32,
    /// Slave holds back-pressure for the whole read data phase.
    #[arg(long)]
    single_outstanding_slave: bool,
    /// Back-pressure seed.
    #[arg(long, default_value_t = SlaveConfig::DEFAULT_SEED)]
    seed: u64,
    /// Cycle budget for the transfer.
    #[arg(long, default_value_t = burst_engine::DEFAULT_TIMEOUT_CYCLES)]
    timeout: u64,
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Variants => cmd_variants(),
        Cmd::Regs { variant } => cmd_regs(variant),
        Cmd::Copy(args) => cmd_copy(&args)?,
    }

    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn cmd_variants() {
    println!(
        "{:<16} {:>9} {:>7} {:>8} {:>8} {:>16}",
        "variant", "transform", "divide", "prog-rd", "prog-wr", "single-outstand"
    );
    for v in Variant::ALL {
        let c = v.capabilities();
        println!(
            "{:<16} {:>9} {:>7} {:>8} {:>8} {:>16}",
            v.name(),
            yes_no(c.has_transform_pipeline),
            yes_no(c.has_divide_stage),
            yes_no(c.programmable_read_burst),
            yes_no(c.programmable_write_burst),
            yes_no(c.single_outstanding_read),
        );
    }
}

fn cmd_regs(variant: Variant) {
    let layout = RegisterLayout::for_capabilities(&variant.capabilities());
    println!("Register map: {variant}");
    println!("{:>5}  {:<10} {:<6}", "index", "name", "access");
    for (index, reg) in layout.iter() {
        println!("{index:>5}  {:<10} {:<6}", reg.name(), reg.access());
    }
}

fn cmd_copy(args: &CopyArgs) -> Result<()> {
    let engine = BurstEngine::new(EngineConfig::for_variant(args.variant))
        .context("building engine")?;

    let acceptance = if args.single_outstanding_slave {
        ReadAcceptance::SingleOutstanding
    } else {
        ReadAcceptance::Pipelined
    };
    let slave_config = SlaveConfig::new()
        .with_read_acceptance(acceptance)
        .with_read_latency(args.latency)
        .with_stalls(args.read_stall_pct, args.write_stall_pct)
        .with_seed(args.seed);
    let slave = MemorySlave::new(SparseMemory::new(), slave_config).context("building slave")?;

    let mut host = Host::new(engine, slave);

    let mut request = TransferRequest::new(args.src, args.dst, args.len);
    request.read_burst_words = args.rd_burst;
    request.write_burst_words = args.wr_burst;
    request.coefficient = args.coeff;
    host.configure(&request).context("programming registers")?;

    let config = *host.engine().transfer_config();
    if args.rd_burst.is_some_and(|rd| rd != config.read_burst_words)
        || args.wr_burst.is_some_and(|wr| wr != config.write_burst_words)
    {
        anyhow::bail!(
            "burst sizes rejected by the engine (rd={}, wr={} in effect)",
            config.read_burst_words,
            config.write_burst_words
        );
    }
    let effective = config
        .effective_length_bytes()
        .context("padded length exceeds 32 bits")?;
    let base = args.pattern_base;
    host.slave_mut()
        .memory_mut()
        .fill(args.src, (0..effective / 4).map(|i| base.wrapping_add(i)));

    let reference = ReferenceModel::capture(
        host.slave().memory(),
        &config,
        &host.engine().config().capabilities,
    )?;

    info!("copy: {:?}", config);
    host.start()?;
    let waited = host.wait_done(args.timeout).context("waiting for done")?;
    host.clear_done()?;

    let checked = reference
        .verify(host.slave().memory())
        .context("destination differs from reference")?;
    let stats = host.engine().stats();

    println!("Variant      : {}", args.variant);
    println!(
        "Transfer     : {:#010x} -> {:#010x}, {} bytes requested, {effective} moved",
        config.source_address, config.destination_address, config.requested_length_bytes
    );
    println!(
        "Bursts       : rd={} wr={}  coeff={}",
        config.read_burst_words, config.write_burst_words, config.coefficient
    );
    println!("Verified     : {checked} words");
    println!("Host waited  : {waited} cycles");
    println!("Statistics   :");
    println!("{stats}");

    Ok(())
}
