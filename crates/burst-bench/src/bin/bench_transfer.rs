// SPDX-License-Identifier: AGPL-3.0-only

//! Transfer cycle benchmark: every variant preset against a CPU copy loop.
//!
//! The CPU baseline issues one load and one store per word with no overlap,
//! so it needs two bus steps per word. The engine overlaps reads and writes
//! and pays only for burst set-up, read latency and back-pressure.
//!
//! Usage:
//!   cargo run --bin bench_transfer
//!   cargo run --bin bench_transfer -- --size-kb 64 --stall-pct 10

use anyhow::Result;
use burst_chip::Variant;
use burst_engine::{
    BurstEngine, EngineConfig, Host, MemorySlave, ReadAcceptance, SlaveConfig, SparseMemory,
    TransferRequest, TransferStats,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_TRANSFER_KB: u32 = 16;
const DEFAULT_STALL_PCT: u32 = 0;
const READ_LATENCY: u32 = 4;
const SRC: u32 = 0x0010_0000;
const DST: u32 = 0x0080_0000;

/// Bus steps per word of a load/store copy loop
const CPU_STEPS_PER_WORD: u64 = 2;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let size_kb = parse_arg(&args, "--size-kb", DEFAULT_TRANSFER_KB);
    let stall_pct = u8::try_from(parse_arg(&args, "--stall-pct", DEFAULT_STALL_PCT).min(99))?;
    let bytes = transfer_bytes(size_kb)?;
    let words = bytes / 4;
    let cpu_cycles = u64::from(words) * CPU_STEPS_PER_WORD;

    println!("Burst transfer benchmark");
    println!("========================");
    println!("Transfer size : {size_kb} KB ({words} words)");
    println!("Back-pressure : {stall_pct}% per side");
    println!("Read latency  : {READ_LATENCY} steps");
    println!("CPU copy      : {cpu_cycles} cycles");
    println!();

    println!(
        "  {:<34} {:>9} {:>11} {:>9} {:>9}",
        "configuration", "cycles", "words/cyc", "vs CPU", "stalls"
    );
    println!("  {}", "-".repeat(76));

    for variant in Variant::ALL {
        for acceptance in [ReadAcceptance::Pipelined, ReadAcceptance::SingleOutstanding] {
            let stats = run(variant, acceptance, stall_pct, bytes)?;
            let label = format!(
                "{variant} / {} slave",
                match acceptance {
                    ReadAcceptance::Pipelined => "pipelined",
                    ReadAcceptance::SingleOutstanding => "single-outstanding",
                }
            );
            print_row(&label, &stats, cpu_cycles);
        }
    }

    println!();
    println!("vs CPU > 1.0 means the engine finishes first.");

    Ok(())
}

fn run(
    variant: Variant,
    acceptance: ReadAcceptance,
    stall_pct: u8,
    bytes: u32,
) -> Result<TransferStats> {
    let engine = BurstEngine::new(EngineConfig::for_variant(variant))?;
    let slave_config = SlaveConfig::new()
        .with_read_acceptance(acceptance)
        .with_read_latency(READ_LATENCY)
        .with_stalls(stall_pct, stall_pct);
    let mut memory = SparseMemory::new();
    memory.fill(SRC, 0..bytes / 4);
    let mut host = Host::new(engine, MemorySlave::new(memory, slave_config)?);

    let mut request = TransferRequest::new(SRC, DST, bytes);
    if variant.capabilities().has_transform_pipeline {
        request = request.with_coefficient(3);
    }
    Ok(host.run(&request, u64::from(bytes) * 64)?)
}

#[allow(clippy::cast_precision_loss)]
fn print_row(label: &str, stats: &TransferStats, cpu_cycles: u64) {
    let speedup = cpu_cycles as f64 / stats.cycles.max(1) as f64;
    println!(
        "  {:<34} {:>9} {:>11.3} {:>8.2}x {:>9}",
        label,
        stats.cycles,
        stats.words_per_cycle(),
        speedup,
        stats.read_stall_cycles + stats.write_stall_cycles
    );
}

fn transfer_bytes(size_kb: u32) -> Result<u32> {
    size_kb
        .checked_mul(1024)
        .ok_or_else(|| anyhow::anyhow!("--size-kb {size_kb} exceeds a 32-bit transfer length"))
}

fn parse_arg(args: &[String], flag: &str, default: u32) -> u32 {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_size_must_fit_32_bits() {
        assert_eq!(transfer_bytes(16).unwrap(), 16 * 1024);
        assert_eq!(transfer_bytes(4_194_303).unwrap(), 4_194_303 * 1024);
        assert!(transfer_bytes(4_194_304).is_err());
        assert!(transfer_bytes(u32::MAX).is_err());
    }
}
