//! Property tests for the padding law and the transferred extent.

use burst_chip::regs::{LENGTH, SLOT_5};
use burst_chip::{effective_length, Variant};
use burst_engine::prelude::*;
use burst_engine::RegisterFile;
use proptest::prelude::*;

fn burst_words() -> impl Strategy<Value = u32> {
    (0u32..=8).prop_map(|shift| 1 << shift)
}

proptest! {
    #[test]
    fn padded_length_is_smallest_burst_multiple(
        requested in 0u32..0xFFF0_0000,
        rd in burst_words(),
    ) {
        let unit = rd * 4;
        let effective = effective_length(requested, rd).unwrap();
        prop_assert!(effective >= requested);
        prop_assert_eq!(effective % unit, 0);
        prop_assert!(effective - requested < unit);
    }

    #[test]
    fn length_register_reads_back_padded(
        requested in 0u32..0xFFF0_0000,
        rd in burst_words(),
    ) {
        let mut csr = RegisterFile::new(&EngineConfig::for_variant(Variant::MultiplyDivide));
        csr.write(SLOT_5, rd, false);
        csr.write(LENGTH, requested, false);
        let first = csr.read(LENGTH);
        prop_assert_eq!(Some(first), effective_length(requested, rd));
        prop_assert_eq!(csr.read(LENGTH), first);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn transfer_covers_exactly_the_effective_length(
        requested in 0u32..4096,
        rd in prop::sample::select(vec![8u32, 16, 32, 64]),
        wr in prop::sample::select(vec![4u32, 16, 64, 128]),
    ) {
        const SRC: u32 = 0x1_0000;
        const DST: u32 = 0x4_0000;
        const SENTINEL: u32 = 0xDEAD_BEEF;

        // programmable bursts, plain copy
        let caps = Capabilities {
            programmable_read_burst: true,
            programmable_write_burst: true,
            ..Capabilities::default()
        };
        let engine = BurstEngine::new(EngineConfig::with_capabilities(caps)).unwrap();
        let mut host = Host::new(engine, MemorySlave::ideal());
        host.slave_mut().memory_mut().fill(SRC, (0..2048).map(|i| i + 1));
        host.slave_mut().memory_mut().fill(DST, std::iter::repeat(SENTINEL).take(2048));

        let request = TransferRequest::new(SRC, DST, requested)
            .with_read_burst(rd)
            .with_write_burst(wr);
        let stats = host.run(&request, 100_000).unwrap();

        let effective = effective_length(requested, rd).unwrap();
        let words = effective / 4;
        prop_assert_eq!(stats.words_written, words);
        let dst = host.slave().memory().read_range(DST, 2048);
        for (i, &w) in (0u32..).zip(&dst) {
            if i < words {
                prop_assert_eq!(w, i + 1);
            } else {
                prop_assert_eq!(w, SENTINEL);
            }
        }
    }
}
