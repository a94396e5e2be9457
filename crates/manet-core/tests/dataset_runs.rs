use manet_core::{
    batch::execute_run,
    constants::INITIAL_ENERGY,
    dataset::HEADER,
    engine::{FlowId, RawFlowStats},
    run_batch,
    testing::SyntheticEngine,
    units::{Bytes, Joules, Nanosecs},
    BatchError, BatchOpts, DatasetWriter, MetricsAggregator, PerformanceClass, RunId,
};

const SEC: u64 = 1_000_000_000;

#[test]
fn batch_leaves_complete_dataset_on_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("manet_dataset_OLSR.csv");
    let opts = BatchOpts::builder()
        .tiers(vec![10, 20])
        .reps(6)
        .output(&path)
        .build();
    let mut writer = DatasetWriter::create(opts.output_path())?;
    let summary = run_batch(&SyntheticEngine::default(), &opts, &mut writer)?;
    writer.finish()?;
    assert_eq!(summary.runs, 12);

    let contents = std::fs::read_to_string(&path)?;
    let lines = contents.lines().collect::<Vec<_>>();
    assert_eq!(lines[0], HEADER);
    assert_eq!(lines.len(), 13);
    for line in &lines[1..] {
        let fields = line.split(',').collect::<Vec<_>>();
        assert_eq!(fields.len(), 20);
        assert_eq!(fields[0], "OLSR");
        assert_eq!((fields[3], fields[4]), ("0", "1"));
        let pdr = fields[13].parse::<f64>()?;
        assert!((0.0..=1.0).contains(&pdr));
        let delay = fields[15].parse::<f64>()?;
        assert!(delay >= 0.0);
        let energy = fields[19].parse::<f64>()?;
        assert!(energy >= 0.0);
    }
    Ok(())
}

#[test]
fn failed_batch_keeps_completed_rows() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("partial.csv");
    let opts = BatchOpts::builder().tiers(vec![10]).reps(10).build();
    let engine = SyntheticEngine::builder().fail_on(RunId::new(3)).build();
    let mut writer = DatasetWriter::create(&path)?;
    let res = run_batch(&engine, &opts, &mut writer);
    assert!(matches!(res, Err(BatchError::Run { .. })));
    drop(writer);
    let contents = std::fs::read_to_string(&path)?;
    // Header plus runs 0, 1 and 2.
    assert_eq!(contents.lines().count(), 4);
    Ok(())
}

#[test]
fn same_seed_reproduces_metrics() -> anyhow::Result<()> {
    let engine = SyntheticEngine::default();
    let opts = BatchOpts::builder().tiers(vec![10, 30]).reps(3).build();
    for id in opts.plan() {
        let a = execute_run(&engine, &id, opts.base_seed)?;
        let b = execute_run(&engine, &id, opts.base_seed)?;
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.config, b.config);
    }
    Ok(())
}

#[test]
fn scenario_without_flows_is_low() {
    let aggregator = MetricsAggregator::new(INITIAL_ENERGY);
    let remaining = vec![INITIAL_ENERGY; 10];
    let m = aggregator.aggregate(&[], &remaining);
    assert_eq!(m.pdr, 0.0);
    assert_eq!(m.throughput_kbps, 0.0);
    assert_eq!(m.avg_delay_ms, 0.0);
    assert_eq!(m.energy_used, Joules::ZERO);
    assert_eq!(
        PerformanceClass::classify(m.pdr, m.throughput_kbps),
        PerformanceClass::Low
    );
}

#[test]
fn full_delivery_is_high_only_with_enough_throughput() {
    let aggregator = MetricsAggregator::new(INITIAL_ENERGY);
    // Every packet delivered within one second.
    let flow = |rx_bytes| RawFlowStats {
        id: FlowId::ONE,
        tx_packets: 100,
        rx_packets: 100,
        lost_packets: 0,
        delay_sum: Nanosecs::new(100 * 1_000_000),
        first_tx: Nanosecs::new(SEC),
        last_rx: Nanosecs::new(2 * SEC),
        rx_bytes: Bytes::new(rx_bytes),
    };

    // 96_000 bytes in 1 s is 750 kbit/s.
    let fast = aggregator.aggregate(&[flow(96_000)], &[]);
    assert_eq!(fast.pdr, 1.0);
    assert_eq!(
        PerformanceClass::classify(fast.pdr, fast.throughput_kbps),
        PerformanceClass::High
    );

    // 51_200 bytes in 1 s is exactly 400 kbit/s.
    let slow = aggregator.aggregate(&[flow(51_200)], &[]);
    assert_eq!(slow.pdr, 1.0);
    assert_eq!(
        PerformanceClass::classify(slow.pdr, slow.throughput_kbps),
        PerformanceClass::Medium
    );
}
