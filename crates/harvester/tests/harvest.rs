// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end harvest runs against a scripted mock endpoint.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
    sync::Mutex,
};

use serde_json::json;

use harvester::{HarvestConfig, Harvester, RunSummary};
use rpc_batch::{
    mock::{MockReply, MockTransport},
    RpcRequest,
};

fn ts(number: u64) -> u64 {
    1_000_000 + 13 * number
}

fn hex_param(request: &RpcRequest, index: usize) -> u64 {
    let hex = request.params[index].as_str().unwrap();
    u64::from_str_radix(hex.strip_prefix("0x").unwrap(), 16).unwrap()
}

/// A scripted chain: block timestamps advance 13 per block, uncles
/// and transactions hang off the configured blocks, and the listed
/// failures answer null on their first (or every) attempt.
struct Chain {
    latest: u64,
    miner: fn(u64) -> &'static str,
    uncle_counts: HashMap<u64, u64>,
    transactions: HashMap<u64, Vec<String>>,
    zero_timestamp: HashSet<u64>,
    fail_block_once: HashSet<u64>,
    fail_block_always: HashSet<u64>,
    fail_tx_once: HashSet<String>,
    fail_uncle_once: HashSet<(u64, u64)>,
    fail_uncle_always: HashSet<(u64, u64)>,
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            latest: 9,
            miner: |number| if number % 2 == 0 { "0xaa" } else { "0xbb" },
            uncle_counts: HashMap::new(),
            transactions: HashMap::new(),
            zero_timestamp: HashSet::new(),
            fail_block_once: HashSet::new(),
            fail_block_always: HashSet::new(),
            fail_tx_once: HashSet::new(),
            fail_uncle_once: HashSet::new(),
            fail_uncle_always: HashSet::new(),
        }
    }
}

fn transport(chain: Chain) -> MockTransport {
    let attempts: Mutex<HashMap<String, u64>> = Mutex::new(HashMap::new());

    MockTransport::new(move |request| match request.method.as_str() {
        "eth_blockNumber" => MockReply::Result(json!(format!("{:#x}", chain.latest))),
        "eth_getBlockByNumber" => {
            let number = hex_param(request, 0);

            let mut attempts = attempts.lock().unwrap();
            let seen = attempts.entry(format!("block-{number}")).or_insert(0);
            *seen += 1;

            if chain.fail_block_always.contains(&number)
                || (chain.fail_block_once.contains(&number) && *seen == 1)
            {
                return MockReply::Null;
            }

            let uncle_count = chain.uncle_counts.get(&number).copied().unwrap_or(0);
            let uncles: Vec<String> = (0..uncle_count)
                .map(|index| format!("0xu{number}x{index}"))
                .collect();

            let timestamp = if chain.zero_timestamp.contains(&number) {
                0
            } else {
                ts(number)
            };

            MockReply::Result(json!({
                "number": format!("{number:#x}"),
                "timestamp": format!("{timestamp:#x}"),
                "miner": (chain.miner)(number),
                "uncles": uncles,
                "transactions": chain.transactions.get(&number).cloned().unwrap_or_default(),
            }))
        }
        "eth_getUncleByBlockNumberAndIndex" => {
            let number = hex_param(request, 0);
            let index = hex_param(request, 1);

            let mut attempts = attempts.lock().unwrap();
            let seen = attempts.entry(format!("uncle-{number}-{index}")).or_insert(0);
            *seen += 1;

            if chain.fail_uncle_always.contains(&(number, index))
                || (chain.fail_uncle_once.contains(&(number, index)) && *seen == 1)
            {
                return MockReply::Null;
            }

            MockReply::Result(json!({
                "timestamp": format!("{:#x}", ts(number) + index + 1),
                "miner": "0xcc",
            }))
        }
        "eth_getTransactionByHash" => {
            let hash = request.params[0].as_str().unwrap().to_string();

            let mut attempts = attempts.lock().unwrap();
            let seen = attempts.entry(format!("tx-{hash}")).or_insert(0);
            *seen += 1;

            if chain.fail_tx_once.contains(&hash) && *seen == 1 {
                return MockReply::Null;
            }
            MockReply::Result(json!({"hash": hash, "gasPrice": "0x3b9aca00"}))
        }
        "eth_getTransactionReceipt" => MockReply::Result(json!({"gasUsed": "0x5208"})),
        other => panic!("unexpected method: {other}"),
    })
}

fn test_config(out_dir: &Path, days: u64, blocks_per_day: u64, chunk_size: usize) -> HarvestConfig {
    HarvestConfig {
        endpoint: "http://mock.invalid".to_string(),
        days,
        blocks_per_day,
        chunk_size,
        out_dir: out_dir.to_path_buf(),
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn walk_truncates_the_final_chunk_and_reports_miners() {
    let dir = tempfile::tempdir().unwrap();
    let transport = transport(Chain::default());

    let summary = Harvester::new(&transport, test_config(dir.path(), 1, 10, 4))
        .unwrap()
        .run()
        .await
        .unwrap();

    // One eth_blockNumber call, then chunks of 4, 4, and min(4, 2).
    let sizes = transport.batch_sizes();
    assert_eq!(sizes, vec![1, 4, 4, 2]);
    assert_eq!(sizes[1..].iter().sum::<usize>(), 10);

    assert_eq!(
        summary,
        RunSummary {
            total_blocks: 10,
            distinct_miners: 2,
            error_count: 0,
        }
    );

    // Ten timestamps 13 apart give nine deltas of 13.
    assert_eq!(
        read_lines(&dir.path().join("blocktimes.txt")),
        vec!["13"; 9]
    );

    let mut stamps: Vec<u64> = read_lines(&dir.path().join("blocktimestamps.txt"))
        .iter()
        .map(|line| line.parse().unwrap())
        .collect();
    stamps.sort_unstable();
    assert_eq!(stamps, (0..10).map(ts).collect::<Vec<_>>());

    assert_eq!(
        read_lines(&dir.path().join("log.txt")),
        vec![
            "Found 2 different miners in last 10 blocks",
            "0xaa: 5 / 50.00000 %",
            "0xbb: 5 / 50.00000 %",
        ]
    );
}

#[tokio::test]
async fn failed_blocks_retry_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let transport = transport(Chain {
        miner: |_| "0xaa",
        fail_block_once: HashSet::from([7]),
        fail_block_always: HashSet::from([3]),
        ..Chain::default()
    });

    let summary = Harvester::new(&transport, test_config(dir.path(), 1, 10, 4))
        .unwrap()
        .run()
        .await
        .unwrap();

    // Each failing chunk is followed by one single-item retry batch.
    assert_eq!(transport.batch_sizes(), vec![1, 4, 1, 4, 1, 2]);

    // Block 7 is asked for twice (fails, then succeeds), block 3
    // twice (fails, then fails for good) and never a third time.
    let block_requests = transport.requests_for("eth_getBlockByNumber");
    let asked = |number: u64| {
        block_requests
            .iter()
            .filter(|request| hex_param(request, 0) == number)
            .count()
    };
    assert_eq!(asked(7), 2);
    assert_eq!(asked(3), 2);
    assert_eq!(block_requests.len(), 12);

    assert_eq!(
        read_lines(&dir.path().join("errors.txt")),
        vec![
            "block missing: 7",
            "block missing: 3",
            "block missing again: 3",
        ]
    );

    // The retried block still contributes; the permanent one does
    // not, leaving a doubled delta where block 3 would sit.
    assert_eq!(
        read_lines(&dir.path().join("blocktimes.txt")),
        vec!["13", "13", "26", "13", "13", "13", "13", "13"]
    );

    assert_eq!(summary.error_count, 3);
    assert!(read_lines(&dir.path().join("log.txt")).contains(&"0xaa: 9 / 90.00000 %".to_string()));
}

#[tokio::test]
async fn uncles_walk_after_blocks_at_half_chunk_size() {
    let dir = tempfile::tempdir().unwrap();
    let transport = transport(Chain {
        miner: |_| "0xaa",
        uncle_counts: HashMap::from([(9, 2), (5, 1)]),
        ..Chain::default()
    });

    let summary = Harvester::new(&transport, test_config(dir.path(), 1, 10, 4))
        .unwrap()
        .run()
        .await
        .unwrap();

    // Three uncle positions, walked in chunks of 4 / 2 = 2.
    assert_eq!(transport.batch_sizes(), vec![1, 4, 4, 2, 2, 1]);
    assert_eq!(
        transport
            .requests_for("eth_getUncleByBlockNumberAndIndex")
            .len(),
        3
    );

    // Two uncles in the first chunk of four blocks, one in the
    // second, none in the truncated third; scaled by 10 per day.
    assert_eq!(
        read_lines(&dir.path().join("unclesPerDay.txt")),
        vec!["5", "2.5", "0"]
    );

    assert_eq!(
        read_lines(&dir.path().join("uncleHashes.txt")),
        vec!["0xu9x0", "0xu9x1", "0xu5x0"]
    );

    // Ten block timestamps plus three uncle timestamps.
    assert_eq!(
        read_lines(&dir.path().join("blocktimestamps_withUncles.txt")).len(),
        13
    );
    assert_eq!(read_lines(&dir.path().join("blocktimestamps.txt")).len(), 10);

    // Uncle miners are credited into the same tally as blocks.
    assert_eq!(summary.distinct_miners, 2);
    assert_eq!(
        read_lines(&dir.path().join("log.txt")),
        vec![
            "Found 2 different miners in last 10 blocks",
            "0xaa: 10 / 100.00000 %",
            "0xcc: 3 / 30.00000 %",
        ]
    );
}

#[tokio::test]
async fn zero_timestamp_blocks_anchor_no_series() {
    let dir = tempfile::tempdir().unwrap();
    let transport = transport(Chain {
        zero_timestamp: HashSet::from([0]),
        ..Chain::default()
    });

    let summary = Harvester::new(&transport, test_config(dir.path(), 1, 10, 4))
        .unwrap()
        .run()
        .await
        .unwrap();

    // The genesis-style block is fetched and its miner credited, but
    // its zero timestamp lands in neither sink nor series.
    let mut stamps: Vec<u64> = read_lines(&dir.path().join("blocktimestamps.txt"))
        .iter()
        .map(|line| line.parse().unwrap())
        .collect();
    stamps.sort_unstable();
    assert_eq!(stamps, (1..10).map(ts).collect::<Vec<_>>());
    assert_eq!(
        read_lines(&dir.path().join("blocktimestamps_withUncles.txt")).len(),
        9
    );

    // Nine timestamps leave eight deltas, none distorted by a gap
    // down to zero.
    assert_eq!(
        read_lines(&dir.path().join("blocktimes.txt")),
        vec!["13"; 8]
    );
    assert_eq!(
        read_lines(&dir.path().join("blocktimes_withUncles.txt")),
        vec!["13"; 8]
    );

    assert_eq!(
        summary,
        RunSummary {
            total_blocks: 10,
            distinct_miners: 2,
            error_count: 0,
        }
    );
    assert!(read_lines(&dir.path().join("log.txt")).contains(&"0xaa: 5 / 50.00000 %".to_string()));
}

#[tokio::test]
async fn failed_uncles_retry_as_single_positions() {
    let dir = tempfile::tempdir().unwrap();
    let transport = transport(Chain {
        miner: |_| "0xaa",
        uncle_counts: HashMap::from([(9, 2), (5, 1)]),
        fail_uncle_once: HashSet::from([(9, 1)]),
        fail_uncle_always: HashSet::from([(5, 0)]),
        ..Chain::default()
    });

    let summary = Harvester::new(&transport, test_config(dir.path(), 1, 10, 4))
        .unwrap()
        .run()
        .await
        .unwrap();

    // Block walk, then uncle chunks of two and one, each failing
    // chunk followed by a single-position retry batch.
    assert_eq!(transport.batch_sizes(), vec![1, 4, 4, 2, 2, 1, 1, 1]);

    // Only the failed position is resubmitted; its sibling at index
    // zero, already folded, is never asked for again.
    let uncle_requests = transport.requests_for("eth_getUncleByBlockNumberAndIndex");
    let asked = |number: u64, index: u64| {
        uncle_requests
            .iter()
            .filter(|request| hex_param(request, 0) == number && hex_param(request, 1) == index)
            .count()
    };
    assert_eq!(asked(9, 0), 1);
    assert_eq!(asked(9, 1), 2);
    assert_eq!(asked(5, 0), 2);
    assert_eq!(uncle_requests.len(), 5);

    assert_eq!(
        read_lines(&dir.path().join("errors.txt")),
        vec![
            "uncle missing: 9 - 1",
            "uncle missing: 5 - 0",
            "uncle missing again: 5 - 0",
        ]
    );

    // The retried uncle still contributes a credit and a timestamp;
    // the permanent one contributes nothing.
    assert_eq!(
        read_lines(&dir.path().join("blocktimestamps_withUncles.txt")).len(),
        12
    );
    assert_eq!(summary.error_count, 3);
    assert_eq!(
        read_lines(&dir.path().join("log.txt")),
        vec![
            "Found 2 different miners in last 10 blocks",
            "0xaa: 10 / 100.00000 %",
            "0xcc: 2 / 20.00000 %",
        ]
    );
}

#[tokio::test]
async fn transactions_drain_before_the_walk_advances() {
    let dir = tempfile::tempdir().unwrap();
    let hashes: Vec<String> = (0..5).map(|index| format!("0xt{index}")).collect();
    let transport = transport(Chain {
        miner: |_| "0xaa",
        transactions: HashMap::from([(9, hashes)]),
        fail_tx_once: HashSet::from(["0xt2".to_string()]),
        ..Chain::default()
    });

    let summary = Harvester::new(&transport, test_config(dir.path(), 1, 2, 4))
        .unwrap()
        .run()
        .await
        .unwrap();

    // One block chunk of two, then the five discovered hashes in
    // sub-chunks of four and one: gas-price pass (with one retry),
    // gas-used pass, per sub-chunk.
    assert_eq!(transport.batch_sizes(), vec![1, 2, 4, 1, 4, 1, 1]);

    assert_eq!(
        read_lines(&dir.path().join("errors.txt")),
        vec!["tx missing: 0xt2"]
    );
    assert_eq!(
        read_lines(&dir.path().join("txGasPrice.txt")),
        vec!["1000000000"; 5]
    );
    assert_eq!(read_lines(&dir.path().join("txGas.txt")), vec!["21000"; 5]);
    assert_eq!(summary.error_count, 1);
}

#[tokio::test]
async fn aggregates_are_order_independent() {
    let dir = tempfile::tempdir().unwrap();
    let transport = transport(Chain::default()).reversed();

    let summary = Harvester::new(&transport, test_config(dir.path(), 1, 10, 4))
        .unwrap()
        .run()
        .await
        .unwrap();

    // Delivery order within each batch is reversed, but tallies and
    // the sorted derivations come out identical.
    assert_eq!(
        summary,
        RunSummary {
            total_blocks: 10,
            distinct_miners: 2,
            error_count: 0,
        }
    );
    assert_eq!(
        read_lines(&dir.path().join("blocktimes.txt")),
        vec!["13"; 9]
    );
    assert_eq!(
        read_lines(&dir.path().join("log.txt")),
        vec![
            "Found 2 different miners in last 10 blocks",
            "0xaa: 5 / 50.00000 %",
            "0xbb: 5 / 50.00000 %",
        ]
    );
}
