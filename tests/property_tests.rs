//! Property-based tests for the ledger kernel
//!
//! These tests check that the chain invariants hold over random block trees
//! and random transfer workloads.

use proptest::prelude::*;
use utxo_ledger::consensus::{apply_batch, Block};
use utxo_ledger::constants::CUT_OFF_AGE;
use utxo_ledger::crypto::{PrivateKey, PublicKey};
use utxo_ledger::node::create_genesis_block;
use utxo_ledger::storage::{ChainNode, ChainState};
use utxo_ledger::validation::{Transaction, TxInput, TxOutput};
use utxo_ledger::ChainConfig;

const PARTIES: u8 = 4;
const ALLOCATION: i64 = 100;
const REWARD: i64 = 25;
const MINER: u8 = 9;

fn key(seed: u8) -> PrivateKey {
    PrivateKey::from_bytes(&[seed; 32]).unwrap()
}

fn pk(seed: u8) -> PublicKey {
    key(seed).public_key()
}

fn funded_genesis() -> Block {
    let allocations: Vec<_> = (1..=PARTIES).map(|seed| (pk(seed), ALLOCATION)).collect();
    create_genesis_block(&allocations, 0)
}

fn child(parent: &Block, tag: u32, txs: Vec<Transaction>) -> Block {
    let coinbase = Transaction::coinbase(REWARD, pk(MINER)).with_lock_time(tag);
    Block::new(parent.hash(), coinbase, txs, parent.header.timestamp + 1)
}

/// Retained nodes in a stable order, so a proptest index picks the same one every run
fn sorted_nodes(chain: &ChainState) -> Vec<ChainNode> {
    let mut nodes: Vec<ChainNode> = chain.nodes().cloned().collect();
    nodes.sort_by_key(|node| (node.height(), node.hash()));
    nodes
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Value is only created by coinbases, and the tip set is the batch result plus the coinbase
    #[test]
    fn prop_transfers_conserve_value(
        rounds in prop::collection::vec(
            prop::collection::vec((1..=PARTIES, 1..=PARTIES, 1i64..60), 0..4),
            1..6
        )
    ) {
        let genesis = funded_genesis();
        let mut chain = ChainState::new(genesis);

        for (round, transfers) in rounds.iter().enumerate() {
            let tip = chain.max_height_block().clone();
            let base = chain.max_height_utxo_set().clone();

            let mut candidates = Vec::new();
            for &(from, to, value) in transfers {
                let Some((outpoint, output)) = base
                    .outputs_owned_by(&pk(from))
                    .into_iter()
                    .find(|(_, output)| output.value >= value)
                else {
                    continue;
                };
                let mut outputs = vec![TxOutput::new(value, pk(to))];
                if output.value > value {
                    outputs.push(TxOutput::new(output.value - value, pk(from)));
                }
                let mut tx = Transaction::new(vec![TxInput::unsigned(outpoint)], outputs);
                tx.sign_input(0, &key(from)).unwrap();
                candidates.push(tx);
            }

            let outcome = apply_batch(&candidates, base);
            let block = child(&tip, round as u32 + 1, outcome.accepted.clone());
            prop_assert!(chain.add_block(&block));

            let mut expected = outcome.utxo_set;
            for (outpoint, output) in block.coinbase.created_outputs() {
                expected.add(outpoint, output.clone()).unwrap();
            }
            prop_assert_eq!(chain.max_height_utxo_set(), &expected);

            for tx in &outcome.accepted {
                for input in &tx.inputs {
                    prop_assert!(!expected.contains(&input.prev_out));
                }
            }
        }

        let minted = ALLOCATION as i128 * PARTIES as i128 + REWARD as i128 * rounds.len() as i128;
        prop_assert_eq!(chain.max_height_utxo_set().total_value(), minted);
    }

    /// Every retained node stays inside (max - cut, max], whatever branch it is on
    #[test]
    fn prop_retention_window_holds(
        cut_off_age in 1u64..6,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..40)
    ) {
        let config = ChainConfig::with_cut_off_age(cut_off_age).unwrap();
        let mut chain = ChainState::with_config(funded_genesis(), config);
        let mut previous_max = 0;

        for (tag, pick) in picks.iter().enumerate() {
            let nodes = sorted_nodes(&chain);
            let parent = pick.get(&nodes);
            let block = child(parent.block(), tag as u32, vec![]);

            prop_assert_eq!(chain.try_add_block(&block), Ok(parent.height() + 1));

            let max = chain.max_height();
            prop_assert!(max >= previous_max);
            previous_max = max;

            for node in chain.nodes() {
                prop_assert!(node.height() <= max);
                if max >= cut_off_age {
                    prop_assert!(node.height() > max - cut_off_age);
                }
                // Genesis allocations plus one coinbase per block on the path
                prop_assert_eq!(node.utxo_set().len() as u64, PARTIES as u64 + node.height());
            }
            prop_assert!(chain.contains_block(&chain.max_height_block().hash()));
        }
    }

    /// A block on a height-k ancestor is accepted exactly when k is still above the floor
    #[test]
    fn prop_cutoff_rejection(length in 0u32..25, ancestor in 0usize..25) {
        let genesis = funded_genesis();
        let mut chain = ChainState::new(genesis.clone());

        let mut path = vec![genesis];
        for tag in 1..=length {
            let block = child(path.last().unwrap(), tag, vec![]);
            prop_assert!(chain.add_block(&block));
            path.push(block);
        }

        let ancestor = ancestor.min(path.len() - 1);
        let late = child(&path[ancestor], 1_000, vec![]);
        let max = length as u64;
        let expected = max < CUT_OFF_AGE || ancestor as u64 > max - CUT_OFF_AGE;

        let before = chain.clone();
        let accepted = chain.add_block(&late);
        prop_assert_eq!(accepted, expected);
        if !accepted {
            prop_assert_eq!(chain, before);
        }
    }

    /// Of several transactions spending the same output, only the first in batch order survives
    #[test]
    fn prop_batch_never_double_spends(recipients in prop::collection::vec(1..=PARTIES, 2..6)) {
        let genesis = funded_genesis();
        let chain = ChainState::new(genesis.clone());
        let contested = genesis.coinbase.outpoint(0);

        let candidates: Vec<Transaction> = recipients
            .iter()
            .enumerate()
            .map(|(i, &to)| {
                let mut tx = Transaction::new(
                    vec![TxInput::unsigned(contested)],
                    vec![TxOutput::new(ALLOCATION - i as i64, pk(to))],
                );
                tx.sign_input(0, &key(1)).unwrap();
                tx
            })
            .collect();

        let outcome = apply_batch(&candidates, chain.max_height_utxo_set().clone());
        prop_assert_eq!(outcome.accepted.len(), 1);
        prop_assert_eq!(&outcome.accepted[0], &candidates[0]);
        prop_assert_eq!(outcome.rejected.len(), candidates.len() - 1);
        prop_assert!(!outcome.utxo_set.contains(&contested));
    }

    /// Signatures never change a transaction's id
    #[test]
    fn prop_signing_keeps_id(value in 1i64..1_000, signer in 1..=PARTIES) {
        let genesis = funded_genesis();
        let mut tx = Transaction::new(
            vec![TxInput::unsigned(genesis.coinbase.outpoint(0))],
            vec![TxOutput::new(value, pk(MINER))],
        );
        let before = tx.hash();
        tx.sign_input(0, &key(signer)).unwrap();
        prop_assert_eq!(tx.hash(), before);
    }
}
