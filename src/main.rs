//! Ledger simulator
//!
//! Drives the chain kernel the way a mining layer would: queue transfers,
//! assemble blocks from the pending pool on top of the tallest node, submit
//! them, and report the final chain statistics as JSON.

use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use utxo_ledger::consensus::{apply_batch, Block};
use utxo_ledger::crypto::{PrivateKey, PublicKey};
use utxo_ledger::node::create_genesis_block;
use utxo_ledger::storage::{ChainState, SharedChainState, UnspentOutputSet};
use utxo_ledger::validation::{Amount, Transaction, TxInput, TxOutput};
use utxo_ledger::ChainConfig;

const BLOCK_REWARD: Amount = 25;
const GENESIS_ALLOCATION: Amount = 100;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with chain settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of blocks to build on the main branch
    #[arg(long, default_value_t = 12)]
    blocks: u32,

    /// Value sent from one party to the other in every block
    #[arg(long, default_value_t = 7)]
    transfer: Amount,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ChainConfig::load(path)?,
        None => ChainConfig::default(),
    };

    let alice = PrivateKey::generate();
    let bob = PrivateKey::generate();
    let miner = PrivateKey::generate().public_key();

    let genesis = create_genesis_block(&[(alice.public_key(), GENESIS_ALLOCATION)], unix_now());
    let genesis_hash = genesis.hash();
    let chain = SharedChainState::new(ChainState::with_config(genesis, config));

    let parties = [&alice, &bob];
    for round in 0..cli.blocks {
        let (tip, utxo_set) = chain.mining_template();

        let sender = parties[round as usize % 2];
        let receiver = parties[(round as usize + 1) % 2].public_key();
        match pay(&utxo_set, sender, receiver, cli.transfer) {
            Some(tx) => {
                chain.add_transaction(tx);
            }
            None => warn!(round, "sender has no output large enough"),
        }

        let block = assemble_block(&tip, &utxo_set, chain.pending_transactions(), miner, round);
        match chain.try_add_block(&block) {
            Ok(height) => info!(height, "submitted block accepted"),
            Err(reason) => warn!(%reason, "submitted block rejected"),
        }

        // A competing sibling at the same height loses the tie
        if round == 1 {
            let rival = assemble_block(&tip, &utxo_set, Vec::new(), bob.public_key(), round);
            if chain.add_block(&rival) {
                info!(tip = %chain.max_height_block().hash().short(), "rival kept as side branch");
            }
        }
    }

    // Genesis is far behind the tip by now
    let late = Block::new(genesis_hash, Transaction::coinbase(BLOCK_REWARD, miner), Vec::new(), unix_now());
    if let Err(reason) = chain.try_add_block(&late) {
        info!(%reason, "late extension of genesis refused");
    }

    let stats = chain.stats();
    let tip_set = chain.max_height_utxo_set();
    info!(
        alice = %tip_set.balance_of(&alice.public_key()),
        bob = %tip_set.balance_of(&bob.public_key()),
        miner = %tip_set.balance_of(&miner),
        "final balances"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Build a block on `tip` from the pending transactions the batch rules accept
fn assemble_block(
    tip: &Block,
    utxo_set: &UnspentOutputSet,
    pending: Vec<Transaction>,
    miner: PublicKey,
    round: u32,
) -> Block {
    let accepted = apply_batch(&pending, utxo_set.clone()).accepted;
    // Lock time keeps every coinbase id distinct
    let coinbase = Transaction::coinbase(BLOCK_REWARD, miner).with_lock_time(round + 1);
    Block::new(tip.hash(), coinbase, accepted, unix_now()).with_nonce(miner.0[0] as u64)
}

/// Spend one output of `from` that covers `value`, returning change to `from`
fn pay(set: &UnspentOutputSet, from: &PrivateKey, to: PublicKey, value: Amount) -> Option<Transaction> {
    let (outpoint, output) = set
        .outputs_owned_by(&from.public_key())
        .into_iter()
        .find(|(_, output)| output.value >= value)?;

    let mut outputs = vec![TxOutput::new(value, to)];
    let change = output.value - value;
    if change > 0 {
        outputs.push(TxOutput::new(change, from.public_key()));
    }

    let mut tx = Transaction::new(vec![TxInput::unsigned(outpoint)], outputs);
    tx.sign_input(0, from).ok()?;
    Some(tx)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
