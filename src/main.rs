// stagevest - operator command line for a persisted distribution

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use stagevest::bulk::{BulkMintCodec, BulkMintRecord};
use stagevest::distribution::{
    Allocation, Distribution, DistributionConfig, DistributionError, FixedClock, Stage, SystemClock,
};
use stagevest::identity::Address;
use stagevest::ledger::{Amount, Parity};
use stagevest::storage::LedgerStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// Staged distribution ledger
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "stagevest")]
struct Cli {
    /// Database directory
    #[arg(long, default_value = "stagevest.db", env = "STAGEVEST_DB")]
    db: PathBuf,

    /// JSON config file used by `init` (defaults to the built-in schedule)
    #[arg(short, long, env = "STAGEVEST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a distribution, optionally minting an allocation table
    Init {
        /// JSON array of { "account": "0x..", "amount": "..." }
        #[arg(long)]
        allocations: Option<PathBuf>,
        /// Replace an existing distribution
        #[arg(long)]
        force: bool,
    },
    /// Show stage, ceiling and supply totals
    Status,
    /// Show one account
    Balance { account: Address },
    /// Mint to one account
    Mint { account: Address, amount: Amount },
    /// Mint a hex-encoded bulk record
    MintBulk { record: String },
    /// Encode ACCOUNT=AMOUNT pairs as a bulk record
    EncodeBulk {
        #[arg(required = true)]
        pairs: Vec<String>,
        /// Emit base64 instead of hex
        #[arg(long)]
        base64: bool,
    },
    /// Transfer spendable units (to the treasury: redeem)
    Transfer {
        #[arg(long)]
        from: Address,
        #[arg(long)]
        to: Address,
        #[arg(long)]
        amount: Amount,
    },
    /// Set an allowance
    Approve {
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        spender: Address,
        #[arg(long)]
        amount: Amount,
    },
    /// Spend an allowance
    TransferFrom {
        #[arg(long)]
        spender: Address,
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        to: Address,
        #[arg(long)]
        amount: Amount,
    },
    /// Raise an allowance
    IncreaseAllowance {
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        spender: Address,
        #[arg(long)]
        amount: Amount,
    },
    /// Lower an allowance
    DecreaseAllowance {
        #[arg(long)]
        owner: Address,
        #[arg(long)]
        spender: Address,
        #[arg(long)]
        amount: Amount,
    },
    /// Release an account's unlocked claims
    Unlock { account: Address },
    /// Release every eligible account of one parity cohort
    UnlockAll {
        #[arg(long, value_enum)]
        parity: CliParity,
    },
    /// Enter the next stage
    Advance {
        /// Stage the distribution must currently be in
        #[arg(long)]
        expected: Stage,
        /// Evaluate time gates at this Unix timestamp instead of now
        #[arg(long)]
        at: Option<i64>,
    },
    /// Print the event log as JSON lines
    History { account: Option<Address> },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliParity {
    Even,
    Odd,
}

impl From<CliParity> for Parity {
    fn from(parity: CliParity) -> Self {
        match parity {
            CliParity::Even => Parity::Even,
            CliParity::Odd => Parity::Odd,
        }
    }
}

fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        if let Some(rejected) = err.downcast_ref::<DistributionError>() {
            warn!(retry = ?rejected.retry_hint(), "Operation rejected: {}", rejected);
        }
        return Err(err);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    if let Command::EncodeBulk { pairs, base64 } = &cli.command {
        let record = parse_bulk_pairs(pairs)?;
        if *base64 {
            println!("{}", BulkMintCodec::encode_base64(&record));
        } else {
            println!("{}", BulkMintCodec::encode_hex(&record));
        }
        return Ok(());
    }

    let store = LedgerStore::open(&cli.db)
        .with_context(|| format!("opening store at {}", cli.db.display()))?;

    if let Command::Init { allocations, force } = &cli.command {
        return init(&store, cli.config.as_ref(), allocations.as_ref(), *force);
    }

    let mut distribution = store
        .load_distribution(SystemClock)?
        .context("no distribution in store; run `stagevest init` first")?;

    let mut entered = None;
    match cli.command {
        Command::Init { .. } | Command::EncodeBulk { .. } => return Ok(()),
        Command::Status => {
            println!("stage:   {}", distribution.active_stage());
            match distribution.current_mint_ceiling() {
                Some(ceiling) => println!("ceiling: {}", ceiling),
                None => println!("ceiling: unbounded"),
            }
            println!("{}", serde_json::to_string_pretty(&distribution.supply())?);
            return Ok(());
        }
        Command::Balance { account } => {
            println!("account:    {}", account);
            println!("index:      {:?}", distribution.registration_index_of(&account));
            println!("spendable:  {}", distribution.spendable_balance_of(&account));
            println!("locked:     {}", distribution.locked_balance_of(&account));
            println!("releasable: {}", distribution.releasable_of(&account));
            return Ok(());
        }
        Command::History { account } => {
            let records: Vec<_> = match account {
                Some(account) => {
                    let mut records = store.events_for(&account)?;
                    records.extend(distribution.history_for(&account).cloned());
                    records
                }
                None => {
                    let mut records = store.events()?;
                    records.extend_from_slice(distribution.history());
                    records
                }
            };
            for record in records {
                println!("{}", serde_json::to_string(&record)?);
            }
            return Ok(());
        }
        Command::Mint { account, amount } => {
            let receipt = distribution.mint(account, amount)?;
            info!(%account, spendable = receipt.spendable, locked = receipt.locked, "Mint committed");
        }
        Command::MintBulk { record } => {
            let record = BulkMintCodec::decode_hex(&record)?;
            let receipts = distribution.mint_bulk(&record)?;
            info!(entries = receipts.len(), "Bulk mint committed");
        }
        Command::Transfer { from, to, amount } => {
            let outcome = distribution.transfer(from, to, amount)?;
            info!(?outcome, "Transfer committed");
        }
        Command::Approve {
            owner,
            spender,
            amount,
        } => distribution.approve(owner, spender, amount),
        Command::TransferFrom {
            spender,
            owner,
            to,
            amount,
        } => {
            let outcome = distribution.transfer_from(spender, owner, to, amount)?;
            info!(?outcome, "Transfer committed");
        }
        Command::IncreaseAllowance {
            owner,
            spender,
            amount,
        } => {
            let allowance = distribution.increase_allowance(owner, spender, amount)?;
            info!(allowance, "Allowance raised");
        }
        Command::DecreaseAllowance {
            owner,
            spender,
            amount,
        } => {
            let allowance = distribution.decrease_allowance(owner, spender, amount)?;
            info!(allowance, "Allowance lowered");
        }
        Command::Unlock { account } => {
            let amount = distribution.unlock(account)?;
            info!(%account, amount, "Unlock committed");
        }
        Command::UnlockAll { parity } => {
            let summary = distribution.unlock_all(parity.into())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Advance { expected, at } => {
            let report = match at {
                Some(timestamp) => {
                    let bytes = distribution.to_bytes()?;
                    let mut pinned = Distribution::from_bytes(&bytes, FixedClock::new(timestamp))?;
                    let report = pinned.advance_stage(expected)?;
                    distribution = pinned;
                    report
                }
                None => distribution.advance_stage(expected)?,
            };
            entered = Some(report.to);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    let digest = store.save_distribution(&mut distribution)?;
    if let Some(stage) = entered {
        store.save_checkpoint(stage, &distribution)?;
    }
    store.flush()?;
    info!(digest = %hex::encode(digest), "State saved");
    Ok(())
}

fn init(
    store: &LedgerStore,
    config_path: Option<&PathBuf>,
    allocations_path: Option<&PathBuf>,
    force: bool,
) -> Result<()> {
    if store.has_distribution()? && !force {
        bail!("store already holds a distribution; pass --force to replace it");
    }

    let config = match config_path {
        Some(path) => DistributionConfig::load(path)?,
        None => DistributionConfig::default(),
    };
    let allocations = match allocations_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Allocation::list_from_json(&json)?
        }
        None => Vec::new(),
    };

    let mut distribution = Distribution::with_allocations(config.clone(), SystemClock, &allocations)?;
    if force {
        store.clear()?;
    }
    store.save_config(&config)?;
    let digest = store.save_distribution(&mut distribution)?;
    store.save_checkpoint(distribution.active_stage(), &distribution)?;
    store.flush()?;

    info!(
        allocations = allocations.len(),
        total_minted = distribution.total_minted(),
        digest = %hex::encode(digest),
        "Distribution initialised"
    );
    Ok(())
}

fn parse_bulk_pairs(pairs: &[String]) -> Result<BulkMintRecord> {
    let parsed = pairs
        .iter()
        .map(|pair| {
            let (account, amount) = pair
                .split_once('=')
                .with_context(|| format!("expected ACCOUNT=AMOUNT, got {}", pair))?;
            let account: Address = account.parse()?;
            let amount: Amount = amount
                .trim()
                .parse()
                .with_context(|| format!("invalid amount in {}", pair))?;
            Ok((account, amount))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(BulkMintRecord::from_pairs(&parsed)?)
}
