// xbridge - run a simulated transfer across a locking and an issuing chain

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use xchain_bridge::claims::ClaimRef;
use xchain_bridge::identity::{AccountId, Keypair};
use xchain_bridge::registry::{Amount, Asset, BridgeKey, BridgeSpec, ChainSide, SignerList};
use xchain_bridge::settlement::ClaimRequest;
use xchain_bridge::witness::{AttestationRequest, WitnessConfig, WitnessNode, WitnessPool};
use xchain_bridge::{BridgeError, BridgeNetwork, NetworkConfig};

const FUNDING: i64 = 1_000_000_000;

#[derive(Parser)]
#[command(name = "xbridge", about = "Cross-chain bridge attestation and settlement simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move funds through a ClaimID: create, commit, attest, claim
    Transfer(TransferArgs),
    /// Fund a new account on the issuing chain through an account-create commit
    AccountCreate(AccountCreateArgs),
}

#[derive(Args, Clone)]
struct WitnessArgs {
    /// Number of witnesses on the signer list
    #[arg(long, default_value_t = 5)]
    witnesses: usize,
    /// Signer weight required for quorum (every signer has weight 1)
    #[arg(long, default_value_t = 4)]
    quorum: u32,
    /// Witnesses to stop before attesting
    #[arg(long, default_value_t = 0)]
    stopped: usize,
    /// Signature reward in drops
    #[arg(long, default_value_t = 100)]
    reward: i64,
    /// Directory for witness databases
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Args)]
struct TransferArgs {
    #[command(flatten)]
    witness: WitnessArgs,
    /// Amount committed on the locking chain
    #[arg(long, default_value_t = 740)]
    amount: i64,
    /// Amount claimed on the issuing chain (defaults to the committed amount)
    #[arg(long)]
    claim_amount: Option<i64>,
}

#[derive(Args)]
struct AccountCreateArgs {
    #[command(flatten)]
    witness: WitnessArgs,
    /// Amount committed for the new account
    #[arg(long, default_value_t = 20_000_000)]
    amount: i64,
    /// Minimum account-create amount on the bridge
    #[arg(long, default_value_t = 10_000_000)]
    min_create: i64,
}

struct Setup {
    network: BridgeNetwork,
    bridge: BridgeKey,
    pool: WitnessPool,
    alice: AccountId,
    bob: AccountId,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Transfer(args) => transfer(args).await,
        Commands::AccountCreate(args) => account_create(args).await,
    };

    if let Err(e) = result {
        error!(error = %e, class = ?e.class(), "run failed");
        std::process::exit(1);
    }
}

fn account(seed: &str) -> AccountId {
    AccountId::from_public_key(&Keypair::from_seed(seed).public_key())
}

fn setup(args: &WitnessArgs, min_create: Option<i64>) -> Result<Setup, BridgeError> {
    let issuing_master = account("issuing-master");
    let mut network = BridgeNetwork::new(account("locking-master"), issuing_master, NetworkConfig::new())?;

    let locking_door = account("locking-door");
    let alice = account("alice");
    let bob = account("bob");
    network.chain_mut(ChainSide::Locking).fund(locking_door, FUNDING)?;
    network.chain_mut(ChainSide::Locking).fund(alice, FUNDING)?;
    network.chain_mut(ChainSide::Issuing).fund(bob, FUNDING)?;

    let mut nodes = Vec::with_capacity(args.witnesses);
    for i in 0..args.witnesses {
        let mut config = WitnessConfig::new(&format!("witness-{}", i));
        if let Some(dir) = &args.data_dir {
            config = config.with_db_path(dir.join(format!("witness-{}", i)));
        }
        let node = WitnessNode::new(
            config,
            Keypair::from_seed(&format!("witness-{}", i)),
            account(&format!("reward-{}", i)),
        )?;
        nodes.push(node);
    }
    let pool = WitnessPool::new(nodes);

    let signers = SignerList::uniform(&pool.accounts(), args.quorum)
        .map_err(xchain_bridge::registry::RegistryError::from)?;
    let bridge = BridgeKey::new(locking_door, Asset::Native, issuing_master, Asset::Native);
    network.register_bridge(BridgeSpec {
        key: bridge.clone(),
        signature_reward: Amount::native(args.reward),
        min_account_create: min_create.map(Amount::native),
        signers,
    })?;

    for node in pool.nodes().iter().take(args.stopped) {
        node.stop();
    }

    Ok(Setup {
        network,
        bridge,
        pool,
        alice,
        bob,
    })
}

async fn attest_and_submit(
    setup: &mut Setup,
    request: AttestationRequest,
    submitter: AccountId,
) {
    let history = setup.network.history(ChainSide::Locking);
    for (signer, result) in setup.pool.attest_all(history, request).await {
        match result {
            Ok(attestation) => match setup.network.submit_attestation(&attestation, submitter) {
                Ok(outcome) => {
                    info!(
                        %signer,
                        status = ?outcome.state.status,
                        weight = outcome.state.leading_weight,
                        threshold = outcome.state.threshold,
                        "attestation submitted"
                    );
                    if let Some(settlement) = outcome.settlement {
                        info!(outcome = ?settlement, "settlement attempted");
                    }
                }
                // late attestations for a resolved reference are expected
                Err(e) => warn!(%signer, error = %e, class = ?e.class(), "attestation refused"),
            },
            Err(e) => info!(%signer, error = %e, "witness did not attest"),
        }
    }
}

async fn transfer(args: TransferArgs) -> Result<(), BridgeError> {
    let mut setup = setup(&args.witness, None)?;
    let before = setup.network.snapshot();
    let mark = setup.network.mark();

    let (alice, bob, bridge) = (setup.alice, setup.bob, setup.bridge.clone());
    let reward = Amount::native(args.witness.reward);
    let claim = setup
        .network
        .create_claim(&bridge, ChainSide::Issuing, bob, &reward, Some(alice))?;
    let amount = Amount::native(args.amount);
    setup
        .network
        .commit(&bridge, ChainSide::Locking, alice, claim.id(), &amount, None)?;

    let request = AttestationRequest::new(bridge.clone(), ClaimRef::Claim(claim.id()), alice, amount);
    attest_and_submit(&mut setup, request, bob).await;

    let claim_request = ClaimRequest {
        bridge,
        claim_id: claim.id(),
        submitter: bob,
        destination: bob,
        amount: Amount::native(args.claim_amount.unwrap_or(args.amount)),
    };
    match setup.network.claim(ChainSide::Issuing, &claim_request) {
        Ok(settlement) => info!(
            claim = %settlement.key,
            amount = %settlement.amount,
            signers = settlement.contributors.len(),
            "transfer settled"
        ),
        Err(e) => error!(error = %e, class = ?e.class(), "claim failed"),
    }

    let after = setup.network.snapshot();
    setup.network.expected_since(mark).verify(&before, &after)?;
    info!("balances reconciled");
    Ok(())
}

async fn account_create(args: AccountCreateArgs) -> Result<(), BridgeError> {
    let mut setup = setup(&args.witness, Some(args.min_create))?;
    let before = setup.network.snapshot();
    let mark = setup.network.mark();

    let (alice, bob, bridge) = (setup.alice, setup.bob, setup.bridge.clone());
    let carol = account("carol");
    let amount = Amount::native(args.amount);
    let commitment = setup.network.commit_account_create(
        &bridge,
        ChainSide::Locking,
        alice,
        carol,
        &amount,
        &Amount::native(args.witness.reward),
    )?;

    let request = AttestationRequest::new(bridge, commitment.reference, alice, amount);
    attest_and_submit(&mut setup, request, bob).await;

    info!(
        account = %carol,
        balance = setup.network.chain(ChainSide::Issuing).native_balance(&carol),
        "account create finished"
    );

    let after = setup.network.snapshot();
    setup.network.expected_since(mark).verify(&before, &after)?;
    info!("balances reconciled");
    Ok(())
}
