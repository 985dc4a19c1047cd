//! Reefdapp CLI - drive the connection controller without a browser
//!
//!   reefdapp simulate --address 5F... --balance 2000000000000 --balance 5000000000000
//!   reefdapp simulate --address 5F... --claimed --balance 0
//!   reefdapp simulate --address 5F... --balance 5000000000000 --bind 5F...
//!   reefdapp advisory 5F...
//!
//! Every event the controller emits is printed as one JSON line:
//!   {"event": "balance-value", "detail": "2"}

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::channel::mpsc::UnboundedReceiver;
use reefdapp::core::bus::drain;
use reefdapp::logging::{init_logging_with, LogFormat};
use reefdapp::{
    ChannelBus, ConnectionController, DappConfig, DappEvent, InboundEvent, MemoryExtension, MemoryGateway,
    MemorySigner,
};
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "reefdapp", version, about = "Minimal Reef DApp connection controller")]
struct Cli {
    /// Log as JSON lines on stderr (or set REEFDAPP_LOG_JSON=1)
    #[arg(long, global = true)]
    log_json: bool,

    /// Pretty-print emitted events
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay balances for one signer and print the resulting UI events
    Simulate(SimulateArgs),
    /// Print the funding advisory shown to an unfunded signer
    Advisory {
        address: String,
        #[command(flatten)]
        token: TokenArgs,
    },
}

#[derive(Args)]
struct TokenArgs {
    /// App name announced to the extension
    #[arg(long, env = "REEFDAPP_APP", default_value = reefdapp::core::config::DEFAULT_APP_NAME)]
    app: String,
    /// Token fractional-unit exponent
    #[arg(long, env = "REEFDAPP_DECIMALS", default_value_t = reefdapp::core::config::REEF_DECIMALS)]
    decimals: u32,
    /// Whole-token balance needed before an unclaimed signer counts as connected
    #[arg(long, env = "REEFDAPP_THRESHOLD", default_value_t = reefdapp::core::config::DEFAULT_FUNDING_THRESHOLD)]
    threshold: u64,
}

impl TokenArgs {
    fn config(&self) -> DappConfig {
        DappConfig::new(self.app.clone())
            .with_decimals(self.decimals)
            .with_funding_threshold(self.threshold)
    }
}

#[derive(Args)]
struct SimulateArgs {
    /// Substrate address of the simulated signer
    #[arg(long)]
    address: String,
    /// Raw free balance in the smallest unit (repeat for successive updates)
    #[arg(long = "balance")]
    balances: Vec<String>,
    /// Signer already has an EVM address bound
    #[arg(long)]
    claimed: bool,
    /// Request an EVM bind for this address after the balances
    #[arg(long)]
    bind: Option<String>,
    /// Make the EVM claim transaction fail with this reason
    #[arg(long)]
    fail_claim: Option<String>,
    /// Simulate a browser without the wallet extension
    #[arg(long)]
    no_extension: bool,
    #[command(flatten)]
    token: TokenArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging_with(if cli.log_json { LogFormat::Json } else { LogFormat::from_env() });

    match &cli.command {
        Command::Simulate(args) => simulate(args, cli.pretty).await,
        Command::Advisory { address, token } => {
            println!("{}", token.config().funding_advisory(address));
            Ok(())
        }
    }
}

async fn simulate(args: &SimulateArgs, pretty: bool) -> anyhow::Result<()> {
    let bus = ChannelBus::new();
    let mut events = bus.subscribe();
    let controller = ConnectionController::new(args.token.config(), Rc::new(bus)).context("invalid configuration")?;

    let mut balances = args.balances.iter();
    let mut signer = MemorySigner::new(args.address.clone()).with_evm_claimed(args.claimed);
    if let Some(first) = balances.next() {
        signer = signer.with_balance(first.clone());
    }
    if let Some(reason) = &args.fail_claim {
        signer = signer.failing_claim(reason.clone());
    }

    let gateway = if args.no_extension {
        MemoryGateway::missing()
    } else {
        let extension = MemoryExtension::new();
        extension.select(Some(signer.clone()));
        MemoryGateway::new(extension)
    };

    controller.connect(&gateway).await;
    controller.process_pending().await;
    print_events(&mut events, pretty)?;

    for raw in balances {
        signer.push_balance(raw.clone());
        controller.process_pending().await;
        print_events(&mut events, pretty)?;
    }

    if let Some(address) = &args.bind {
        controller.dispatch(InboundEvent::BindEvmAddress(address.clone()));
        controller.process_pending().await;
        print_events(&mut events, pretty)?;
    }

    tracing::info!(phase = controller.phase().as_str(), "simulation finished");
    Ok(())
}

fn print_events(rx: &mut UnboundedReceiver<DappEvent>, pretty: bool) -> anyhow::Result<()> {
    for event in drain(rx) {
        let line = if pretty {
            serde_json::to_string_pretty(&event.to_json())?
        } else {
            serde_json::to_string(&event.to_json())?
        };
        println!("{}", line);
    }
    Ok(())
}
