use std::error::Error;

use clap::{Args, Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;
use url::Url;

use lumina_client::{
    format_amount, get_amount_liquidity_out, get_amount_out, get_amount_out_from_liquidity,
    get_first_amount_liquidity_out, parse_amount, AmountOutFromLiquidityInput, AmountOutInput,
    DexConfig, FirstLiquidityInput, LiquidityOutInput, Network, Slippage, TokenListClient,
};

#[derive(Parser)]
#[command(name = "lumina-cli")]
#[command(about = "lumina dex quotes and token lists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Output amount and reserve bounds for a swap.
    QuoteSwap {
        #[arg(long)]
        amount_in: String,
        #[arg(long)]
        balance_in: String,
        #[arg(long)]
        balance_out: String,
        #[command(flatten)]
        slippage: SlippageArgs,
    },
    /// Deposit into a pool that already has liquidity.
    QuoteAdd {
        #[arg(long)]
        amount_a: String,
        #[arg(long)]
        balance_a: String,
        #[arg(long)]
        balance_b: String,
        #[arg(long)]
        supply: String,
        #[command(flatten)]
        slippage: SlippageArgs,
    },
    /// First deposit into an empty pool.
    QuoteFirstAdd {
        #[arg(long)]
        amount_a: String,
        #[arg(long)]
        amount_b: String,
    },
    QuoteRemove {
        #[arg(long)]
        liquidity: String,
        #[arg(long)]
        balance_a: String,
        #[arg(long)]
        balance_b: String,
        #[arg(long)]
        supply: String,
        #[command(flatten)]
        slippage: SlippageArgs,
    },
    /// Print the pool token list of a network.
    Tokens {
        #[arg(long)]
        network: Option<String>,
        #[arg(long)]
        url: Option<Url>,
    },
}

#[derive(Args)]
struct SlippageArgs {
    /// Percent, e.g. `0.5`. Defaults to the configured slippage.
    #[arg(long)]
    slippage: Option<String>,
}

impl SlippageArgs {
    fn resolve(&self, config: &DexConfig) -> Result<Slippage, Box<dyn Error>> {
        match &self.slippage {
            Some(value) => Ok(value.parse::<Slippage>()?),
            None => Ok(config.default_slippage),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = DexConfig::load()?;
    match cli.command {
        Commands::QuoteSwap {
            amount_in,
            balance_in,
            balance_out,
            slippage,
        } => {
            let quote = get_amount_out(AmountOutInput {
                amount_in: parse_amount(&amount_in)?,
                balance_in: parse_amount(&balance_in)?,
                balance_out: parse_amount(&balance_out)?,
                slippage: slippage.resolve(&config)?,
            })?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
            println!("amount out: {}", format_amount(quote.amount_out));
        }
        Commands::QuoteAdd {
            amount_a,
            balance_a,
            balance_b,
            supply,
            slippage,
        } => {
            let quote = get_amount_liquidity_out(LiquidityOutInput {
                amount_a_in: parse_amount(&amount_a)?,
                balance_a: parse_amount(&balance_a)?,
                balance_b: parse_amount(&balance_b)?,
                supply: parse_amount(&supply)?,
                slippage: slippage.resolve(&config)?,
            })?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Commands::QuoteFirstAdd { amount_a, amount_b } => {
            let quote = get_first_amount_liquidity_out(FirstLiquidityInput {
                amount_a_in: parse_amount(&amount_a)?,
                amount_b_in: parse_amount(&amount_b)?,
            })?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Commands::QuoteRemove {
            liquidity,
            balance_a,
            balance_b,
            supply,
            slippage,
        } => {
            let quote = get_amount_out_from_liquidity(AmountOutFromLiquidityInput {
                liquidity: parse_amount(&liquidity)?,
                balance_a: parse_amount(&balance_a)?,
                balance_b: parse_amount(&balance_b)?,
                supply: parse_amount(&supply)?,
                slippage: slippage.resolve(&config)?,
            })?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Commands::Tokens { network, url } => {
            let network = match network {
                Some(value) => value.parse::<Network>()?,
                None => config.network,
            };
            let base_url = url
                .or_else(|| config.token_list_url.clone())
                .ok_or("token list url missing: pass --url or set token_list_url")?;
            let mut client = TokenListClient::new(base_url, config.http_timeout)?;
            let tokens = client.fetch_pool_token_list(network).await?;
            println!("{}", serde_json::to_string_pretty(tokens)?);
        }
    }
    Ok(())
}
