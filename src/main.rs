//! Bank Ledger command line
//!
//! ```text
//! bank_ledger [--env dev] --init-schema
//! bank_ledger [--env dev] --create-account <owner> <balance> <currency>
//! bank_ledger [--env dev] --transfer <from_account_id> <to_account_id> <amount>
//! ```

use anyhow::{Context as _, bail};

use bank_ledger::config::AppConfig;
use bank_ledger::db::schema::init_schema;
use bank_ledger::ledger::{AccountRepository, CreateAccountParams};
use bank_ledger::{Context, Database, Store, TransferTxParams};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|a| a == flag)
}

/// The `n` values following `flag`
fn flag_values(flag: &str, n: usize) -> Option<Vec<String>> {
    let args: Vec<String> = std::env::args().collect();
    let pos = args.iter().position(|a| a == flag)?;
    let values = args.get(pos + 1..pos + 1 + n)?;
    Some(values.to_vec())
}

fn parse_i64(value: &str, what: &str) -> anyhow::Result<i64> {
    value
        .parse()
        .with_context(|| format!("{} must be an integer, got '{}'", what, value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = bank_ledger::logging::init_logging(&app_config);

    tracing::info!("Starting bank ledger in {} mode", env);

    let db = Database::connect(&app_config.database)
        .await
        .context("cannot connect to db")?;
    db.health_check().await.context("database health check failed")?;

    if has_flag("--init-schema") {
        init_schema(db.pool()).await.context("schema bootstrap failed")?;
    }

    let store = Store::new(db).with_overdraft_policy(app_config.ledger.overdraft);

    if let Some(values) = flag_values("--create-account", 3) {
        let params = CreateAccountParams {
            owner: values[0].clone(),
            balance: parse_i64(&values[1], "balance")?,
            currency: values[2].clone(),
        };
        let account = AccountRepository::create(store.pool(), &params).await?;
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else if has_flag("--create-account") {
        bail!("usage: --create-account <owner> <balance> <currency>");
    }

    if let Some(values) = flag_values("--transfer", 3) {
        let params = TransferTxParams {
            from_account_id: parse_i64(&values[0], "from_account_id")?,
            to_account_id: parse_i64(&values[1], "to_account_id")?,
            amount: parse_i64(&values[2], "amount")?,
        };
        let ctx = match app_config.ledger.transfer_timeout() {
            Some(timeout) => Context::with_timeout(timeout),
            None => Context::background(),
        };
        let result = store.transfer_tx(&ctx, params).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if has_flag("--transfer") {
        bail!("usage: --transfer <from_account_id> <to_account_id> <amount>");
    }

    Ok(())
}
