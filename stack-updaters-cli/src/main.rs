use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{error, info, warn};
use stack_updaters_provisioning::{
    render_assume_role_policy, AccountId, AwsEngine, AwsSettings, CallerIdentity,
    ProvisionConfig, ProvisionOutcome, ProvisioningService, ResourceKind,
};

#[derive(Parser, Debug)]
#[command(
    name = "stack-updaters",
    version,
    about = "Provision the IAM user, access key, group and AssumeRole policy used by CI/CD stack updates"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update the resources in the caller's AWS account
    Up {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        aws: AwsArgs,

        /// Include the secret access key in the output when a new key is created
        #[arg(long)]
        show_secret: bool,
    },

    /// Show the declarations a run would submit, without changing anything
    Preview {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        aws: AwsArgs,

        /// Account to preview for; resolved through STS when omitted
        #[arg(long, env = "STACK_UPDATERS_ACCOUNT")]
        account: Option<String>,

        /// Partition used with --account
        #[arg(long, default_value = "aws")]
        partition: String,
    },

    /// Print the AssumeRole group policy for an account
    Policy {
        #[arg(long)]
        account: String,

        #[arg(long, default_value = "aws")]
        partition: String,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// JSON file with resource names; flags below override it
    #[arg(long = "config", env = "STACK_UPDATERS_CONFIG")]
    config_file: Option<PathBuf>,

    #[arg(long, env = "STACK_UPDATERS_USER_NAME")]
    user_name: Option<String>,

    #[arg(long, env = "STACK_UPDATERS_USER_PATH")]
    user_path: Option<String>,

    /// Tag on the CI user, repeatable; overrides a configured tag with the same key
    #[arg(long = "user-tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    user_tags: Vec<(String, String)>,

    #[arg(long, env = "STACK_UPDATERS_GROUP_NAME")]
    group_name: Option<String>,

    #[arg(long, env = "STACK_UPDATERS_MEMBERSHIP_NAME")]
    membership_name: Option<String>,

    #[arg(long, env = "STACK_UPDATERS_POLICY_NAME")]
    policy_name: Option<String>,

    /// Abort unless the credentials belong to this account
    #[arg(long, env = "STACK_UPDATERS_EXPECTED_ACCOUNT")]
    expected_account: Option<String>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<ProvisionConfig> {
        let mut config = match &self.config_file {
            Some(path) => ProvisionConfig::from_file(path)?,
            None => ProvisionConfig::default(),
        };
        if let Some(user_name) = &self.user_name {
            config.user_name = user_name.clone();
        }
        if let Some(user_path) = &self.user_path {
            config.user_path = user_path.clone();
        }
        config.user_tags.extend(self.user_tags.iter().cloned());
        if let Some(group_name) = &self.group_name {
            config.group_name = group_name.clone();
        }
        if let Some(membership_name) = &self.membership_name {
            config.membership_name = membership_name.clone();
        }
        if let Some(policy_name) = &self.policy_name {
            config.policy_name = policy_name.clone();
        }
        if let Some(account) = &self.expected_account {
            config.expected_account = Some(AccountId::parse(account)?);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[derive(Args, Debug)]
struct AwsArgs {
    /// Named profile from the shared AWS config
    #[arg(long)]
    profile: Option<String>,

    #[arg(long)]
    region: Option<String>,
}

impl From<&AwsArgs> for AwsSettings {
    fn from(args: &AwsArgs) -> Self {
        Self {
            profile: args.profile.clone(),
            region: args.region.clone(),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Up {
            config,
            aws,
            show_secret,
        } => {
            let config = config.resolve()?;
            let service = ProvisioningService::aws(config, &AwsSettings::from(&aws)).await;
            let outcome = service.run().await.context("Provisioning run failed")?;
            print_summary(&outcome, show_secret);
            print_json(&outcome_json(&outcome, show_secret)?)
        }
        Command::Preview {
            config,
            aws,
            account,
            partition,
        } => {
            let config = config.resolve()?;
            let identity = match account {
                Some(account) => CallerIdentity::for_account(AccountId::parse(&account)?, &partition),
                None => AwsEngine::from_settings(&AwsSettings::from(&aws))
                    .await
                    .resolve_identity()
                    .await
                    .context("Failed to resolve caller identity for preview")?,
            };
            info!("Previewing for account {}", identity.account);
            let outcome = ProvisioningService::preview(config, identity).run().await?;
            print_json(&serde_json::to_value(&outcome)?)
        }
        Command::Policy { account, partition } => {
            let account = AccountId::parse(&account)?;
            let policy = render_assume_role_policy(&partition, &account)?;
            println!("{policy}");
            Ok(())
        }
    }
}

fn outcome_json(outcome: &ProvisionOutcome, show_secret: bool) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(outcome)?;
    if show_secret {
        if let Some(secret) = outcome
            .resource(ResourceKind::AccessKey)
            .and_then(|key| key.secret_access_key.as_deref())
        {
            value["secretAccessKey"] = serde_json::Value::String(secret.to_string());
        }
    }
    Ok(value)
}

fn print_summary(outcome: &ProvisionOutcome, show_secret: bool) {
    eprintln!(
        "Provisioned {} resources in account {}:",
        outcome.resources.len(),
        outcome.identity.account
    );
    for resource in &outcome.resources {
        eprintln!(
            "  {:<16} {:<28} {}",
            resource.kind().to_string(),
            resource.logical_name(),
            resource.id
        );
    }
    if let Some(key) = outcome.resource(ResourceKind::AccessKey) {
        match &key.secret_access_key {
            None => eprintln!("Access key {} was reused; its secret is not shown again.", key.id),
            Some(_) if !show_secret => warn!(
                "Access key {} was created without --show-secret; its secret cannot be retrieved later",
                key.id
            ),
            Some(_) => {}
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}
