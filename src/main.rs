use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};

use stepgate::backend::InMemoryBackend;
use stepgate::config::EngineConfig;
use stepgate::flow::StepKind;
use stepgate::flows;
use stepgate::resend::TokioClock;
use stepgate::{DefinitionError, FlowController, FlowDefinition, FlowPhase, FlowSnapshot};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FlowKind {
    PhoneLogin,
    EmailVerification,
    AccountDeletion,
    PasscodeCreate,
    PasscodeUpdate,
    PasscodeReset,
}

impl FlowKind {
    fn definition(
        self,
        config: &EngineConfig,
        backend: &Arc<InMemoryBackend>,
        identifier: &str,
    ) -> Result<FlowDefinition, DefinitionError> {
        match self {
            FlowKind::PhoneLogin => flows::phone_login(config, backend.clone()),
            FlowKind::EmailVerification => flows::email_verification(config, backend.clone()),
            FlowKind::AccountDeletion => {
                flows::account_deletion(config, backend.clone(), backend.clone(), identifier)
            }
            FlowKind::PasscodeCreate => flows::passcode_create(config, backend.clone()),
            FlowKind::PasscodeUpdate => flows::passcode_update(config, backend.clone()),
            FlowKind::PasscodeReset => {
                flows::passcode_reset(config, backend.clone(), backend.clone())
            }
        }
    }
}

/// Walk a verification flow against an in-memory backend.
#[derive(Debug, Parser)]
#[command(name = "stepgate", version, about)]
struct Cli {
    #[arg(value_enum)]
    flow: FlowKind,

    /// Phone number typed into identifier steps
    #[arg(long, default_value = "+1 555 010 0100")]
    identifier: String,

    #[arg(long, default_value = "user@example.com")]
    email: String,

    /// Code typed into code steps (defaults to the expected code)
    #[arg(long)]
    code: Option<String>,

    /// Code the backend accepts
    #[arg(long, default_value = "123456")]
    expected_code: String,

    /// Current passcode known to the backend
    #[arg(long, default_value = "1234")]
    passcode: String,

    #[arg(long, default_value = "5678")]
    new_passcode: String,

    /// Config file (default: the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn input_for(&self, step: &str) -> String {
        match step {
            flows::EMAIL => self.email.clone(),
            flows::CODE => self
                .code
                .clone()
                .unwrap_or_else(|| self.expected_code.clone()),
            flows::CURRENT => self.passcode.clone(),
            flows::NEW | flows::CONFIRM => self.new_passcode.clone(),
            _ => self.identifier.clone(),
        }
    }

    fn print(&self, snapshot: &FlowSnapshot) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(snapshot)?);
            return Ok(());
        }

        match &snapshot.step {
            Some(step) => {
                let value = step
                    .text
                    .clone()
                    .or_else(|| step.cells.as_ref().map(|cells| cells.concat()))
                    .unwrap_or_default();
                println!("{} #{} {:<10} {}", snapshot.flow, step.index, step.name, value);
            }
            None => println!("{} {:?}", snapshot.flow, snapshot.phase),
        }
        Ok(())
    }
}

/// Fills and submits steps until the flow leaves its live phases.
async fn run(controller: &FlowController, cli: &Cli) -> anyhow::Result<FlowPhase> {
    let definition = controller.definition();
    loop {
        let index = match controller.phase() {
            FlowPhase::AtStep(index) => index,
            phase => return Ok(phase),
        };
        let step = definition
            .step(index)
            .context("active step is outside the flow")?;

        match step.kind() {
            StepKind::IdentifierInput => controller.set_text(&cli.input_for(step.name()))?,
            StepKind::CodeInput { .. } => controller.paste(&cli.input_for(step.name()))?,
            StepKind::Confirmation => {}
        }
        cli.print(&controller.snapshot())?;

        let phase = controller
            .advance()
            .await
            .with_context(|| format!("cannot continue from step '{}'", step.name()))?;
        if phase == FlowPhase::AtStep(index) {
            if let Some(error) = controller.state().last_error() {
                cli.print(&controller.snapshot())?;
                bail!("step '{}' was rejected: {}", step.name(), error);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stepgate::logging::init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };

    let backend = Arc::new(InMemoryBackend::new(&cli.expected_code).with_passcode(&cli.passcode));
    let definition = cli.flow.definition(&config, &backend, &cli.identifier)?;
    let controller = FlowController::builder(definition)
        .clock(Arc::new(TokioClock::new(config.resend.tick_interval())))
        .submit_timeout(config.submit.timeout())
        .build();

    let phase = run(&controller, &cli).await?;
    cli.print(&controller.snapshot())?;
    tracing::debug!(calls = ?backend.calls(), "Backend calls");

    if phase.is_terminal() {
        controller.acknowledge()?;
    }
    if let FlowPhase::Failure(kind) = phase {
        bail!("flow failed: {}", kind);
    }
    Ok(())
}
