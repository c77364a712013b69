use callwarden::classifier::{HttpClassifier, KeywordClassifier, RemoteClassifier};
use callwarden::config::Config;
use callwarden::decision::DecisionEngine;
use callwarden::gateway::log_only::{
    LogCalendar, LogEmail, LogTelephony, MemoryRecordStore, StaticUserDirectory,
};
use callwarden::orchestrator::AnalysisOrchestrator;
use callwarden::screening::{CallMonitor, CallScreener};
use callwarden::stats::{StatEvent, StatsCollector, StatsSnapshot};
use callwarden::types::CallContext;
use callwarden::workflow::executors::{standard_registry, ExecutorDeps};
use callwarden::workflow::WorkflowEngine;
use clap::{Arg, Command};
use log::LevelFilter;
use std::path::Path;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("callwarden")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Real-time inbound call screening: heuristic fraud scoring, fused intent analysis, and rule-driven call workflows")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/callwarden.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate configuration and workflow definitions")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("analyze-transcript")
                .long("analyze-transcript")
                .value_name("FILE")
                .help("Run a transcript file through the screening pipeline and print the decision")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .help("Run in demonstration mode (simulate call screening)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Show screening statistics")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        let config = Config::default();
        match config.to_file(generate_path) {
            Ok(()) => {
                println!("Generated default configuration at {generate_path}");
                return;
            }
            Err(e) => {
                eprintln!("Failed to generate configuration: {e}");
                process::exit(1);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = if Path::new(config_path).exists() {
        match Config::from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration from {config_path}: {e}");
                process::exit(1);
            }
        }
    } else {
        log::warn!("no configuration at {config_path}, using built-in defaults");
        Config::default()
    };

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    if matches.get_flag("stats") {
        show_stats(&config);
        return;
    }

    if let Some(transcript_path) = matches.get_one::<String>("analyze-transcript") {
        analyze_transcript(&config, transcript_path).await;
        return;
    }

    // Default action (and --demo): simulate screening against the log-only
    // collaborators. Telephony integration is an external concern.
    run_demo(&config).await;
}

fn build_classifier(config: &Config) -> Arc<dyn RemoteClassifier> {
    match &config.classifier.endpoint {
        Some(endpoint) => match HttpClassifier::new(endpoint, config.classifier.timeout_seconds) {
            Ok(classifier) => {
                log::info!("using remote classifier at {endpoint}");
                Arc::new(classifier)
            }
            Err(e) => {
                log::warn!("could not build remote classifier ({e}), using local keywords");
                Arc::new(KeywordClassifier::new())
            }
        },
        None => {
            log::info!("no classifier endpoint configured, using local keywords");
            Arc::new(KeywordClassifier::new())
        }
    }
}

fn build_workflow_engine(config: &Config) -> WorkflowEngine {
    let records = Arc::new(MemoryRecordStore::new());
    let registry = standard_registry(ExecutorDeps {
        telephony: Arc::new(LogTelephony),
        users: Arc::new(StaticUserDirectory {
            user_id: config.user.id.clone(),
            phone_number: config.user.phone_number.clone(),
        }),
        email: Arc::new(LogEmail),
        calendar: Arc::new(LogCalendar),
        records,
    });

    let mut engine = WorkflowEngine::new(registry);
    for workflow in config.workflows.clone() {
        let id = workflow.id.clone();
        if let Err(e) = engine.register(workflow) {
            // One bad workflow never takes the rest down.
            log::error!("workflow '{id}' not registered: {e}");
        }
    }
    engine
}

fn test_config(config: &Config) {
    println!("User: {} ({})", config.user.name, config.user.id);
    println!("Contacts: {}", config.contacts.len());
    println!("Workflow entries: {}", config.workflows.len());

    let engine = build_workflow_engine(config);
    let registered = engine.workflow_count();
    println!("Workflows registered: {registered}");

    if registered < config.workflows.len() {
        eprintln!(
            "{} workflow(s) failed validation, see log output",
            config.workflows.len() - registered
        );
        process::exit(1);
    }
    println!("Configuration is valid");
}

fn show_stats(config: &Config) {
    let Some(path) = &config.stats.path else {
        println!("No stats path configured");
        return;
    };
    match StatsSnapshot::load(Path::new(path)) {
        Ok(snapshot) => println!("{}", snapshot.summary()),
        Err(e) => {
            eprintln!("Could not load stats: {e}");
            process::exit(1);
        }
    }
}

async fn analyze_transcript(config: &Config, transcript_path: &str) {
    let transcript = match std::fs::read_to_string(transcript_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Could not read {transcript_path}: {e}");
            process::exit(1);
        }
    };

    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        build_classifier(config),
        Arc::new(config.build_contacts()),
    ));
    let ctx = CallContext::new("cli-analysis", &config.user.id, "+10000000000")
        .with_user_name(&config.user.name)
        .with_transcript(transcript.trim());

    let assessment = orchestrator.analyze(&ctx).await;
    let decision = DecisionEngine::new().decide(&assessment, &config.user.name);

    println!("Assessment:");
    println!("  fraud score: {:.2}", assessment.fraud_score);
    println!("  scam type:   {}", assessment.scam_type.as_deref().unwrap_or("-"));
    println!("  red flags:   {}", assessment.red_flags.join(", "));
    println!(
        "  intent:      {} ({:.2})",
        assessment.intent, assessment.intent_confidence
    );
    println!("  recommends:  {}", assessment.recommendation.as_str());
    println!("Decision: {} ({})", decision.action.as_str(), decision.reason);
    println!("Message: {}", decision.message);
}

async fn run_demo(config: &Config) {
    println!("callwarden demo: screening simulated calls\n");

    let classifier = build_classifier(config);
    let contacts = Arc::new(config.build_contacts());
    let orchestrator = Arc::new(AnalysisOrchestrator::new(classifier, contacts));
    let screener = CallScreener::new(orchestrator.clone());
    let workflows = build_workflow_engine(config);
    let stats = StatsCollector::new(
        config.stats.path.clone().map(Into::into),
        config.stats.flush_interval_seconds,
    );

    let calls = [
        (
            "CA-demo-1",
            "+15550200000",
            Some("John Smith"),
            "Hey, it's John! Are we still on for coffee tomorrow?",
        ),
        (
            "CA-demo-2",
            "+15550300000",
            None,
            "This is the IRS. There is a warrant for your arrest. You must act now \
             and confirm your social security number, or legal action will be taken. \
             Pay immediately by wire transfer or gift card.",
        ),
        (
            "CA-demo-3",
            "+15550400000",
            None,
            "Hello, I'm calling about your vehicle's extended warranty. This is a \
             limited time promotion for renewing your coverage.",
        ),
        (
            "CA-demo-4",
            "+15550500000",
            Some("Dr. Lee's office"),
            "Hi, this is Dr. Lee's office calling to reschedule your appointment \
             for next week.",
        ),
    ];

    for (call_id, caller_number, caller_name, transcript) in calls {
        let mut ctx = CallContext::new(call_id, &config.user.id, caller_number)
            .with_user_name(&config.user.name)
            .with_transcript(transcript);
        if let Some(name) = caller_name {
            ctx = ctx.with_caller_name(name);
        }

        println!("-- call {call_id} from {caller_number}");
        let decision = screener.screen_call(&ctx).await;
        println!("   decision: {} ({})", decision.action.as_str(), decision.reason);
        println!("   message:  {}", decision.message);

        // Feed the richer context into the workflow layer.
        let assessment = orchestrator.analyze(&ctx).await;
        ctx.intent = assessment.intent;
        ctx.intent_confidence = assessment.intent_confidence;
        ctx.fraud_score = assessment.fraud_score;

        let result = workflows.execute_for_call(&ctx).await;
        match &result.workflow_id {
            Some(id) => println!(
                "   workflow: {id} -> {:?} (completed: {}, failed: {})",
                result.final_action,
                result.actions_completed.join(","),
                result.actions_failed.join(",")
            ),
            None => println!("   workflow: none matched, screening continues"),
        }

        stats.record(StatEvent::Decision {
            action: decision.action,
            reason: decision.reason.clone(),
            scam_type: assessment.scam_type.clone(),
        });
        println!();
    }

    // Ongoing-call monitoring: a transcript update that turns hostile gets
    // re-analyzed; hanging up cancels the in-flight pass.
    println!("-- ongoing call monitoring");
    let (monitor, mut updates) = CallMonitor::new(orchestrator);
    let ongoing = CallContext::new("CA-demo-5", &config.user.id, "+15550600000")
        .with_user_name(&config.user.name)
        .with_transcript(
            "So as I was saying, this is the IRS and there is a warrant out for you. \
             We need gift cards right now.",
        );
    monitor.transcript_updated(ongoing);
    if let Some(update) = updates.recv().await {
        println!(
            "   call {}: should_block={} (score {:.2})",
            update.call_id, update.analysis.should_block, update.analysis.fraud_score
        );
    }
    monitor.call_ended("CA-demo-5");

    stats.shutdown().await;
    println!("\ndemo complete");
}
