use std::sync::Arc;

use habitloop::config::AppConfig;
use habitloop::llm::{GenerationClient, create_provider};
use habitloop::onboarding::{
    AnswerField, AnswerValue, Entitlements, FallbackPolicy, OnboardingOrchestrator,
    OnboardingRouteState, OnboardingService, OnboardingStep, OrchestratorConfig,
    onboarding_routes,
};
use habitloop::store::{CommitmentStore, LibSqlCommitmentStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();

    let provider = match &config.llm {
        Some(llm_config) => Some(create_provider(llm_config)?),
        None => None,
    };

    eprintln!("🌱 HabitLoop v{}", env!("CARGO_PKG_VERSION"));
    match &config.llm {
        Some(llm) => eprintln!("   Model: {} ({})", llm.model, llm.base_url),
        None => eprintln!("   Model: none (OPENAI_API_KEY not set, fallback only)"),
    }
    eprintln!(
        "   Generation timeout: {}ms",
        config.generation.timeout.as_millis()
    );
    if let Some(delay) = config.generation.simulated_delay {
        eprintln!("   Simulated delay: {}ms", delay.as_millis());
    }
    eprintln!("   Free mode: {}", config.free_mode);

    let service = Arc::new(OnboardingService::new(
        GenerationClient::new(provider, config.generation.clone()),
        FallbackPolicy::default(),
    ));

    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("demo") {
        let user_id = args.next().unwrap_or_else(|| "demo-user".to_string());
        return run_demo(&config, service, &user_id).await;
    }

    eprintln!("   API: http://0.0.0.0:{}/onboarding/summary", config.port);
    eprintln!("   API: http://0.0.0.0:{}/onboarding/recommendations\n", config.port);

    let app = onboarding_routes(OnboardingRouteState {
        service,
        free_mode: config.free_mode,
    });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Walk one scripted onboarding session in-process and persist the result.
async fn run_demo(
    config: &AppConfig,
    service: Arc<OnboardingService>,
    user_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn CommitmentStore> =
        Arc::new(LibSqlCommitmentStore::new_local(&config.db_path).await?);
    eprintln!("   Database: {}\n", config.db_path.display());

    let orchestrator = OnboardingOrchestrator::new(
        service,
        Some(Arc::clone(&store)),
        OrchestratorConfig {
            entitlements: Entitlements {
                free_mode: config.free_mode,
                premium: false,
            },
            ..OrchestratorConfig::default()
        },
    );

    let tags = |items: &[&str]| AnswerValue::Tags(items.iter().map(|s| s.to_string()).collect());
    let answers = [
        (AnswerField::LifeRoles, tags(&["professional", "parent"])),
        (AnswerField::ActivePressures, tags(&["work deadlines"])),
        (AnswerField::FocusDomains, tags(&["fitness", "sleep"])),
        (AnswerField::StrugglePatterns, tags(&["losing momentum"])),
        (AnswerField::RewardStyles, tags(&["streaks"])),
        (AnswerField::ChangeStyle, AnswerValue::Text("micro steps".into())),
        (AnswerField::EmotionalState, AnswerValue::Text("hopeful".into())),
        (AnswerField::TonePreferences, tags(&["warm"])),
        (AnswerField::AccountabilityLevel, AnswerValue::Text("moderate".into())),
    ];
    for (field, value) in answers {
        orchestrator.update_answer(field, value).await;
    }

    while orchestrator.step().await != OnboardingStep::Recommendations {
        orchestrator.advance().await?;
    }

    if let Some(profile) = orchestrator.wait_profile().await {
        eprintln!("Profile ({}): {}", profile.source, profile.value.profile_name);
        for strength in &profile.value.strengths {
            eprintln!("  + {strength}");
        }
        for risk in &profile.value.risk_zones {
            eprintln!("  ! {risk}");
        }
    }

    if let Some(recommendations) = orchestrator.wait_recommendations().await {
        eprintln!(
            "\n{} recommendations ({})",
            recommendations.value.len(),
            recommendations.source
        );
    }

    let created = orchestrator.complete(user_id).await?;
    eprintln!("\nCommitments for {user_id}:");
    for commitment in &created {
        eprintln!(
            "  - {} [{} / {}]: {}",
            commitment.title, commitment.cadence, commitment.proof_mode, commitment.reason
        );
    }
    Ok(())
}
