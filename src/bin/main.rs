use chainease_payments::{
    analysis::{GeminiAnalyzer, MockAnalyzer, TransactionAnalyzer},
    config::AppConfig,
    sequencer::{run_settlement, SequenceEvent, SETTLEMENT_PHASES},
    session::{Effect, Session},
    views::{DashboardView, SmartReviewView, StatusView, TransactionForm},
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    // usage: demo [amount] [recipient...]
    let mut args = std::env::args().skip(1);
    let amount = args.next().unwrap_or_else(|| "45.00".to_string());
    let recipient = {
        let rest: Vec<String> = args.collect();
        if rest.is_empty() {
            "Starlight Coffee".to_string()
        } else {
            rest.join(" ")
        }
    };

    let analyzer: Box<dyn TransactionAnalyzer> = if config.has_api_key() {
        Box::new(GeminiAnalyzer::new(&config)?)
    } else {
        Box::new(MockAnalyzer)
    };

    let mut session = Session::default();

    println!("\n=== CHAINEASE ===");
    println!("Available Capital: ${:.2}", session.balance());
    for tx in session.ledger().iter().take(3) {
        println!("  {:<20} {:>12} -${:.2}", tx.recipient, tx.date, tx.amount);
    }

    session.apply(DashboardView::send())?;

    let mut form = TransactionForm {
        amount,
        recipient,
        error: None,
    };
    let intent = match form.submit(session.balance()) {
        Ok(intent) => intent,
        Err(e) => {
            eprintln!("Transfer rejected: {}", e);
            session.apply(TransactionForm::cancel())?;
            return Ok(());
        }
    };

    let Effect::Analyze(request) = session.apply(intent)? else {
        return Err("submit did not request an analysis".into());
    };

    info!(amount = request.amount, recipient = %request.recipient, "Running safety analysis");
    let analysis = analyzer
        .analyze(request.amount, &request.recipient, request.balance)
        .await;
    session.resolve_analysis(request.review_id, analysis);

    if let Some(analysis) = session.analysis() {
        let result = analysis.result();
        println!("\n=== VERIFICATION ===");
        println!("${:.2} to {}", request.amount, request.recipient);
        if !result.is_new_recipient {
            println!("[Verified Contact]");
        }
        println!("Safety score: {}", result.safety_score);
        println!("{}", result.advice);
        for point in &result.reasoning {
            println!("  • {}", point);
        }
        println!("Smart Automations:");
        for automation in &result.applied_automations {
            println!("  [{:?}] {}: {}", automation.status, automation.rule_name, automation.message);
        }
        println!("Ref: {}", result.transparency_note);
        if analysis.is_fallback() {
            println!("(offline review)");
        }
    }

    let Effect::Settled(tx) = session.apply(SmartReviewView::confirm())? else {
        return Err("confirm did not settle a transaction".into());
    };

    println!("\n=== SETTLEMENT ===");
    println!("{} • ${:.2} to {}", tx.id, tx.amount, tx.recipient);
    println!("  → {}", SETTLEMENT_PHASES[0].label);

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_settlement(events_tx));

    while let Some(event) = events_rx.recv().await {
        match event {
            SequenceEvent::PhaseEntered(index) => {
                let phase = &SETTLEMENT_PHASES[index];
                println!("  → {} ({})", phase.label, phase.reassurance);
            }
            SequenceEvent::DoneAvailable => println!("  ✓ Transfer finalized"),
        }
    }

    if let Some(image) = analyzer.generate_receipt_image(tx.amount, &tx.recipient).await {
        println!("Receipt image: {} bytes ({})", image.bytes.len(), image.mime_type);
    }

    session.apply(StatusView::done())?;

    println!("\n=== DASHBOARD ===");
    println!("Available Capital: ${:.2}", session.balance());
    for tx in session.ledger().iter().take(3) {
        println!("  {:<20} {:>12} -${:.2}", tx.recipient, tx.date, tx.amount);
    }

    Ok(())
}
