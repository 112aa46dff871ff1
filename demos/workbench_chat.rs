use dotenv::dotenv;
use ledger_workbench::{
    ApiClient, ChatOutcome, FilterCriteria, SessionState, Workbench, WorkbenchConfig,
};
use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

fn print_statements(workbench: &Workbench<ApiClient>) {
    if let Some(notice) = workbench.notice() {
        println!("❌ {}", notice.message());
    }
    match workbench.statements() {
        Some(triple) => {
            let figures = triple.key_figures();
            println!(
                "📊 Revenue: {:?} | Net income: {:?} | Total assets: {:?}",
                figures.total_revenue, figures.net_income, figures.total_assets
            );
        }
        None => println!("📊 No statements on display."),
    }
}

fn parse_filter(args: &[&str]) -> FilterCriteria {
    let arg = |i: usize| {
        args.get(i)
            .copied()
            .filter(|s| *s != "-")
            .unwrap_or_default()
    };
    FilterCriteria::from_inputs(arg(0), arg(1), arg(2))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let config = WorkbenchConfig::from_env()?;
    println!("💬 Connecting to {}\n", config.api_base_url);

    let workbench = Workbench::new(Arc::new(ApiClient::from_config(&config)), &config);
    let mut session = SessionState::with_greeting();

    if let Some(greeting) = session.log().last() {
        println!("🤖 {}\n", greeting.content);
    }
    println!("Commands: :load <file.csv> | :filter <entity|-> <start|-> <end|-> | :clear | :summary | quit");
    println!("------------------------------------------------------------------");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let line = input.trim();

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            ":load" => match parts.get(1) {
                Some(path) => match workbench.upload(&mut session, Path::new(path)).await {
                    Ok(outcome) => {
                        println!("✅ Loaded {} transactions.", outcome.rows);
                        println!("   Entities: {}", session.entities().join(", "));
                        print_statements(&workbench);
                    }
                    Err(e) => eprintln!("❌ Upload failed: {}", e),
                },
                None => eprintln!("Usage: :load <file.csv>"),
            },
            ":filter" => {
                let criteria = parse_filter(&parts[1..]);
                let _ = workbench.change_filter(&mut session, criteria).await;
                println!(
                    "🔍 Showing {} of {} transactions.",
                    session.store().displayed().len(),
                    session.store().all().len()
                );
                print_statements(&workbench);
            }
            ":clear" => {
                let _ = workbench
                    .change_filter(&mut session, FilterCriteria::open())
                    .await;
                print_statements(&workbench);
            }
            ":summary" => {
                let summary = session.summary();
                println!(
                    "🧾 {} rows, {} accounts, {}",
                    summary.total_rows,
                    summary.unique_accounts,
                    summary.date_range_label()
                );
            }
            _ => {
                println!("\nThinking...");
                match workbench.ask(&mut session, line).await {
                    ChatOutcome::Ignored => {}
                    outcome => {
                        println!("\n{}\n", outcome.text().unwrap_or_default());
                        println!(
                            "------------------------------------------------------------------"
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
