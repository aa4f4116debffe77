use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use sorteo::config::Command;
use sorteo::core::export::write_tickets_csv;
use sorteo::utils::{logger, validation::Validate};
use sorteo::{CliConfig, Client, Draw, SorteoConfig, SorteoEngine, SorteoError, Ticket};

fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::debug!("CLI config: {:?}", cli);

    // 驗證參數
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Invalid arguments: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&cli) {
        match e.downcast_ref::<SorteoError>() {
            Some(err) => {
                tracing::error!(
                    "❌ {:#} (Category: {:?}, Severity: {:?})",
                    e,
                    err.category(),
                    err.severity()
                );
                // 輸出用戶友好的錯誤信息
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 {}", err.recovery_suggestion());

                // 根據錯誤嚴重程度決定退出碼
                std::process::exit(err.severity().exit_code());
            }
            None => {
                tracing::error!("❌ {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run(cli: &CliConfig) -> anyhow::Result<()> {
    let config = SorteoConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config file '{}'", cli.config))?;
    // 建立引擎
    let engine = SorteoEngine::from_config(&config)?;

    match &cli.command {
        Command::Lookup { identifier } => {
            let client = engine.find_client(identifier)?;
            let progress = engine.progress(&client)?;
            if cli.json {
                #[derive(Serialize)]
                struct LookupView<'a> {
                    client: &'a Client,
                    progress: &'a sorteo::Progress,
                }
                print_json(&LookupView {
                    client: &client,
                    progress: &progress,
                })?;
            } else {
                print_client(&client);
                println!(
                    "   Progress: USD {} of {} ({}%)",
                    progress.current_residual,
                    progress.threshold,
                    progress.percentage.round_dp(1)
                );
                print_tickets("Active tickets", &client.active_tickets());
                print_tickets("Winning tickets", &client.consumed_tickets());
            }
        }
        Command::Progress { identifier } => {
            let client = engine.find_client(identifier)?;
            let progress = engine.progress(&client)?;
            if cli.json {
                print_json(&progress)?;
            } else {
                println!("{} ({})", client.name(), client.category().label());
                println!("   Tickets earned:   {}", progress.tickets_earned);
                println!("   Current residual: USD {}", progress.current_residual);
                println!("   Threshold:        USD {}", progress.threshold);
                println!("   Progress:         {}%", progress.percentage.round_dp(1));
                println!("   Missing:          USD {}", progress.remaining_to_next);
            }
        }
        Command::Tickets { client, status } => {
            let mut rows = engine.tickets(*status)?;
            if let Some(identifier) = client {
                let owner = engine.find_client(identifier)?;
                rows.retain(|row| row.ticket.client_id() == owner.id());
            }
            if cli.json {
                print_json(&rows)?;
            } else {
                for row in &rows {
                    println!(
                        "#{:<6} {:<9} {:<30} {}",
                        row.ticket.number(),
                        row.ticket.status(),
                        row.client_name,
                        row.category.label()
                    );
                }
                println!("{} ticket(s)", rows.len());
            }
        }
        Command::Search { query } => {
            let clients = engine.search_clients(query)?;
            if cli.json {
                print_json(&clients)?;
            } else {
                for client in &clients {
                    print_client(client);
                }
                println!("{} client(s)", clients.len());
            }
        }
        Command::Rules => {
            let rules = engine.rules();
            if cli.json {
                print_json(&rules)?;
            } else {
                for rule in &rules {
                    println!(
                        "{:<9} USD {:>8}  {}",
                        rule.category.label(),
                        rule.threshold_usd,
                        rule.description
                    );
                }
            }
        }
        Command::Draws => {
            let draws = engine.draws()?;
            if cli.json {
                print_json(&draws)?;
            } else {
                for draw in &draws {
                    print_draw(draw);
                }
            }
        }
        Command::Summary => {
            let summary = engine.summary()?;
            if cli.json {
                print_json(&summary)?;
            } else {
                println!("{}", summary.program_name);
                println!("   Clients:          {}", summary.clients);
                println!("   Active tickets:   {}", summary.active_tickets);
                println!("   Winning tickets:  {}", summary.consumed_tickets);
                println!("   Completed draws:  {}", summary.completed_draws);
                println!(
                    "   Next draw:        {}",
                    summary.next_draw.as_deref().unwrap_or("—")
                );
            }
        }
        Command::Bill {
            identifier,
            amount,
            save,
        } => {
            let client = engine.find_client(identifier)?;
            let minted = engine.record_billing(client.id(), *amount)?;
            if cli.json {
                print_json(&minted)?;
            } else {
                let refs: Vec<&Ticket> = minted.iter().collect();
                print_tickets("New tickets", &refs);
            }
            if *save {
                engine.snapshot()?.save(&cli.config)?;
            }
        }
        Command::Finalize {
            draw_id,
            results,
            save,
        } => {
            let draw = engine.finalize_draw(draw_id, results.clone())?;
            if cli.json {
                print_json(&draw)?;
            } else {
                print_draw(&draw);
            }
            if *save {
                engine.snapshot()?.save(&cli.config)?;
            }
        }
        Command::Export { output } => {
            let rows = engine.tickets(None)?;
            let file = std::fs::File::create(output)
                .with_context(|| format!("Failed to create '{}'", output.display()))?;
            let written = write_tickets_csv(file, &rows)?;
            println!("📁 {} ticket(s) exported to {}", written, output.display());
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_client(client: &Client) {
    println!(
        "{} [{}] CUIT {} / DNI {}",
        client.name(),
        client.category().label(),
        client.tax_id(),
        client.national_id()
    );
    println!(
        "   Billed: USD {}  Tickets: {} active, {} won",
        client.total_billed(),
        client.active_tickets().len(),
        client.consumed_tickets().len()
    );
}

fn print_tickets(title: &str, tickets: &[&Ticket]) {
    println!("   {} ({}):", title, tickets.len());
    for ticket in tickets {
        match ticket.prize_name() {
            Some(prize) => println!(
                "     #{} won \"{}\" in {}",
                ticket.number(),
                prize,
                ticket.draw_id().unwrap_or_default()
            ),
            None => println!("     #{} since {}", ticket.number(), ticket.assigned_at()),
        }
    }
}

fn print_draw(draw: &Draw) {
    println!("{} ({}) {} [{}]", draw.name(), draw.id(), draw.date(), draw.status());
    for prize in draw.prizes() {
        let winner = draw.results().iter().find(|r| r.prize_id == prize.id);
        match winner {
            Some(result) => println!(
                "   {}. {} → #{} {}",
                prize.position, prize.name, result.ticket_number, result.client_name
            ),
            None => println!("   {}. {}", prize.position, prize.name),
        }
    }
}
