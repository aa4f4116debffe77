use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sorteo::adapters::FixedClock;
use sorteo::{
    DrawResult, DrawStatus, SorteoConfig, SorteoEngine, SorteoError, TicketStatus, TierId,
};
use std::collections::HashSet;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 20).unwrap()
}

fn sample_config() -> SorteoConfig {
    let path = format!("{}/sorteo.toml", env!("CARGO_MANIFEST_DIR"));
    SorteoConfig::from_file(path).unwrap()
}

fn sample_engine() -> SorteoEngine {
    SorteoEngine::from_config_with_clock(&sample_config(), Box::new(FixedClock::new(today())))
        .unwrap()
}

fn all_numbers(engine: &SorteoEngine) -> Vec<u32> {
    engine
        .tickets(None)
        .unwrap()
        .iter()
        .map(|row| row.ticket.number())
        .collect()
}

#[test]
fn test_lookup_by_cuit_or_dni() {
    let engine = sample_engine();

    assert_eq!(engine.find_client("30-71234567-8").unwrap().id(), "1");
    assert_eq!(engine.find_client("30712345678").unwrap().id(), "1");
    assert_eq!(engine.find_client("31987654").unwrap().id(), "2");
    assert_eq!(engine.find_client("20-40567891-3").unwrap().id(), "3");

    let missing = engine.find_client("99-99999999-9").unwrap_err();
    assert!(matches!(missing, SorteoError::ClientNotFound { .. }));
    assert_eq!(missing.user_friendly_message(), "No match found");
}

#[test]
fn test_progress_for_diamante_client() {
    let engine = sample_engine();
    let client = engine.find_client("27345678").unwrap();

    assert_eq!(client.category(), TierId::Diamante);
    let progress = engine.progress(&client).unwrap();
    assert_eq!(progress.tickets_earned, 9);
    assert_eq!(progress.current_residual, dec!(2500));
    assert_eq!(progress.threshold, dec!(5000));
    assert_eq!(progress.percentage, dec!(50));
}

#[test]
fn test_seeded_clients_are_fully_issued() {
    let engine = sample_engine();

    for client_id in ["1", "2", "3"] {
        assert!(engine.issue_tickets_if_due(client_id).unwrap().is_empty());
    }

    let active: Vec<u32> = engine
        .active_tickets("1")
        .unwrap()
        .iter()
        .map(|t| t.number())
        .collect();
    assert_eq!(active, vec![1042, 1043, 1044, 2187, 2188, 2189, 3501, 3502]);

    let consumed = engine.consumed_tickets("1").unwrap();
    assert_eq!(consumed.len(), 1);
    assert_eq!(consumed[0].number(), 1045);
    assert_eq!(consumed[0].draw_id(), Some("s1"));
}

#[test]
fn test_billing_issues_ticket_after_highest_number() {
    let engine = sample_engine();

    let minted = engine.record_billing("3", dec!(12000)).unwrap();
    assert_eq!(minted.len(), 1);
    assert_eq!(minted[0].number(), 3503);
    assert_eq!(minted[0].id(), "n14");
    assert_eq!(minted[0].assigned_at(), today());
    assert_eq!(minted[0].status(), TicketStatus::Active);

    let client = engine.client("3").unwrap();
    assert_eq!(client.total_billed(), dec!(30000));
    assert_eq!(client.active_tickets().len(), 2);

    // Nothing new until the next threshold is crossed.
    assert!(engine.record_billing("3", dec!(14999.99)).unwrap().is_empty());
    assert!(engine.issue_tickets_if_due("3").unwrap().is_empty());
}

#[test]
fn test_finalize_upcoming_draw() {
    let engine = sample_engine();
    let before = engine.summary().unwrap();
    assert_eq!(before.next_draw.as_deref(), Some("Sorteo 1er Trimestre 2026"));

    let draw = engine
        .finalize_draw(
            "s3",
            vec![
                DrawResult::new(1042, "p7", "Distribuidora Norte S.A."),
                DrawResult::new(1101, "p8", "Comercial del Sur S.R.L."),
            ],
        )
        .unwrap();

    assert_eq!(draw.status(), DrawStatus::Completed);
    assert_eq!(draw.results().len(), 2);

    let norte = engine.client("1").unwrap();
    let won = norte
        .consumed_tickets()
        .into_iter()
        .find(|t| t.number() == 1042)
        .cloned()
        .unwrap();
    assert_eq!(won.prize_name(), Some("Auto 0km"));
    assert_eq!(won.consumed_at(), NaiveDate::from_ymd_opt(2026, 3, 31));
    assert_eq!(norte.active_tickets().len(), 7);

    let after = engine.summary().unwrap();
    assert_eq!(after.active_tickets, before.active_tickets - 2);
    assert_eq!(after.completed_draws, 3);
    assert_eq!(after.next_draw, None);

    let completed: Vec<String> = engine
        .completed_draws()
        .unwrap()
        .iter()
        .map(|d| d.id().to_string())
        .collect();
    assert_eq!(completed, vec!["s3", "s2", "s1"]);
}

#[test]
fn test_finalize_with_unknown_ticket_changes_nothing() {
    let engine = sample_engine();
    let before = engine.tickets(None).unwrap();

    let result = engine.finalize_draw(
        "s3",
        vec![
            DrawResult::new(1042, "p7", "Distribuidora Norte S.A."),
            DrawResult::new(9999, "p8", "Nadie S.A."),
        ],
    );

    assert!(matches!(
        result,
        Err(SorteoError::UnknownTicketNumber { number: 9999, .. })
    ));
    assert_eq!(engine.draw("s3").unwrap().status(), DrawStatus::Upcoming);
    assert_eq!(engine.tickets(None).unwrap(), before);
}

#[test]
fn test_completed_draw_cannot_be_finalized_again() {
    let engine = sample_engine();
    let before = engine.tickets(None).unwrap();

    let result = engine.finalize_draw(
        "s1",
        vec![DrawResult::new(2200, "p2", "Comercial del Sur S.R.L.")],
    );
    assert!(matches!(result, Err(SorteoError::AlreadyFinalized { .. })));
    assert_eq!(engine.tickets(None).unwrap(), before);
}

#[test]
fn test_ticket_numbers_stay_unique_across_clients() {
    let engine = sample_engine();

    for (client_id, amount) in [("1", dec!(25000)), ("2", dec!(41000)), ("3", dec!(60000))] {
        engine.record_billing(client_id, amount).unwrap();
    }

    let numbers = all_numbers(&engine);
    let unique: HashSet<u32> = numbers.iter().copied().collect();
    assert_eq!(unique.len(), numbers.len());
    assert_eq!(numbers.len(), 13 + 5 + 4 + 4);
}

#[test]
fn test_concurrent_billing_and_reads() {
    let engine = std::sync::Arc::new(sample_engine());

    let writers: Vec<_> = ["1", "2", "3"]
        .into_iter()
        .map(|client_id| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..20 {
                    engine.record_billing(client_id, dec!(2500)).unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..20 {
                    let client = engine.find_client("30-71234567-8").unwrap();
                    let progress = engine.progress(&client).unwrap();
                    assert!(progress.current_residual < progress.threshold);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    // 20 x 2500 = 50000 more for everyone.
    let expected = [("1", dec!(97500), 19), ("2", dec!(82000), 8), ("3", dec!(68000), 4)];
    for (client_id, total, issued) in expected {
        let client = engine.client(client_id).unwrap();
        assert_eq!(client.total_billed(), total);
        assert_eq!(client.tickets().len(), issued);
    }

    let numbers = all_numbers(&engine);
    let unique: HashSet<u32> = numbers.iter().copied().collect();
    assert_eq!(unique.len(), numbers.len());
}

#[test]
fn test_non_positive_billing_rejected() {
    let engine = sample_engine();
    assert!(matches!(
        engine.record_billing("2", Decimal::ZERO),
        Err(SorteoError::ValidationError { .. })
    ));
    assert_eq!(engine.client("2").unwrap().total_billed(), dec!(32000));
}

#[test]
fn test_search_and_listing() {
    let engine = sample_engine();

    let found = engine.search_clients("córdoba").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), "3");
    assert_eq!(engine.search_clients("").unwrap().len(), 3);

    let consumed = engine.tickets(Some(TicketStatus::Consumed)).unwrap();
    assert_eq!(consumed.len(), 1);
    assert_eq!(consumed[0].client_name, "Distribuidora Norte S.A.");

    let numbers = all_numbers(&engine);
    let mut sorted = numbers.clone();
    sorted.sort_unstable();
    assert_eq!(numbers, sorted);
}

#[test]
fn test_rules_in_threshold_order() {
    let engine = sample_engine();
    let thresholds: Vec<Decimal> = engine.rules().iter().map(|r| r.threshold_usd).collect();
    assert_eq!(thresholds, vec![dec!(5000), dec!(10000), dec!(15000), dec!(20000)]);
}

#[test]
fn test_saved_snapshot_reloads_after_changes() {
    let engine = sample_engine();
    engine.record_billing("2", dec!(8000)).unwrap();
    engine
        .finalize_draw(
            "s3",
            vec![DrawResult::new(2200, "p7", "Comercial del Sur S.R.L.")],
        )
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sorteo.toml");
    engine.snapshot().unwrap().save(&path).unwrap();

    let reloaded = SorteoEngine::from_config_with_clock(
        &SorteoConfig::from_file(&path).unwrap(),
        Box::new(FixedClock::new(today())),
    )
    .unwrap();

    let client = reloaded.client("2").unwrap();
    assert_eq!(client.total_billed(), dec!(40000));
    assert_eq!(client.active_tickets().len(), 3);
    assert_eq!(client.consumed_tickets()[0].prize_name(), Some("Auto 0km"));
    assert_eq!(reloaded.draw("s3").unwrap().status(), DrawStatus::Completed);
    assert_eq!(reloaded.tickets(None).unwrap(), engine.tickets(None).unwrap());

    // Numbering continues after the highest ticket in the saved file.
    let minted = reloaded.record_billing("2", dec!(10000)).unwrap();
    assert_eq!(minted[0].number(), 3504);
}

#[test]
fn test_export_csv_to_file() {
    let engine = sample_engine();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tickets.csv");

    let rows = engine.tickets(None).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    let written = sorteo::core::export::write_tickets_csv(file, &rows).unwrap();
    assert_eq!(written, 13);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 14);
    assert!(lines[1].starts_with("1042,n1,1,Distribuidora Norte S.A.,DIAMANTE,active"));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("1045,n4,1,") && l.contains("consumed") && l.contains(",s1,")));
}

#[test]
fn test_exact_lookup_when_normalization_disabled() {
    let mut config = sample_config();
    config.lookup.normalize_identifiers = false;
    let engine =
        SorteoEngine::from_config_with_clock(&config, Box::new(FixedClock::new(today()))).unwrap();

    assert_eq!(engine.find_client("30-71234567-8").unwrap().id(), "1");
    assert!(matches!(
        engine.find_client("30712345678"),
        Err(SorteoError::ClientNotFound { .. })
    ));
}

#[test]
fn test_missing_tier_rule_reported_on_progress() {
    let mut config = sample_config();
    config.categories.retain(|rule| rule.category != TierId::Plata);
    let engine =
        SorteoEngine::from_config_with_clock(&config, Box::new(FixedClock::new(today()))).unwrap();

    let client = engine.client("3").unwrap();
    assert!(matches!(
        engine.progress(&client),
        Err(SorteoError::UnknownCategory { .. })
    ));
    assert!(matches!(
        engine.record_billing("3", dec!(1000)),
        Err(SorteoError::UnknownCategory { .. })
    ));
    assert_eq!(engine.client("3").unwrap().total_billed(), dec!(18000));
}

#[test]
fn test_huge_billing_rejected_and_engine_stays_usable() {
    let engine = std::sync::Arc::new(sample_engine());

    let writer = engine.clone();
    let outcome = std::thread::spawn(move || writer.record_billing("1", Decimal::MAX))
        .join()
        .unwrap();
    assert!(matches!(outcome, Err(SorteoError::ValidationError { .. })));

    let client = engine.find_client("27345678").unwrap();
    assert_eq!(client.total_billed(), dec!(47500));
    assert_eq!(engine.tickets(None).unwrap().len(), 13);
    assert_eq!(engine.record_billing("1", dec!(2500)).unwrap().len(), 1);
}
