use chrono::{DateTime, TimeZone, Utc};
use marketpulse::application::prediction::{
    DailyWindow, MarketCapBand, PredictionEngine, PredictionGate, PredictionSettings,
    TopPicksAggregator, TopPicksConfig, TrendVolumeHeuristic,
};
use marketpulse::domain::market::timeframe::Timeframe;
use marketpulse::domain::prediction::TimeframeMetrics;
use marketpulse::infrastructure::mock::MockCandleSource;
use marketpulse::infrastructure::observability::Metrics;
use marketpulse::infrastructure::repositories::InMemoryPredictionRepository;
use std::sync::Arc;
use tokio_test::assert_ok;

fn symbols() -> Vec<String> {
    ["BTCUSDT", "ETHUSDT", "SOLUSDT"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0).unwrap()
}

fn engine(repo: Arc<InMemoryPredictionRepository>) -> PredictionEngine {
    PredictionEngine::new(
        Arc::new(MockCandleSource::new(0.3)),
        repo,
        Arc::new(TrendVolumeHeuristic::default()),
        Arc::new(PredictionGate::new(DailyWindow::default())),
        PredictionSettings::default(),
    )
}

#[tokio::test]
async fn test_gated_passes_across_a_day_boundary() -> anyhow::Result<()> {
    let repo = Arc::new(InMemoryPredictionRepository::new());
    let metrics = Metrics::new()?;
    let engine = engine(repo.clone()).with_metrics(metrics.clone());
    let symbols = symbols();

    // inside the daily window: every timeframe is due
    let first = engine.run_due(&symbols, at(10, 0, 5)).await;
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(|r| r.generated.len() == 3 && r.failed == 0));

    // 25 minutes later nothing is due
    assert!(engine.run_due(&symbols, at(10, 0, 30)).await.is_empty());

    // an hour later only 1h
    let hourly = engine.run_due(&symbols, at(10, 1, 5)).await;
    assert_eq!(hourly.len(), 1);
    assert_eq!(hourly[0].timeframe, Timeframe::OneHour);

    // next day's window: daily again, 4h has also elapsed
    let next_day = engine.run_due(&symbols, at(11, 0, 2)).await;
    let timeframes: Vec<Timeframe> = next_day.iter().map(|r| r.timeframe).collect();
    assert_eq!(
        timeframes,
        vec![Timeframe::OneHour, Timeframe::FourHour, Timeframe::OneDay]
    );

    assert_eq!(repo.prediction_count().await, 21);
    assert_eq!(metrics.prediction_count("1h", "generated"), 9.0);
    assert_eq!(metrics.prediction_count("1d", "generated"), 6.0);

    for prediction in next_day.iter().flat_map(|r| &r.generated) {
        assert!(prediction.predicted_change_pct > 0.0);
        assert!((0.0..=95.0).contains(&prediction.confidence_score));
    }
    Ok(())
}

#[tokio::test]
async fn test_high_volatility_widens_move_and_lowers_confidence() {
    let plain_repo = Arc::new(InMemoryPredictionRepository::new());
    let volatile_repo = Arc::new(InMemoryPredictionRepository::new());
    volatile_repo
        .set_timeframe_metrics(
            "BTCUSDT",
            Timeframe::OneHour,
            TimeframeMetrics {
                volatility_score: 90.0,
                average_confidence: None,
            },
        )
        .await;

    let btc = vec!["BTCUSDT".to_string()];
    let plain = engine(plain_repo)
        .generate_for_timeframe(&btc, Timeframe::OneHour)
        .await;
    let volatile = engine(volatile_repo)
        .generate_for_timeframe(&btc, Timeframe::OneHour)
        .await;

    let base = &plain.generated[0];
    let scaled = &volatile.generated[0];
    assert!((scaled.predicted_change_pct - base.predicted_change_pct * 1.5).abs() <= 0.02);
    assert!((scaled.confidence_score - base.confidence_score * 0.85).abs() <= 0.02);
}

#[tokio::test]
async fn test_top_picks_respect_market_cap_band() {
    let repo = Arc::new(InMemoryPredictionRepository::new());
    repo.set_market_cap("BTCUSDT", 1.9e12).await;
    repo.set_market_cap("ETHUSDT", 4.1e11).await;
    repo.set_market_cap("SOLUSDT", 7.0e10).await;

    let engine = engine(repo.clone());
    let reports = engine.run_due(&symbols(), at(10, 0, 5)).await;
    assert_eq!(reports.iter().map(|r| r.generated.len()).sum::<usize>(), 9);

    let aggregator = TopPicksAggregator::new(
        repo.clone(),
        TopPicksConfig {
            band: MarketCapBand {
                min: 1.0e11,
                max: None,
                require_known: true,
            },
            ..TopPicksConfig::default()
        },
    );
    let picks = aggregator.refresh().await;

    let mut pairs: Vec<&str> = picks.iter().map(|p| p.trading_pair.as_str()).collect();
    pairs.sort();
    assert_eq!(pairs, vec!["BTCUSDT", "ETHUSDT"]);
    assert!(picks.windows(2).all(|w| w[0].total_score >= w[1].total_score));

    let stored = repo.top_picks().await;
    assert_eq!(stored.len(), 2);

    // a second pass upserts rather than appending
    aggregator.refresh().await;
    assert_eq!(repo.top_picks().await.len(), 2);

    let ranked = assert_ok!(
        marketpulse::domain::repositories::PredictionRepository::get_top_predictions(
            repo.as_ref(),
            Timeframe::OneDay,
            10,
        )
        .await
    );
    assert_eq!(ranked.len(), 3);
}
