//! Command implementations: live quoting, backtest, simulate, self-test.

use crate::config::{AppConfig, EnvSettings};
use anyhow::Context;
use maker_backtest::{BacktestConfig, BacktestEngine, BacktestOutcome};
use maker_core::{now_ms, Balance, BookLevel, HistoricalBar, Market, MarketId, OrderbookSnapshot, Price, Size};
use maker_engine::QuoteEngine;
use maker_oracle::PriceOracle;
use maker_sim::{Scenario, SimConfig, Simulator};
use maker_venue::{PaperVenue, VenueClient, WsVenue};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cadence of synthesized book events in `live --test` dry runs.
const DRY_RUN_BOOK_INTERVAL: Duration = Duration::from_secs(1);

/// `live`: quote continuously until SIGINT/SIGTERM.
pub async fn run_live(config: AppConfig, market: Option<u32>, test_mode: bool) -> anyhow::Result<()> {
    let env = EnvSettings::load()?;
    if env.is_worker {
        info!(worker_id = ?env.worker_id, "running as supervised worker");
    }

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let venue: Arc<dyn VenueClient> = if test_mode {
        info!("dry run: paper venue with simulated books");
        let paper = Arc::new(demo_paper_venue());
        spawn_dry_run_feed(paper.clone(), shutdown.clone());
        paper
    } else {
        let key = env.require_private_key()?;
        info!(
            url = %env.web_server_url,
            rpc = %env.rpc_endpoint,
            "connecting to venue gateway"
        );
        Arc::new(
            WsVenue::connect(&env.web_server_url, key)
                .await
                .context("venue connection failed")?,
        )
    };

    let oracle = if config.oracle.enabled {
        Some(Arc::new(PriceOracle::new(config.oracle.clone())?))
    } else {
        None
    };

    let mut engine = QuoteEngine::new(venue, config.maker.clone(), config.risk.clone(), oracle);
    if let Some(filter) = market_filter(market, &env) {
        info!(markets = ?filter, "restricting to assigned markets");
        engine = engine.with_market_filter(filter);
    }

    engine.start().await.context("engine startup failed")?;
    engine.run(shutdown).await.context("engine loop failed")?;
    info!("live quoting stopped");
    Ok(())
}

/// The `-m` flag narrows further inside a worker's assigned split.
fn market_filter(flag: Option<u32>, env: &EnvSettings) -> Option<Vec<u32>> {
    match (flag, env.worker_markets.clone()) {
        (Some(m), Some(assigned)) => Some(assigned.into_iter().filter(|id| *id == m).collect()),
        (Some(m), None) => Some(vec![m]),
        (None, assigned) => assigned,
    }
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(e) => {
                        error!(error = %e, "failed to install SIGTERM handler");
                        let _ = ctrl_c.await;
                        shutdown.cancel();
                        return;
                    }
                };
            tokio::select! {
                _ = ctrl_c => info!("SIGINT received"),
                _ = sigterm.recv() => info!("SIGTERM received"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("SIGINT received");
        }
        shutdown.cancel();
    });
}

fn demo_paper_venue() -> PaperVenue {
    let venue = PaperVenue::new(vec![Market {
        id: MarketId::new(0),
        symbol: "SOL-PERP".to_string(),
        tick_size: Price::new(0.001),
        min_size: Size::new(0.01),
        max_leverage: 20.0,
    }]);
    venue.set_account(maker_core::AccountView {
        balance: Balance::new(10_000.0, 10_000.0),
        positions: Default::default(),
        margin_fraction: 1.0,
    });
    venue.set_leverage(1.0);
    venue
}

/// Feed the paper venue with books derived from a simulated bar stream.
fn spawn_dry_run_feed(venue: Arc<PaperVenue>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut simulator = Simulator::new(SimConfig::default(), None);
        let bars = simulator.generate(100_000);
        let mut ticker = tokio::time::interval(DRY_RUN_BOOK_INTERVAL);
        for bar in bars {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            venue.push_book(book_from_bar(&bar)).await;
        }
    });
}

fn book_from_bar(bar: &HistoricalBar) -> OrderbookSnapshot {
    let mut book = OrderbookSnapshot::new(MarketId::new(0), now_ms());
    book.bids = vec![
        BookLevel::new(bar.close * 0.999, bar.bid_depth),
        BookLevel::new(bar.close * 0.998, bar.bid_depth),
    ];
    book.asks = vec![
        BookLevel::new(bar.close * 1.001, bar.ask_depth),
        BookLevel::new(bar.close * 1.002, bar.ask_depth),
    ];
    book
}

/// `backtest`: replay a data file or a synthetic stream.
pub fn run_backtest(
    config: AppConfig,
    data: Option<&Path>,
    steps: usize,
    output: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let bars = match data {
        Some(path) => {
            info!(path = %path.display(), "loading bars");
            maker_backtest::load_bars(path)?
        }
        None => {
            info!(steps, "generating synthetic bars");
            Simulator::new(SimConfig::default(), seed).generate(steps)
        }
    };

    let engine = BacktestEngine::new(
        config.maker.clone(),
        config.risk.clone(),
        BacktestConfig {
            seed,
            ..BacktestConfig::default()
        },
    );
    let outcome = engine.run(&bars)?;
    report_outcome(&outcome);

    if let Some(path) = output {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => maker_backtest::export_csv(&outcome, path)?,
            _ => maker_backtest::export_json(&outcome, path)?,
        }
        info!(path = %path.display(), "results exported");
    }
    Ok(())
}

fn report_outcome(outcome: &BacktestOutcome) {
    let r = &outcome.result;
    info!(
        total_pnl = r.total_pnl,
        end_balance = r.end_balance,
        num_trades = r.num_trades,
        win_rate = r.win_rate,
        sharpe = r.sharpe_ratio,
        max_drawdown = r.max_drawdown,
        fill_rate = r.fill_rate,
        "backtest complete"
    );
}

/// `simulate`: generate bars and optionally write them to disk.
pub fn run_simulate(
    steps: usize,
    scenario: Option<Scenario>,
    output: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let mut simulator = Simulator::new(SimConfig::default(), seed);
    if let Some(scenario) = scenario {
        simulator = simulator.with_scenario(scenario);
    }
    let bars = simulator.generate(steps);

    let first = bars.first().map(|b| b.close).unwrap_or(0.0);
    let last = bars.last().map(|b| b.close).unwrap_or(0.0);
    info!(bars = bars.len(), first_close = first, last_close = last, "simulation complete");

    if let Some(path) = output {
        maker_backtest::export_bars(&bars, path)?;
        info!(path = %path.display(), "bars exported");
    }
    Ok(())
}

/// `test`: configuration, credentials, venue connectivity, market listing.
pub async fn run_self_test(config: AppConfig) -> anyhow::Result<()> {
    let mut failures = 0u32;

    // Configuration was validated at load; report it explicitly anyway.
    match config.validate() {
        Ok(()) => info!("config: ok"),
        Err(e) => {
            error!(error = %e, "config: FAILED");
            failures += 1;
        }
    }

    let env = EnvSettings::load()?;
    match env.require_private_key() {
        Ok(_) => info!("credentials: ok"),
        Err(e) => {
            error!(error = %e, "credentials: FAILED");
            failures += 1;
        }
    }

    match env.require_private_key() {
        Ok(key) => match WsVenue::connect(&env.web_server_url, key).await {
            Ok(venue) => {
                info!(url = %env.web_server_url, "venue connectivity: ok");
                match venue.all_markets().await {
                    Ok(markets) => {
                        info!(count = markets.len(), "market listing: ok");
                        for market in markets {
                            info!(id = %market.id, symbol = %market.symbol, "  market");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "market listing: FAILED");
                        failures += 1;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "venue connectivity: FAILED");
                failures += 1;
            }
        },
        Err(_) => warn!("skipping connectivity checks without credentials"),
    }

    if failures > 0 {
        anyhow::bail!("{failures} check(s) failed");
    }
    info!("all checks passed");
    Ok(())
}
