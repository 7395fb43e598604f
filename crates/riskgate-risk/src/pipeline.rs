//! The validation pipeline.
//!
//! Stages run in a fixed order and their findings accumulate into one
//! `RiskVerdict`. Only two things abort the run early: a tripped
//! circuit breaker (before any collaborator is touched) and structural
//! defects in the signal itself. Every other stage runs to completion
//! so the verdict reports all problems at once, not just the first.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use riskgate_collab::{MarketData, Storage, ThreatFeed};
use riskgate_core::{AccountId, Price, RiskVerdict, Signal};

use crate::context::RiskContext;
use crate::error::RiskError;
use crate::stages::{
    CorrelationRiskAssessor, DailyLimitsTracker, DrawdownProtector, MarketRiskAssessor,
    PortfolioRiskAssessor, PositionSizer, ResourceGovernor, Stage, StageReport, ThreatGate,
};

/// A verdict plus one metric label per blocking error, taken from the
/// error's stage tag.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub verdict: RiskVerdict,
    pub error_stages: Vec<&'static str>,
}

/// Multi-stage signal validation against one account's book.
pub struct SignalValidationPipeline {
    ctx: Arc<RiskContext>,
    storage: Arc<dyn Storage>,
    market: Arc<dyn MarketData>,
    threats: Arc<dyn ThreatFeed>,
}

impl SignalValidationPipeline {
    pub fn new(
        ctx: Arc<RiskContext>,
        storage: Arc<dyn Storage>,
        market: Arc<dyn MarketData>,
        threats: Arc<dyn ThreatFeed>,
    ) -> Self {
        Self {
            ctx,
            storage,
            market,
            threats,
        }
    }

    pub fn context(&self) -> &Arc<RiskContext> {
        &self.ctx
    }

    /// Validate a signal at the current wall-clock time.
    pub async fn validate(
        &self,
        account: &AccountId,
        signal: &Signal,
        portfolio_value: Price,
    ) -> RiskVerdict {
        self.validate_at(account, signal, portfolio_value, Utc::now())
            .await
            .verdict
    }

    /// Validate a signal at an explicit point in time.
    #[instrument(skip(self, signal), fields(account = %account, symbol = %signal.symbol))]
    pub async fn validate_at(
        &self,
        account: &AccountId,
        signal: &Signal,
        portfolio_value: Price,
        now: DateTime<Utc>,
    ) -> ValidationOutcome {
        let now_ms = now.timestamp_millis();
        let mut verdict = RiskVerdict::new(signal, account.clone());
        verdict.validated_at = now;
        let mut error_stages: Vec<&'static str> = Vec::new();

        // Fast fail while the breaker is tripped. No collaborator is
        // called and no counters move.
        if self.ctx.poll_breaker(now_ms) {
            let remaining = self.ctx.breaker.remaining_cooldown_ms(now_ms);
            let err = RiskError::CircuitOpen(format!("retry in {}ms", remaining));
            error_stages.push(err.stage_label());
            verdict.error(err.to_string());
            return ValidationOutcome {
                verdict,
                error_stages,
            };
        }

        // Serialize the read-check-admit window per account so two
        // concurrent signals cannot both pass the same daily quota.
        let lock = self.ctx.admission_lock(account);
        let _admission = lock.lock().await;

        // Structural defects abort before the signal counts as an
        // attempted trade.
        let mut structural = signal.validate_structure(now);
        if !portfolio_value.is_positive() {
            structural.push(format!("Portfolio value must be positive: {}", portfolio_value));
        }
        if !structural.is_empty() {
            let errors = structural
                .into_iter()
                .map(|msg| {
                    let err = RiskError::Structural(msg);
                    error_stages.push(err.stage_label());
                    err.to_string()
                })
                .collect();
            verdict.absorb(Vec::new(), errors);
            self.ctx.record_failed_attempt(account, now);
            return ValidationOutcome {
                verdict,
                error_stages,
            };
        }

        self.ctx.record_attempt();
        let config = self.ctx.config();

        // Portfolio and correlation both need the open book; a storage
        // failure fails both closed with a single error.
        let mut portfolio_warnings = 0usize;
        let positions = match self.storage.find_active_trades(account).await {
            Ok(positions) => Some(positions),
            Err(err) => {
                let err = RiskError::CollaboratorUnavailable {
                    stage: Stage::Portfolio,
                    dependency: "Position lookup",
                    source: err,
                };
                error_stages.push(err.stage_label());
                verdict.error(err.to_string());
                None
            }
        };

        if let Some(positions) = &positions {
            let (report, trade_risk) =
                PortfolioRiskAssessor::assess(&config, signal, positions, portfolio_value);
            portfolio_warnings = report.warnings.len();
            absorb_report(&mut verdict, &mut error_stages, report);
            self.ctx.add_trade_risk(trade_risk);
        }

        let (report, sized) = PositionSizer::size(&config, signal, portfolio_value);
        absorb_report(&mut verdict, &mut error_stages, report);
        if let Some(amount) = sized {
            verdict.adjusted.shrink_amount(amount);
        }

        if let Some(positions) = &positions {
            let report =
                CorrelationRiskAssessor::assess(&config, signal, positions, self.market.as_ref())
                    .await;
            absorb_report(&mut verdict, &mut error_stages, report);
        }

        let (report, conditions) =
            MarketRiskAssessor::assess(&config, signal, self.market.as_ref()).await;
        let market_warnings = report.warnings.len();
        let volatility = conditions
            .as_ref()
            .map(|c| c.volatility)
            .unwrap_or_default();
        absorb_report(&mut verdict, &mut error_stages, report);

        verdict.set_risk_score(composite_score(
            signal,
            portfolio_warnings,
            market_warnings,
            volatility,
        ));

        let report = DailyLimitsTracker::check(
            &config,
            account,
            now.date_naive(),
            portfolio_value,
            self.storage.as_ref(),
        )
        .await;
        absorb_report(&mut verdict, &mut error_stages, report);

        let (report, drawdown) =
            DrawdownProtector::check(&config, account, portfolio_value, self.storage.as_ref())
                .await;
        absorb_report(&mut verdict, &mut error_stages, report);
        self.ctx.observe_drawdown(drawdown.drawdown);
        if drawdown.trip_breaker {
            self.ctx.trip_breaker(
                &format!("drawdown {} past threshold", drawdown.drawdown),
                now_ms,
            );
        }

        let failed = self.ctx.failed_attempt_count(account);
        let (report, findings) =
            ThreatGate::assess(&config, account, failed, now, self.threats.as_ref()).await;
        self.ctx
            .ingest_threats(findings.suspicious, findings.anomalies);
        absorb_report(&mut verdict, &mut error_stages, report);

        let resources = self.ctx.resources.read().clone();
        let report = ResourceGovernor::check(&config, &resources);
        absorb_report(&mut verdict, &mut error_stages, report);

        if !verdict.valid {
            self.ctx.record_failed_attempt(account, now);
        }

        debug!(
            verdict_id = %verdict.verdict_id,
            valid = verdict.valid,
            risk_score = %verdict.risk_score,
            warnings = verdict.warnings.len(),
            errors = verdict.errors.len(),
            "signal validated"
        );
        ValidationOutcome {
            verdict,
            error_stages,
        }
    }
}

/// Fold one stage report into the verdict, recording each error's
/// metric label alongside.
fn absorb_report(
    verdict: &mut RiskVerdict,
    error_stages: &mut Vec<&'static str>,
    report: StageReport,
) {
    for err in &report.errors {
        error_stages.push(err.stage_label());
    }
    let errors = report.errors.iter().map(|e| e.to_string()).collect();
    verdict.absorb(report.warnings, errors);
}

/// Composite risk score before clamping:
///
/// `(100 - confidence) * 0.1`
/// `+ 5 * portfolio_warnings + 3 * market_warnings`
/// `+ min(leverage * 2, 20)`
/// `+ max(0, volatility - 0.1) * 100`
fn composite_score(
    signal: &Signal,
    portfolio_warnings: usize,
    market_warnings: usize,
    volatility: Decimal,
) -> Decimal {
    let hundred = Decimal::from(100);
    let tenth = Decimal::new(1, 1);

    let confidence_term = (hundred - signal.confidence) * tenth;
    let warning_term = Decimal::from(5 * portfolio_warnings as u64 + 3 * market_warnings as u64);
    let leverage = signal.leverage.unwrap_or(Decimal::ONE);
    let leverage_term = (leverage * Decimal::from(2)).min(Decimal::from(20));
    let volatility_term = (volatility - tenth).max(Decimal::ZERO) * hundred;

    confidence_term + warning_term + leverage_term + volatility_term
}
