use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{
    sync::{AcquireError, OwnedSemaphorePermit, Semaphore},
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{build_backend, DetectionBackend},
    config::AppConfig,
    core::{
        classifier::{
            classify, derive_analysis, Assessment, Thresholds, MAX_DOMAIN_AGE_DAYS, MAX_REDIRECTS,
        },
        error::ShieldError,
        hash::scan_id,
        time::now_utc,
        types::{ScanResult, ThreatIntelligence, UsageStats},
    },
};

/// Scan dispatcher and threat query front-end over one detection backend.
///
/// A single semaphore caps in-flight scans across every caller of the engine.
pub struct Engine {
    backend: Arc<dyn DetectionBackend>,
    pub config: AppConfig,
    semaphore: Arc<Semaphore>,
}

enum BatchStep {
    Cancelled,
    Joined(Option<Result<(usize, Result<ScanResult, ShieldError>), JoinError>>),
    Permit(Result<OwnedSemaphorePermit, AcquireError>),
}

#[derive(Clone)]
struct ScanCtx {
    backend: Arc<dyn DetectionBackend>,
    thresholds: Thresholds,
    timeout: Duration,
}

impl Engine {
    pub fn new(config: AppConfig) -> Result<Self, ShieldError> {
        config.validate()?;
        let backend = build_backend(&config)?;
        Ok(Self::with_backend(config, backend))
    }

    pub fn with_backend(config: AppConfig, backend: Arc<dyn DetectionBackend>) -> Self {
        tracing::debug!(
            backend = backend.name(),
            max_concurrent = config.max_concurrent_scans,
            "engine ready"
        );
        Self {
            backend,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_scans)),
            config,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn scan(&self, url: &str) -> Result<ScanResult, ShieldError> {
        if let Err(err) = ensure_url(url) {
            tracing::warn!("rejected scan request: {}", err);
            return Err(err);
        }
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ShieldError::ServiceUnavailable("scan pool closed".into()))?;
        let result = scan_one(self.ctx(), url.to_string()).await;
        if let Err(err) = &result {
            tracing::warn!("scan of {} failed: {}", url, err);
        }
        result
    }

    pub async fn bulk_scan(&self, urls: &[String]) -> Result<Vec<ScanResult>, ShieldError> {
        self.bulk_scan_with_cancel(urls, CancellationToken::new())
            .await
    }

    /// Scans every url with at most `max_concurrent_scans` in flight and returns
    /// results in input order. The first failure, a cancellation, or the batch
    /// deadline aborts every in-flight member and fails the whole batch.
    pub async fn bulk_scan_with_cancel(
        &self,
        urls: &[String],
        cancel: CancellationToken,
    ) -> Result<Vec<ScanResult>, ShieldError> {
        if let Err(err) = self.check_batch(urls) {
            tracing::warn!("rejected bulk scan of {} urls: {}", urls.len(), err);
            return Err(err);
        }

        let started = Instant::now();
        let run = self.run_batch(urls, &cancel);
        let outcome = match self.config.batch_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), run)
                .await
                .unwrap_or(Err(ShieldError::Timeout)),
            None => run.await,
        };

        match &outcome {
            Ok(results) => tracing::info!(
                "bulk scan of {} urls finished in {} ms",
                results.len(),
                started.elapsed().as_millis()
            ),
            Err(err) => tracing::warn!("bulk scan of {} urls failed: {}", urls.len(), err),
        }
        outcome
    }

    fn check_batch(&self, urls: &[String]) -> Result<(), ShieldError> {
        if urls.is_empty() {
            return Err(ShieldError::EmptyBatch);
        }
        if urls.len() > self.config.max_bulk_urls {
            return Err(ShieldError::InvalidInput(format!(
                "batch of {} urls exceeds the limit of {}",
                urls.len(),
                self.config.max_bulk_urls
            )));
        }
        for (index, url) in urls.iter().enumerate() {
            if url.trim().is_empty() {
                return Err(ShieldError::InvalidInput(format!("url #{index} is blank")));
            }
        }
        Ok(())
    }

    async fn run_batch(
        &self,
        urls: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<ScanResult>, ShieldError> {
        let mut slots: Vec<Option<ScanResult>> = vec![None; urls.len()];
        let mut queued = urls.iter().cloned().enumerate();
        let mut next = queued.next();
        let mut tasks = JoinSet::new();

        loop {
            if next.is_none() && tasks.is_empty() {
                break;
            }
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => BatchStep::Cancelled,
                joined = tasks.join_next(), if !tasks.is_empty() => BatchStep::Joined(joined),
                permit = self.semaphore.clone().acquire_owned(), if next.is_some() => {
                    BatchStep::Permit(permit)
                }
            };

            match step {
                BatchStep::Cancelled => {
                    tasks.abort_all();
                    return Err(ShieldError::Cancelled);
                }
                BatchStep::Joined(Some(Ok((index, Ok(result))))) => slots[index] = Some(result),
                BatchStep::Joined(Some(Ok((index, Err(err))))) => {
                    tasks.abort_all();
                    tracing::debug!("batch member #{} failed, aborting batch", index);
                    return Err(err);
                }
                BatchStep::Joined(Some(Err(join_err))) => {
                    tasks.abort_all();
                    return Err(ShieldError::Backend(format!("scan task failed: {join_err}")));
                }
                BatchStep::Joined(None) => {}
                BatchStep::Permit(permit) => {
                    let permit = permit
                        .map_err(|_| ShieldError::ServiceUnavailable("scan pool closed".into()))?;
                    if let Some((index, url)) = next.take() {
                        let ctx = self.ctx();
                        tasks.spawn(async move {
                            let _permit = permit;
                            (index, scan_one(ctx, url).await)
                        });
                    }
                    next = queued.next();
                }
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ShieldError::Backend("batch finished with missing results".into()))
    }

    pub async fn list_threats(&self) -> Result<Vec<ThreatIntelligence>, ShieldError> {
        let threats = tokio::time::timeout(self.scan_timeout(), self.backend.threats())
            .await
            .map_err(|_| ShieldError::Timeout)??;
        tracing::debug!("fetched {} threat records", threats.len());
        Ok(threats)
    }

    pub async fn usage_stats(&self) -> Result<UsageStats, ShieldError> {
        tokio::time::timeout(self.scan_timeout(), self.backend.usage())
            .await
            .map_err(|_| ShieldError::Timeout)?
    }

    fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.config.scan_timeout_ms)
    }

    fn ctx(&self) -> ScanCtx {
        ScanCtx {
            backend: Arc::clone(&self.backend),
            thresholds: self.config.thresholds,
            timeout: self.scan_timeout(),
        }
    }
}

fn ensure_url(url: &str) -> Result<(), ShieldError> {
    if url.trim().is_empty() {
        return Err(ShieldError::InvalidInput("url is blank".into()));
    }
    Ok(())
}

async fn scan_one(ctx: ScanCtx, url: String) -> Result<ScanResult, ShieldError> {
    let assessment = tokio::time::timeout(ctx.timeout, ctx.backend.assess(&url))
        .await
        .map_err(|_| ShieldError::Timeout)??;
    let result = build_result(&url, assessment, &ctx.thresholds)?;
    tracing::debug!(
        "scanned {} -> {} ({:.2})",
        result.url,
        result.status,
        result.risk_score
    );
    Ok(result)
}

/// Classifies an assessment and assembles the immutable scan record.
pub fn build_result(
    url: &str,
    assessment: Assessment,
    thresholds: &Thresholds,
) -> Result<ScanResult, ShieldError> {
    if !(0.0..1.0).contains(&assessment.risk_score) {
        return Err(ShieldError::Backend(format!(
            "risk score {} outside [0, 1)",
            assessment.risk_score
        )));
    }
    if assessment.domain_age > MAX_DOMAIN_AGE_DAYS {
        return Err(ShieldError::Backend(format!(
            "domain age {} outside 0..={MAX_DOMAIN_AGE_DAYS} days",
            assessment.domain_age
        )));
    }
    if assessment.redirects > MAX_REDIRECTS {
        return Err(ShieldError::Backend(format!(
            "redirect count {} outside 0..={MAX_REDIRECTS}",
            assessment.redirects
        )));
    }
    let status = classify(assessment.risk_score, thresholds);
    let analysis = derive_analysis(status, &assessment);
    let timestamp = now_utc();

    Ok(ScanResult {
        id: scan_id(url, timestamp),
        url: url.to_string(),
        status,
        risk_score: assessment.risk_score,
        timestamp,
        analysis,
        details: assessment.details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ScanDetails, ScanStatus};

    fn assessment(risk_score: f64) -> Assessment {
        Assessment {
            risk_score,
            ssl_valid: true,
            domain_age: 10,
            redirects: 0,
            malware_signal: true,
            phishing_indicators: vec![],
            details: ScanDetails::default(),
        }
    }

    #[test]
    fn build_result_classifies() {
        let r = build_result("https://example.com", assessment(0.12), &Thresholds::default())
            .unwrap();
        assert_eq!(r.status, ScanStatus::Safe);
        assert!(r.analysis.content_safe);
        assert!(r.analysis.phishing_indicators.is_empty());
        assert!(!r.analysis.malware_detected);
        assert!(r.id.starts_with("scan_"));
    }

    #[test]
    fn build_result_rejects_out_of_range_scores() {
        for score in [-0.1, 1.0, 3.0, f64::NAN] {
            let err = build_result("https://example.com", assessment(score), &Thresholds::default())
                .unwrap_err();
            assert!(matches!(err, ShieldError::Backend(_)));
        }
    }

    #[test]
    fn build_result_rejects_out_of_range_evidence() {
        let mut old = assessment(0.2);
        old.domain_age = MAX_DOMAIN_AGE_DAYS + 1;
        assert!(matches!(
            build_result("https://example.com", old, &Thresholds::default()),
            Err(ShieldError::Backend(_))
        ));

        let mut looping = assessment(0.2);
        looping.redirects = MAX_REDIRECTS + 1;
        assert!(matches!(
            build_result("https://example.com", looping, &Thresholds::default()),
            Err(ShieldError::Backend(_))
        ));

        let mut edge = assessment(0.2);
        edge.domain_age = MAX_DOMAIN_AGE_DAYS;
        edge.redirects = MAX_REDIRECTS;
        assert!(build_result("https://example.com", edge, &Thresholds::default()).is_ok());
    }

    #[test]
    fn blank_urls_are_caller_errors() {
        assert!(ensure_url("   ").unwrap_err().is_caller_error());
        assert!(ensure_url("https://example.com").is_ok());
    }
}
