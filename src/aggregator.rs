use futures_util::future::join_all;
use std::cmp::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{AllProvidersFailedError, ProviderError};
use crate::postprocess::PostProcessor;
use crate::providers::Provider;
use crate::request::{TranslationCandidate, TranslationRequest};
use crate::scoring::{QualityScorer, ScoredCandidate};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one aggregation round.
#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    /// Post-processed text of the winning candidate.
    pub text: String,
    pub winner: ScoredCandidate,
    /// Every successful candidate, best first.
    pub ranked: Vec<ScoredCandidate>,
    /// Providers that failed this round; recovered, not fatal.
    pub failures: Vec<ProviderError>,
}

/// Fans a request out to every provider, waits for all of them, and keeps
/// the best-scoring candidate.
#[derive(Debug, Clone)]
pub struct Aggregator<P> {
    providers: Vec<P>,
    scorer: QualityScorer,
    post: PostProcessor,
    timeout: Duration,
}

impl<P: Provider> Aggregator<P> {
    pub fn new(providers: Vec<P>, scorer: QualityScorer, post: PostProcessor) -> Self {
        Self {
            providers,
            scorer,
            post,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn providers(&self) -> &[P] {
        &self.providers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn aggregate(
        &self,
        request: &TranslationRequest,
    ) -> Result<AggregateOutcome, AllProvidersFailedError> {
        let settled = join_all(
            self.providers
                .iter()
                .map(|provider| settle(provider, request, self.timeout)),
        )
        .await;

        let mut ranked = Vec::new();
        let mut failures = Vec::new();
        for (index, result) in settled.into_iter().enumerate() {
            match result {
                Ok(candidate) => {
                    let scored = self.scorer.score(&candidate, request);
                    debug!(
                        "{} scored {:.3} (raw {:.3})",
                        scored.candidate.source, scored.score, scored.breakdown.raw
                    );
                    ranked.push((index, scored));
                }
                Err(err) => {
                    warn!("provider failed: {}", err);
                    failures.push(err);
                }
            }
        }

        ranked.sort_by(|(a_index, a), (b_index, b)| rank(a, b).then(a_index.cmp(b_index)));
        let ranked = ranked
            .into_iter()
            .map(|(_, scored)| scored)
            .collect::<Vec<_>>();
        let Some(winner) = ranked.first().cloned() else {
            return Err(AllProvidersFailedError { failures });
        };

        let text = self.post.apply(&winner.candidate.text, request);
        Ok(AggregateOutcome {
            text,
            winner,
            ranked,
            failures,
        })
    }
}

/// Best first: clamped score, then the unclamped total so penalties still
/// separate candidates that both saturate at 1.0.
fn rank(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(b.breakdown.raw.total_cmp(&a.breakdown.raw))
}

/// Runs one provider to completion or until `limit` elapses.
pub(crate) async fn settle<P: Provider>(
    provider: &P,
    request: &TranslationRequest,
    limit: Duration,
) -> Result<TranslationCandidate, ProviderError> {
    let started = Instant::now();
    match tokio::time::timeout(limit, provider.translate(request)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            provider: provider.source().to_string(),
            elapsed: started.elapsed(),
        }),
    }
}

/// One-shot aggregation with the default scorer, post-processor and timeout.
pub async fn aggregate_translate<P: Provider>(
    request: &TranslationRequest,
    providers: &[P],
) -> Result<String, AllProvidersFailedError> {
    let aggregator = Aggregator::new(
        providers.to_vec(),
        QualityScorer::default(),
        PostProcessor::default(),
    );
    aggregator.aggregate(request).await.map(|outcome| outcome.text)
}
