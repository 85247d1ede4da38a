use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{Provider, ProviderFuture};
use crate::error::ProviderError;
use crate::request::TranslationRequest;

/// When a wrapped provider should fail instead of being called.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultPlan {
    Never,
    /// Fail each call with probability `rate`; a seed makes the sequence
    /// reproducible.
    Random { rate: f64, seed: Option<u64> },
    /// One entry per call, `true` meaning fail. Calls past the end succeed.
    Script(Vec<bool>),
}

#[derive(Debug)]
struct FaultState {
    plan: FaultPlan,
    rng: StdRng,
    calls: usize,
}

impl FaultState {
    fn next_fails(&mut self) -> bool {
        let index = self.calls;
        self.calls += 1;
        match &self.plan {
            FaultPlan::Never => false,
            FaultPlan::Random { rate, .. } => {
                let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
                self.rng.gen_bool(rate)
            }
            FaultPlan::Script(script) => script.get(index).copied().unwrap_or(false),
        }
    }
}

/// Wraps a provider and fails calls according to a [`FaultPlan`]. Clones
/// share one call sequence.
#[derive(Debug, Clone)]
pub struct FaultInjecting<P> {
    inner: P,
    state: Arc<Mutex<FaultState>>,
}

impl<P: Provider> FaultInjecting<P> {
    pub fn new(inner: P, plan: FaultPlan) -> Self {
        let rng = match &plan {
            FaultPlan::Random {
                seed: Some(seed), ..
            } => StdRng::seed_from_u64(*seed),
            _ => StdRng::from_entropy(),
        };
        Self {
            inner,
            state: Arc::new(Mutex::new(FaultState {
                plan,
                rng,
                calls: 0,
            })),
        }
    }

    fn next_fails(&self) -> bool {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.next_fails()
    }
}

impl<P: Provider> Provider for FaultInjecting<P> {
    fn source(&self) -> &str {
        self.inner.source()
    }

    fn translate(&self, request: &TranslationRequest) -> ProviderFuture {
        if self.next_fails() {
            let provider = self.source().to_string();
            debug!("injecting failure into {}", provider);
            return Box::pin(async move { Err(ProviderError::Injected { provider }) });
        }
        self.inner.translate(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Language;
    use crate::test_util::StubProvider;

    fn request() -> TranslationRequest {
        TranslationRequest::new("Hello", Language::En.into(), Language::Fr).expect("request")
    }

    #[tokio::test]
    async fn scripted_faults_follow_the_script() {
        let provider = FaultInjecting::new(
            StubProvider::ok("stub", "Bonjour", Some(0.9)),
            FaultPlan::Script(vec![true, false, true]),
        );
        let mut outcomes = Vec::new();
        for _ in 0..4 {
            outcomes.push(provider.translate(&request()).await.is_ok());
        }
        assert_eq!(outcomes, vec![false, true, false, true]);
    }

    #[tokio::test]
    async fn injected_errors_name_the_wrapped_provider() {
        let provider = FaultInjecting::new(
            StubProvider::ok("stub", "Bonjour", None),
            FaultPlan::Random {
                rate: 1.0,
                seed: Some(7),
            },
        );
        let err = provider.translate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Injected {
                provider: "stub".to_string()
            }
        );
    }

    #[tokio::test]
    async fn zero_rate_and_never_pass_through() {
        for plan in [
            FaultPlan::Never,
            FaultPlan::Random {
                rate: 0.0,
                seed: None,
            },
        ] {
            let provider = FaultInjecting::new(StubProvider::ok("stub", "Bonjour", None), plan);
            let candidate = provider.translate(&request()).await.expect("candidate");
            assert_eq!(candidate.text, "Bonjour");
        }
    }

    #[test]
    fn seeded_sequences_repeat() {
        let draw = || {
            let provider = FaultInjecting::new(
                StubProvider::ok("stub", "x", None),
                FaultPlan::Random {
                    rate: 0.5,
                    seed: Some(42),
                },
            );
            (0..32).map(|_| provider.next_fails()).collect::<Vec<_>>()
        };
        assert_eq!(draw(), draw());
    }
}
