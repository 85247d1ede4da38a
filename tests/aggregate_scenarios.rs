use std::time::Duration;

use multi_translator_rust::postprocess::post_process;
use multi_translator_rust::providers::{FaultInjecting, ProviderFuture};
use multi_translator_rust::{
    FaultPlan, Language, Provider, ProviderError, SourceLanguage, TranslationCandidate,
    TranslationRequest, aggregate_translate,
};

#[derive(Debug, Clone)]
struct Canned {
    source: &'static str,
    text: Option<&'static str>,
    confidence: Option<f64>,
    delay: Duration,
}

impl Canned {
    fn ok(source: &'static str, text: &'static str, confidence: f64) -> Self {
        Self {
            source,
            text: Some(text),
            confidence: Some(confidence),
            delay: Duration::ZERO,
        }
    }

    fn rejecting(source: &'static str) -> Self {
        Self {
            source,
            text: None,
            confidence: None,
            delay: Duration::ZERO,
        }
    }

    fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Provider for Canned {
    fn source(&self) -> &str {
        self.source
    }

    fn translate(&self, _request: &TranslationRequest) -> ProviderFuture {
        let this = self.clone();
        Box::pin(async move {
            tokio::time::sleep(this.delay).await;
            let Some(text) = this.text else {
                return Err(ProviderError::NoTranslation {
                    provider: this.source.to_string(),
                });
            };
            let candidate = TranslationCandidate::new(text, this.source);
            Ok(match this.confidence {
                Some(confidence) => candidate.with_confidence(confidence),
                None => candidate,
            })
        })
    }
}

fn arabic_hello(target: Language) -> TranslationRequest {
    TranslationRequest::new("مرحبا", SourceLanguage::Auto, target).expect("request")
}

#[tokio::test]
async fn higher_confidence_candidate_wins() {
    let providers = [
        Canned::ok("A", "Hello", 0.9),
        Canned::ok("B", "Hi", 0.5),
    ];
    let text = aggregate_translate(&arabic_hello(Language::En), &providers)
        .await
        .expect("translation");
    assert_eq!(text, "Hello");
}

#[tokio::test]
async fn lone_identity_candidate_is_still_selected() {
    let providers = [Canned::ok("A", "مرحبا", 0.8)];
    let text = aggregate_translate(&arabic_hello(Language::En), &providers)
        .await
        .expect("translation");
    assert_eq!(text, "مرحبا");
}

#[tokio::test]
async fn every_provider_rejecting_is_all_failed() {
    let providers = [
        Canned::rejecting("A"),
        Canned::rejecting("B"),
        Canned::rejecting("C"),
    ];
    let err = aggregate_translate(&arabic_hello(Language::En), &providers)
        .await
        .unwrap_err();
    assert_eq!(err.failures.len(), 3);
    assert_eq!(err.to_string(), "all 3 translation providers failed");
}

#[test]
fn repeated_exclamation_marks_collapse() {
    assert_eq!(post_process("Bonjour!!!", Language::Fr, false), "Bonjour!");
}

#[tokio::test]
async fn outcome_considers_every_successful_provider() {
    // Successes arrive in reverse order of quality; the best one must still
    // win because aggregation waits for all of them.
    let providers = [
        Canned::ok("A", "Hi", 0.1).after(Duration::from_millis(1)),
        Canned::rejecting("B"),
        Canned::ok("C", "Hey", 0.4).after(Duration::from_millis(10)),
        Canned::ok("D", "Hello", 0.95).after(Duration::from_millis(40)),
    ];
    let text = aggregate_translate(&arabic_hello(Language::En), &providers)
        .await
        .expect("translation");
    assert_eq!(text, "Hello");
}

#[tokio::test]
async fn injected_faults_are_recovered_per_provider() {
    let providers = [
        FaultInjecting::new(Canned::ok("A", "Hello", 0.9), FaultPlan::Script(vec![true])),
        FaultInjecting::new(Canned::ok("B", "Hi", 0.5), FaultPlan::Never),
    ];
    let text = aggregate_translate(&arabic_hello(Language::En), &providers)
        .await
        .expect("translation");
    assert_eq!(text, "Hi");
}

#[tokio::test]
async fn arabic_target_gets_arabic_punctuation() {
    let request =
        TranslationRequest::new("Where is the hotel?", Language::En.into(), Language::Ar)
            .expect("request");
    let providers = [Canned::ok("A", "أين الفندق?", 0.7)];
    let text = aggregate_translate(&request, &providers)
        .await
        .expect("translation");
    assert_eq!(text, "أين الفندق؟");
}
