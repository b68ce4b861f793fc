// End-to-end pipeline scenarios against the mock seams: stubbed headline
// index, stubbed backends, in-memory store, manual clock. No network.

use std::sync::Arc;

use chrono::{Duration, Utc};

use tribuna_common::{AuthorizationStatus, InviteDecision, ManualClock, SocialNetwork};
use tribuna_pipeline::arbiter::{Headline, SourceArbiter};
use tribuna_pipeline::authorization::AuthorizationService;
use tribuna_pipeline::generation::GenerationEngine;
use tribuna_pipeline::images::{ImagePicker, MediaFile};
use tribuna_pipeline::pipeline::Pipeline;
use tribuna_pipeline::publish::PublishGate;
use tribuna_pipeline::store::{DestinationStore, MemoryStore};
use tribuna_pipeline::testing::{
    candidate_fixture, destination_fixture, MockBackend, MockFeedFetcher, MockHeadlineIndex,
    MockMediaIndex, MockWorkflowHook,
};

fn headline(title: &str, url: &str, country: Option<&str>) -> Headline {
    Headline {
        title: title.to_string(),
        url: url.to_string(),
        published_at: None,
        source_country: country.map(str::to_string),
    }
}

#[tokio::test]
async fn full_invocation_selects_local_article_and_dispatches() {
    // Candidate in a region biased to CO; the filtered pass returns one CO
    // article and one foreign article.
    let candidate = candidate_fixture("Ana Pérez", "Concejo Municipal", "Antioquia");

    let index = MockHeadlineIndex::new().on_filtered(vec![
        headline("Cobertura extranjera", "https://news.example.org/x", Some("us")),
        headline(
            "Ana Pérez propone nueva ruta escolar",
            "https://elcolombiano.com/nota",
            Some("co"),
        ),
    ]);
    let index_calls = index.calls();

    let media = MockMediaIndex::new().on_search(
        "Antioquia Concejo Municipal",
        vec![MediaFile {
            title: Some("File:Plaza.jpg".to_string()),
            url: "https://img.example/plaza.jpg".to_string(),
            license: Some("CC BY-SA 4.0".to_string()),
        }],
    );

    // First backend returns malformed JSON, the second a valid draft.
    let bad = MockBackend::ok("primary", "{not json");
    let good = MockBackend::ok(
        "fallback",
        r#"{"title":"Ruta escolar","body":"La propuesta amplía el transporte.","keywords":["educación"]}"#,
    );
    let bad_calls = bad.calls();
    let good_calls = good.calls();

    let mut approved = destination_fixture(candidate.id);
    approved.authorization_status = AuthorizationStatus::Approved;
    approved.authorized_at = Some(Utc::now());

    let store = Arc::new(MemoryStore::with_destinations(vec![
        approved.clone(),
        destination_fixture(candidate.id), // pending, filtered out
    ]));
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let authorization = Arc::new(AuthorizationService::new(
        store.clone(),
        clock.clone(),
        "https://campaign.example",
        "57",
    ));
    let hook = Arc::new(MockWorkflowHook::new());
    let dispatched = hook.dispatched();

    let pipeline = Pipeline::new(
        SourceArbiter::new(Arc::new(index), Arc::new(MockFeedFetcher::new()), Vec::new()),
        ImagePicker::new(Arc::new(media)),
        GenerationEngine::new(true, vec![Box::new(bad), Box::new(good)]),
        PublishGate::new(authorization),
        hook,
        store,
        clock,
    );

    let outcome = pipeline.run_for_candidate(&candidate).await.unwrap();

    // The CO article won while a same-country result existed.
    assert_eq!(
        outcome.draft.metadata.source_url.as_deref(),
        Some("https://elcolombiano.com/nota")
    );
    // One filtered index query sufficed.
    assert_eq!(index_calls.lock().unwrap().len(), 1);

    // Exactly one call to the failing backend, one to the succeeding one.
    assert_eq!(bad_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(good_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(outcome.draft.body.contains("La propuesta amplía el transporte."));

    // Six variants, short-form clamped.
    assert_eq!(outcome.draft.metadata.variants.len(), 6);
    let tweet = &outcome.draft.metadata.variants[&SocialNetwork::Twitter];
    assert!(tweet.chars().count() <= 280);

    // Media attached from the open-media index.
    assert_eq!(
        outcome.draft.metadata.image.as_ref().map(|i| i.url.as_str()),
        Some("https://img.example/plaza.jpg")
    );

    // Only the approved destination is eligible, and the hook saw it.
    assert_eq!(outcome.eligible_destinations.len(), 1);
    assert_eq!(outcome.eligible_destinations[0].id, approved.id);
    assert!(outcome.dispatched);

    let payloads = dispatched.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    let destinations = payloads[0]["metadata"]["destinations"].as_array().unwrap();
    assert_eq!(destinations.len(), 1);
    assert_eq!(
        destinations[0]["profile_url"],
        approved.profile_url.as_str()
    );
}

#[tokio::test]
async fn no_article_aborts_the_invocation() {
    let candidate = candidate_fixture("Ana Pérez", "Concejo Municipal", "Antioquia");

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let authorization = Arc::new(AuthorizationService::new(
        store.clone(),
        clock.clone(),
        "https://campaign.example",
        "57",
    ));

    let pipeline = Pipeline::new(
        SourceArbiter::new(
            Arc::new(MockHeadlineIndex::new()),
            Arc::new(MockFeedFetcher::new()),
            Vec::new(),
        ),
        ImagePicker::new(Arc::new(MockMediaIndex::new().on_search(
            "Antioquia Concejo Municipal",
            vec![MediaFile {
                title: None,
                url: "https://img.example/a.jpg".to_string(),
                license: Some("CC0".to_string()),
            }],
        ))),
        GenerationEngine::new(
            true,
            vec![Box::new(MockBackend::ok("a", r#"{"title":"T","body":"B"}"#))],
        ),
        PublishGate::new(authorization),
        Arc::new(MockWorkflowHook::new()),
        store,
        clock,
    );

    let err = pipeline.run_for_candidate(&candidate).await.unwrap_err();
    assert_eq!(err.reason(), "no_source_found");
}

#[tokio::test]
async fn invite_expiry_scenario_with_simulated_clock() {
    let candidate = candidate_fixture("Ana Pérez", "Concejo Municipal", "Antioquia");
    let destination = destination_fixture(candidate.id);
    let store = Arc::new(MemoryStore::with_destinations(vec![destination.clone()]));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = AuthorizationService::new(
        store.clone(),
        clock.clone(),
        "https://campaign.example",
        "57",
    );

    let issued = service
        .issue_invite(&candidate, destination.id)
        .await
        .unwrap();
    let token = issued
        .consent_link
        .split("token=")
        .nth(1)
        .unwrap()
        .to_string();

    // Wait past the 5-hour window without sleeping.
    clock.advance(Duration::hours(5) + Duration::minutes(1));

    let err = service
        .consume_invite(&token, InviteDecision::Approved)
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "invite_expired");

    // The next read reports the destination as expired.
    let listed = service.list_destinations(candidate.id).await.unwrap();
    assert_eq!(
        listed[0].authorization_status,
        AuthorizationStatus::Expired
    );

    // A fresh invite restarts the lifecycle.
    let reissued = service
        .issue_invite(&candidate, destination.id)
        .await
        .unwrap();
    let token = reissued
        .consent_link
        .split("token=")
        .nth(1)
        .unwrap()
        .to_string();
    let approved = service
        .consume_invite(&token, InviteDecision::Approved)
        .await
        .unwrap();
    assert_eq!(approved.authorization_status, AuthorizationStatus::Approved);

    let stored = store.destination(destination.id).await.unwrap().unwrap();
    assert!(stored.authorized_at.is_some());
}
