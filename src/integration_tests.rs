//! Integration tests that exercise the full flow: stored giftees feed the
//! brainstorm context, parsed suggestions are promoted into the ranked list,
//! and the status machine carries promoted ideas through the pipeline.

use std::sync::Arc;

use crate::brainstorm::{BrainstormPhase, RawContext, Scenario};
use crate::error::GiftError;
use crate::providers::ProviderError;
use crate::ranking::RankEngine;
use crate::status::StatusMachine;
use crate::store::GiftStore;
use crate::testing::{
    sam_draft, setup_brainstorm_service, setup_test_store, text_reply, MockGenerationProvider,
    ScriptedReply,
};
use crate::types::{GiftStatus, NewGiftIdea, NewGiftee};
use crate::utils::{acquired_cost, total_budget};

#[tokio::test]
async fn stored_giftee_context_reaches_the_prompt() {
    let (store, _db) = setup_test_store().await;
    let giftee = store.create_giftee(&sam_draft(1)).await.unwrap();
    let (service, provider) = setup_brainstorm_service(MockGenerationProvider::new());

    let raw = RawContext::from_giftee(&giftee);
    let outcome = service
        .request(giftee.id, Scenario::General, &giftee.name, &raw, 3)
        .await
        .unwrap();

    assert_eq!(outcome.suggestions.len(), 3);
    assert!(outcome.warnings.is_empty());

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    let prompt = &calls[0].user_prompt;
    assert!(prompt.contains("Sam"));
    assert!(prompt.contains("younger sibling"));
    assert!(prompt.contains("$80.00"));
    assert!(prompt.contains("Loves sourdough baking and chess"));
}

#[tokio::test]
async fn promote_suggestion_then_track_status() {
    let (store, _db) = setup_test_store().await;
    let giftee = store.create_giftee(&sam_draft(1)).await.unwrap();

    let reply = "Suggestion 1: Portable Chess Clock\n\
                 Why It Fits: Sam plays blitz at the park every weekend.\n\
                 Price Range: $25\n\
                 Where to Find: Chess specialty shops\n\
                 Difficulty: Easy\n\
                 Risk Level: Low\n";
    let provider = MockGenerationProvider::with_replies(vec![text_reply(reply)]);
    let (service, _) = setup_brainstorm_service(provider);

    let outcome = service
        .request(
            giftee.id,
            Scenario::General,
            &giftee.name,
            &RawContext::from_giftee(&giftee),
            1,
        )
        .await
        .unwrap();
    let suggestion = &outcome.suggestions[0];

    let engine = RankEngine::new(store.clone());
    let idea = engine.promote(giftee.id, suggestion).await.unwrap();
    assert_eq!(idea.title, "Portable Chess Clock");
    assert_eq!(idea.rank, 1);
    assert_eq!(idea.status, GiftStatus::Considering);
    assert_eq!(idea.price, Some(25.0));
    assert_eq!(
        idea.description.as_deref(),
        Some("Sam plays blitz at the park every weekend.")
    );

    let machine = StatusMachine::new(store.clone());
    machine.advance(idea.id).await.unwrap();
    let wrapped = machine.advance(idea.id).await.unwrap();
    assert_eq!(wrapped.status, GiftStatus::Wrapped);

    let progress = machine.progress(giftee.id).await.unwrap();
    assert_eq!(progress.total, 1);
    assert_eq!(progress.acquired, 1);
    assert_eq!(progress.wrapped, 1);
    assert_eq!(progress.given, 0);
    assert!((progress.percentage - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn promoted_suggestions_form_a_dense_reorderable_list() {
    let (store, _db) = setup_test_store().await;
    let giftee = store.create_giftee(&sam_draft(1)).await.unwrap();
    let (service, _) = setup_brainstorm_service(MockGenerationProvider::new());

    let outcome = service
        .request(giftee.id, Scenario::General, &giftee.name, &RawContext::new(), 3)
        .await
        .unwrap();

    let engine = RankEngine::new(store.clone());
    let mut promoted = Vec::new();
    for suggestion in &outcome.suggestions {
        promoted.push(engine.promote(giftee.id, suggestion).await.unwrap());
    }
    assert_eq!(promoted.len(), 3);

    // Favorite discovered late: move the last suggestion to the top.
    engine.reorder(giftee.id, promoted[2].id, 1).await.unwrap();

    let ideas = engine.list(giftee.id).await.unwrap();
    let titles: Vec<&str> = ideas.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Sample Gift 3", "Sample Gift 1", "Sample Gift 2"]);
    let ranks: Vec<i64> = ideas.iter().map(|i| i.rank).collect();
    assert_eq!(ranks, [1, 2, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_status_and_rank_edits_do_not_interfere() {
    let (store, _db) = setup_test_store().await;
    let giftee = store.create_giftee(&sam_draft(1)).await.unwrap();
    let engine = Arc::new(RankEngine::new(store.clone()));
    let machine = Arc::new(StatusMachine::new(store.clone()));

    let mut ideas = Vec::new();
    for title in ["a", "b", "c", "d"] {
        let draft = NewGiftIdea {
            title: title.to_string(),
            ..Default::default()
        };
        ideas.push(engine.insert(giftee.id, &draft).await.unwrap());
    }
    let tracked = ideas[0].id;
    let moved = ideas[3].id;

    // Status transitions take no giftee lock, so they interleave freely with
    // rank shifts that rewrite the same rows.
    let status_edits = {
        let machine = machine.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                machine.advance(tracked).await.unwrap();
                machine.revert(tracked).await.unwrap();
            }
        })
    };
    let rank_edits = {
        let engine = engine.clone();
        let giftee_id = giftee.id;
        tokio::spawn(async move {
            for _ in 0..20 {
                engine.reorder(giftee_id, moved, 1).await.unwrap();
                engine.reorder(giftee_id, moved, 4).await.unwrap();
            }
        })
    };
    status_edits.await.unwrap();
    rank_edits.await.unwrap();

    let ideas = engine.list(giftee.id).await.unwrap();
    let ranks: Vec<i64> = ideas.iter().map(|i| i.rank).collect();
    assert_eq!(ranks, [1, 2, 3, 4]);
    let titles: Vec<&str> = ideas.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["a", "b", "c", "d"]);

    // Balanced advance/revert pairs land back where they started.
    let tracked_after = ideas.iter().find(|i| i.id == tracked).unwrap();
    assert_eq!(tracked_after.status, GiftStatus::Considering);
}

#[tokio::test]
async fn failed_brainstorm_frees_the_slot_and_leaves_the_list_untouched() {
    let (store, _db) = setup_test_store().await;
    let giftee = store.create_giftee(&sam_draft(1)).await.unwrap();
    let provider = MockGenerationProvider::with_replies(vec![ScriptedReply::Fail(
        ProviderError::from_status(401, "bad key"),
    )]);
    let (service, _) = setup_brainstorm_service(provider);

    let err = service
        .request(giftee.id, Scenario::General, &giftee.name, &RawContext::new(), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, GiftError::Provider(_)));
    assert_eq!(service.phase_for(giftee.id).await, BrainstormPhase::Idle);

    let ideas = store.list_ideas_for_giftee(giftee.id).await.unwrap();
    assert!(ideas.is_empty());

    // The slot is free again; the fallback reply succeeds.
    let outcome = service
        .request(giftee.id, Scenario::General, &giftee.name, &RawContext::new(), 3)
        .await
        .unwrap();
    assert_eq!(outcome.suggestions.len(), 3);
}

#[tokio::test]
async fn household_spend_rollup_tracks_acquisitions() {
    let (store, _db) = setup_test_store().await;
    let sam = store.create_giftee(&sam_draft(1)).await.unwrap();
    let alex = store
        .create_giftee(&NewGiftee {
            user_id: 1,
            name: "Alex".to_string(),
            relationship: Some("college roommate".to_string()),
            budget: Some(40.0),
            notes: None,
        })
        .await
        .unwrap();

    let engine = RankEngine::new(store.clone());
    let machine = StatusMachine::new(store.clone());

    let clock = engine
        .insert(
            sam.id,
            &NewGiftIdea {
                title: "Chess clock".to_string(),
                price: Some(25.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine
        .insert(
            sam.id,
            &NewGiftIdea {
                title: "Proofing basket".to_string(),
                price: Some(18.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let mug = engine
        .insert(
            alex.id,
            &NewGiftIdea {
                title: "Camp mug".to_string(),
                price: Some(22.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    machine.advance(clock.id).await.unwrap();
    machine.advance(mug.id).await.unwrap();

    let giftees = store.list_giftees_for_user(1).await.unwrap();
    assert_eq!(total_budget(&giftees), 120.0);

    let mut spent = 0.0;
    for giftee in &giftees {
        let ideas = store.list_ideas_for_giftee(giftee.id).await.unwrap();
        spent += acquired_cost(&ideas);
    }
    assert!((spent - 47.0).abs() < f64::EPSILON);
}
