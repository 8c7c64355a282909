mod common;

use common::{eventually, repo, FakeGitHub, FakeSuggester};
use ractor::ActorRef;
use repolook::actors::search_session::{request_suggestions, snapshot, submit};
use repolook::actors::{SearchSession, SearchSessionMessage, SearchView, SuggestTrigger};
use repolook::card::{LanguageState, SuggestionState};
use repolook::enrichment::ContributorCount;
use repolook::error::FailureKind;
use repolook::query::SearchQuery;
use repolook::suggest::{SuggestionOutcome, NO_SUGGESTIONS_MESSAGE, SUGGESTION_FAILED_MESSAGE};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

async fn start_session(github: FakeGitHub, suggester: FakeSuggester) -> ActorRef<SearchSessionMessage> {
    SearchSession::spawn(Arc::new(github), Arc::new(suggester))
        .await
        .expect("Failed to spawn search session")
}

fn query(raw: &str) -> SearchQuery {
    SearchQuery::parse(raw).unwrap()
}

fn fully_enriched(view: &SearchView) -> bool {
    !view.cards().is_empty()
        && view.cards().iter().all(|card| {
            card.contributors != ContributorCount::Pending && card.languages != LanguageState::Pending
        })
}

async fn wait_for_enrichment(session: &ActorRef<SearchSessionMessage>) {
    let done = eventually(|| async { fully_enriched(&snapshot(session).await.unwrap().view) }).await;
    assert!(done, "Cards were never enriched");
}

#[tokio::test]
async fn test_session_starts_idle() {
    let session = start_session(FakeGitHub::default(), FakeSuggester::default()).await;

    let snap = snapshot(&session).await.unwrap();
    assert_eq!(snap.generation, 0);
    assert_eq!(snap.view, SearchView::Idle);

    session.stop(None);
}

#[tokio::test]
async fn test_search_renders_cards_then_enriches_them() {
    let github = FakeGitHub::default().with_results(
        "octocat",
        vec![repo(1, "octocat/hello-world"), repo(2, "octocat/spoon-knife-nolang")],
    );
    let session = start_session(github, FakeSuggester::default()).await;

    let generation = submit(&session, query("octocat")).await.unwrap();
    assert_eq!(generation, 1);

    wait_for_enrichment(&session).await;
    let snap = snapshot(&session).await.unwrap();

    match &snap.view {
        SearchView::Results { query, cards } => {
            assert_eq!(query, "octocat");
            assert_eq!(cards.len(), 2);
            assert_eq!(cards[0].full_name(), "octocat/hello-world");

            assert!(matches!(cards[0].contributors, ContributorCount::Known(_)));
            assert!(cards[0].has_chart());
            assert_eq!(cards[0].suggestions, SuggestionState::Idle);

            // no language data means no chart, and no error either
            assert_eq!(cards[1].languages, LanguageState::Missing);
        }
        other => panic!("Expected results, got: {:?}", other),
    }

    session.stop(None);
}

#[tokio::test]
async fn test_not_found_shows_error_and_no_cards() {
    let session = start_session(FakeGitHub::default(), FakeSuggester::default()).await;

    submit(&session, query("ghost")).await.unwrap();

    let settled = eventually(|| async {
        matches!(snapshot(&session).await.unwrap().view, SearchView::Error { .. })
    })
    .await;
    assert!(settled);

    let snap = snapshot(&session).await.unwrap();
    match &snap.view {
        SearchView::Error { failure } => {
            assert_eq!(failure.kind, FailureKind::NotFound);
            assert_eq!(
                failure.message,
                "Repository or user not found. Please check the name and try again."
            );
        }
        other => panic!("Expected error, got: {:?}", other),
    }
    assert!(snap.view.cards().is_empty());

    session.stop(None);
}

#[tokio::test]
async fn test_user_without_repositories_is_empty() {
    let github = FakeGitHub::default().with_results("loner", vec![]);
    let session = start_session(github, FakeSuggester::default()).await;

    submit(&session, query("loner")).await.unwrap();

    let settled = eventually(|| async {
        matches!(snapshot(&session).await.unwrap().view, SearchView::Empty { .. })
    })
    .await;
    assert!(settled);

    session.stop(None);
}

#[tokio::test]
async fn test_superseded_search_never_overwrites_newer_results() {
    let slow_gate = Arc::new(Notify::new());
    let github = FakeGitHub::default()
        .with_results("slowpoke", vec![repo(1, "slowpoke/old")])
        .with_search_gate("slowpoke", slow_gate.clone())
        .with_results("speedy", vec![repo(2, "speedy/new")]);
    let session = start_session(github, FakeSuggester::default()).await;

    let first = submit(&session, query("slowpoke")).await.unwrap();
    let second = submit(&session, query("speedy")).await.unwrap();
    assert!(second > first);

    wait_for_enrichment(&session).await;

    // let the first search answer after the second one is on screen
    slow_gate.notify_one();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snap = snapshot(&session).await.unwrap();
    assert_eq!(snap.generation, second);
    let names: Vec<&str> = snap.view.cards().iter().map(|c| c.full_name()).collect();
    assert_eq!(names, vec!["speedy/new"]);

    session.stop(None);
}

#[tokio::test]
async fn test_superseded_enrichment_is_dropped() {
    let contributor_gate = Arc::new(Notify::new());
    let github = Arc::new(
        FakeGitHub::default()
            .with_results("octocat", vec![repo(1, "octocat/hello-world")])
            .with_results("octocat/hello-world", vec![repo(1, "octocat/hello-world")])
            .with_contributor_gate(contributor_gate.clone()),
    );
    let session = SearchSession::spawn(github.clone(), Arc::new(FakeSuggester::default()))
        .await
        .expect("Failed to spawn search session");

    // first search: its contributor lookup (call 1) hangs on the gate
    submit(&session, query("octocat")).await.unwrap();
    let started = eventually(|| async { github.contributor_calls.load(Ordering::SeqCst) == 1 }).await;
    assert!(started);

    // second search shows the same repository; its lookup is call 2
    submit(&session, query("octocat/hello-world")).await.unwrap();
    wait_for_enrichment(&session).await;

    contributor_gate.notify_one();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snap = snapshot(&session).await.unwrap();
    assert_eq!(snap.view.cards()[0].contributors, ContributorCount::Known(2));

    session.stop(None);
}

#[tokio::test]
async fn test_suggestions_keep_model_order() {
    let github = FakeGitHub::default().with_results("torvalds/linux", vec![repo(1, "torvalds/linux")]);
    let suggester = FakeSuggester::default()
        .with_answer("torvalds/linux", &["torvalds/subsurface", "git/git"]);
    let session = start_session(github, suggester).await;

    submit(&session, query("torvalds/linux")).await.unwrap();
    wait_for_enrichment(&session).await;

    let trigger = request_suggestions(&session, "torvalds/linux").await.unwrap();
    assert_eq!(trigger, SuggestTrigger::Started);

    let resolved = eventually(|| async {
        let snap = snapshot(&session).await.unwrap();
        matches!(snap.view.card("torvalds/linux").map(|c| &c.suggestions), Some(SuggestionState::Resolved(_)))
    })
    .await;
    assert!(resolved);

    let snap = snapshot(&session).await.unwrap();
    assert_eq!(
        snap.view.card("torvalds/linux").unwrap().suggestions,
        SuggestionState::Resolved(SuggestionOutcome::Suggestions {
            repositories: vec!["torvalds/subsurface".to_string(), "git/git".to_string()],
        })
    );

    session.stop(None);
}

#[tokio::test]
async fn test_empty_and_failed_suggestions() {
    let github = FakeGitHub::default().with_results(
        "octocat",
        vec![repo(1, "octocat/quiet"), repo(2, "octocat/broken")],
    );
    let suggester = FakeSuggester::default().with_answer("octocat/quiet", &[]);
    let session = start_session(github, suggester).await;

    submit(&session, query("octocat")).await.unwrap();
    wait_for_enrichment(&session).await;

    request_suggestions(&session, "octocat/quiet").await.unwrap();
    request_suggestions(&session, "octocat/broken").await.unwrap();

    let resolved = eventually(|| async {
        let snap = snapshot(&session).await.unwrap();
        snap.view
            .cards()
            .iter()
            .all(|c| matches!(c.suggestions, SuggestionState::Resolved(_)))
    })
    .await;
    assert!(resolved);

    let snap = snapshot(&session).await.unwrap();
    assert_eq!(
        snap.view.card("octocat/quiet").unwrap().suggestions,
        SuggestionState::Resolved(SuggestionOutcome::NoSuggestions {
            message: NO_SUGGESTIONS_MESSAGE.to_string()
        })
    );
    assert_eq!(
        snap.view.card("octocat/broken").unwrap().suggestions,
        SuggestionState::Resolved(SuggestionOutcome::Failed {
            message: SUGGESTION_FAILED_MESSAGE.to_string()
        })
    );
    // a failed suggestion stays on its card
    assert!(matches!(snap.view, SearchView::Results { .. }));

    session.stop(None);
}

#[tokio::test]
async fn test_second_trigger_while_pending_is_rejected() {
    let gate = Arc::new(Notify::new());
    let github = FakeGitHub::default().with_results("torvalds/linux", vec![repo(1, "torvalds/linux")]);
    let suggester = FakeSuggester::default()
        .with_answer("torvalds/linux", &["git/git"])
        .with_gate(gate.clone());
    let session = start_session(github, suggester).await;

    submit(&session, query("torvalds/linux")).await.unwrap();
    wait_for_enrichment(&session).await;

    assert_eq!(
        request_suggestions(&session, "torvalds/linux").await.unwrap(),
        SuggestTrigger::Started
    );
    assert_eq!(
        request_suggestions(&session, "torvalds/linux").await.unwrap(),
        SuggestTrigger::AlreadyPending
    );
    assert_eq!(
        request_suggestions(&session, "someone/else").await.unwrap(),
        SuggestTrigger::UnknownRepository
    );

    gate.notify_one();
    let resolved = eventually(|| async {
        let snap = snapshot(&session).await.unwrap();
        !snap.view.card("torvalds/linux").unwrap().suggestions.is_pending()
    })
    .await;
    assert!(resolved);

    // the trigger is usable again once the first request is done
    assert_eq!(
        request_suggestions(&session, "torvalds/linux").await.unwrap(),
        SuggestTrigger::Started
    );
    gate.notify_one();

    session.stop(None);
}

#[tokio::test]
async fn test_suggestions_from_previous_search_are_dropped() {
    let gate = Arc::new(Notify::new());
    let github = FakeGitHub::default()
        .with_results("torvalds/linux", vec![repo(1, "torvalds/linux")])
        .with_results("torvalds", vec![repo(1, "torvalds/linux")]);
    let suggester = FakeSuggester::default()
        .with_answer("torvalds/linux", &["git/git"])
        .with_gate(gate.clone());
    let session = start_session(github, suggester).await;

    submit(&session, query("torvalds/linux")).await.unwrap();
    wait_for_enrichment(&session).await;
    request_suggestions(&session, "torvalds/linux").await.unwrap();

    submit(&session, query("torvalds")).await.unwrap();
    wait_for_enrichment(&session).await;

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snap = snapshot(&session).await.unwrap();
    assert_eq!(
        snap.view.card("torvalds/linux").unwrap().suggestions,
        SuggestionState::Idle
    );

    session.stop(None);
}

#[tokio::test]
async fn test_enrichment_finishing_after_stop_is_harmless() {
    let contributor_gate = Arc::new(Notify::new());
    let github = Arc::new(
        FakeGitHub::default()
            .with_results("octocat", vec![repo(1, "octocat/hello-world")])
            .with_contributor_gate(contributor_gate.clone()),
    );
    let session = SearchSession::spawn(github.clone(), Arc::new(FakeSuggester::default()))
        .await
        .expect("Failed to spawn search session");

    submit(&session, query("octocat")).await.unwrap();
    let started = eventually(|| async { github.contributor_calls.load(Ordering::SeqCst) == 1 }).await;
    assert!(started);

    session
        .stop_and_wait(None, Some(Duration::from_secs(1)))
        .await
        .expect("Session did not stop");

    // the lookup completes with nobody left to receive it
    contributor_gate.notify_one();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = snapshot(&session).await.unwrap_err();
    assert!(matches!(err, repolook::error::RepoLookError::SessionError(_)));
}
