//! Black-box tests for the `AppState` composition root: session/connection
//! lifecycle, validation, and one end-to-end transcript flow through the
//! fully wired pipeline (stub translator/synth/transport backends).

use relay_config::Settings;
use relay_core::{Emotion, EmotionDynamics, FinalResult, VolumeLevel};
use relay_server::AppState;

fn dynamics() -> EmotionDynamics {
    EmotionDynamics {
        emotion: Emotion::Neutral,
        intensity: 0.0,
        rate_wpm: 150,
        volume_level: VolumeLevel::Normal,
    }
}

#[tokio::test]
async fn create_session_then_join_reaches_expected_listener_count() {
    let state = AppState::new(Settings::default());

    let (session, speaker_conn) = state
        .create_session("en".to_string(), "standard".to_string(), None, None, None)
        .await
        .expect("session creation should succeed");
    assert!(!speaker_conn.is_empty());
    assert!(session.is_active);

    let (joined, _listener_conn, listener_count) = state
        .join_session(&session.session_id, "es")
        .await
        .expect("join should succeed for a supported language");
    assert_eq!(joined.session_id, session.session_id);
    assert_eq!(listener_count, 1);

    let status = state
        .session_status(&session.session_id)
        .await
        .expect("status should be available for a live session");
    assert_eq!(status.listener_count, 1);
    assert_eq!(status.language_distribution.get("es"), Some(&1));
}

#[tokio::test]
async fn create_session_rejects_blank_source_language() {
    let state = AppState::new(Settings::default());
    let result = state
        .create_session("   ".to_string(), "standard".to_string(), None, None, None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn create_session_rejects_out_of_range_min_stability() {
    let state = AppState::new(Settings::default());
    let result = state
        .create_session("en".to_string(), "standard".to_string(), None, Some(0.5), None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn join_session_rejects_unsupported_language() {
    let state = AppState::new(Settings::default());
    let (session, _) = state
        .create_session("en".to_string(), "standard".to_string(), None, None, None)
        .await
        .unwrap();

    let result = state.join_session(&session.session_id, "xx").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn join_session_fails_for_unknown_session() {
    let state = AppState::new(Settings::default());
    let result = state.join_session("does-not-exist", "es").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn change_language_updates_an_existing_listener() {
    let state = AppState::new(Settings::default());
    let (session, _) = state
        .create_session("en".to_string(), "standard".to_string(), None, None, None)
        .await
        .unwrap();
    let (_, listener_conn, _) = state.join_session(&session.session_id, "es").await.unwrap();

    state.change_language(&listener_conn, "fr").await.unwrap();

    let status = state.session_status(&session.session_id).await.unwrap();
    assert_eq!(status.language_distribution.get("fr"), Some(&1));
    assert!(status.language_distribution.get("es").is_none());
}

#[tokio::test]
async fn change_language_rejects_unknown_connection() {
    let state = AppState::new(Settings::default());
    let result = state.change_language("no-such-connection", "es").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn control_session_pause_then_resume_returns_listener_ids() {
    let state = AppState::new(Settings::default());
    let (session, _) = state
        .create_session("en".to_string(), "standard".to_string(), None, None, None)
        .await
        .unwrap();
    let (_, listener_conn, _) = state.join_session(&session.session_id, "es").await.unwrap();

    let paused_listeners = state.control_session(&session.session_id, true).await.unwrap();
    assert_eq!(paused_listeners, vec![listener_conn.clone()]);

    let status = state.session_status(&session.session_id).await.unwrap();
    assert!(status.broadcast_state.is_paused);

    let resumed_listeners = state.control_session(&session.session_id, false).await.unwrap();
    assert_eq!(resumed_listeners, vec![listener_conn]);
}

#[tokio::test]
async fn final_result_with_a_listener_present_forwards_through_the_pipeline() {
    let state = AppState::new(Settings::default());
    let (session, _) = state
        .create_session("en".to_string(), "standard".to_string(), None, None, None)
        .await
        .unwrap();
    state.join_session(&session.session_id, "es").await.unwrap();

    let result = FinalResult {
        result_id: "f1".to_string(),
        text: "hello there".to_string(),
        timestamp: relay_core::now_ms(),
        session_id: session.session_id.clone(),
        source_language: "en".to_string(),
        replaces_result_ids: Vec::new(),
    };

    let outcome = state
        .handle_final_result(result, &dynamics())
        .await
        .expect("a session engine should exist after create_session");
    assert_eq!(outcome, relay_pipeline::FinalOutcome::Forwarded);
}

#[tokio::test]
async fn final_result_for_unknown_session_returns_none() {
    let state = AppState::new(Settings::default());
    let result = FinalResult {
        result_id: "f1".to_string(),
        text: "hello".to_string(),
        timestamp: relay_core::now_ms(),
        session_id: "ghost-session".to_string(),
        source_language: "en".to_string(),
        replaces_result_ids: Vec::new(),
    };
    assert!(state.handle_final_result(result, &dynamics()).await.is_none());
}

#[tokio::test]
async fn end_session_removes_its_engine_so_later_results_are_ignored() {
    let state = AppState::new(Settings::default());
    let (session, _) = state
        .create_session("en".to_string(), "standard".to_string(), None, None, None)
        .await
        .unwrap();
    state.end_session(&session.session_id);

    let result = FinalResult {
        result_id: "f1".to_string(),
        text: "hello".to_string(),
        timestamp: relay_core::now_ms(),
        session_id: session.session_id,
        source_language: "en".to_string(),
        replaces_result_ids: Vec::new(),
    };
    assert!(state.handle_final_result(result, &dynamics()).await.is_none());
}

#[tokio::test]
async fn sweep_closes_nothing_on_a_fresh_state() {
    let state = AppState::new(Settings::default());
    let summary = state.run_sweep().await;
    assert_eq!(summary.closed, 0);
}
