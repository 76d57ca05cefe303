//! Supervisor behavior: fan-out, concurrency ceiling, partial failure,
//! rounds, fallback, cancellation.

mod common;

use common::mocks::{tool_call_response, BehaviorLLM, GaugeState, GaugedTool, ScriptedLLM};
use delver::llm::LLMResponse;
use delver::research::Supervisor;
use delver::tools::ToolRegistry;
use delver::types::{DelverError, FindingStatus, ResearchBrief};
use delver::utils::config::{LlmConfig, ResearchConfig};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn llm_config() -> LlmConfig {
    LlmConfig {
        structured_retries: 2,
        call_timeout_secs: 5,
        ..LlmConfig::default()
    }
}

fn research_config(concurrent: usize, rounds: usize) -> ResearchConfig {
    ResearchConfig {
        max_tool_iterations: 3,
        max_concurrent_researchers: concurrent,
        max_delegation_rounds: rounds,
    }
}

fn delegation_json(sub_topics: &[&str], complete: bool) -> String {
    json!({
        "sub_topics": sub_topics,
        "research_complete": complete,
        "reasoning": "test decision"
    })
    .to_string()
}

fn is_delegation(prompt: &str) -> bool {
    prompt.contains("lead researcher coordinating a team")
}

/// LLM where each loop searches once and stops, with a fixed delegation
/// decision up front.
fn delegating_llm(sub_topics: Vec<String>, complete: bool) -> Arc<BehaviorLLM> {
    Arc::new(BehaviorLLM::new(
        move |prompt| {
            if is_delegation(prompt) {
                Ok(delegation_json(
                    &sub_topics.iter().map(String::as_str).collect::<Vec<_>>(),
                    complete,
                ))
            } else {
                Ok("compressed summary".to_string())
            }
        },
        |history, _| {
            let searched = history
                .iter()
                .any(|m| m.content.starts_with("[web_search]"));
            if searched {
                Ok(LLMResponse::text("done"))
            } else {
                Ok(tool_call_response("web_search", json!({"query": "q"})))
            }
        },
    ))
}

fn gauged_registry(state: Arc<GaugeState>, hold: Duration) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(GaugedTool { state, hold }));
    Arc::new(registry)
}

fn not_cancelled() -> watch::Receiver<bool> {
    // Dropping the sender means the run can never be cancelled.
    let (_tx, rx) = watch::channel(false);
    rx
}

#[tokio::test]
async fn five_sub_topics_never_exceed_a_ceiling_of_two() {
    let topics: Vec<String> = (1..=5).map(|i| format!("sub-topic number {i}")).collect();
    let llm = delegating_llm(topics, true);
    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(Arc::clone(&gauge), Duration::from_millis(40));

    let supervisor = Supervisor::new(llm, tools, &research_config(2, 1), &llm_config());
    let brief = ResearchBrief::new("wide brief");
    let (assignments, findings) = supervisor.coordinate(&brief, not_cancelled()).await.unwrap();

    assert_eq!(assignments.len(), 5);
    assert_eq!(findings.len(), 5);
    assert!(gauge.peak() <= 2, "peak overlap was {}", gauge.peak());
    assert!(gauge.peak() >= 1);

    // Topic ids are unique and follow issue order.
    let ids: Vec<&str> = assignments.iter().map(|a| a.topic_id.as_str()).collect();
    assert_eq!(ids, vec!["t1-1", "t1-2", "t1-3", "t1-4", "t1-5"]);
    for id in ids {
        assert!(findings.contains_key(id));
    }
}

#[tokio::test]
async fn failed_sub_topic_still_reaches_the_findings() {
    let llm = Arc::new(BehaviorLLM::new(
        |prompt| {
            if is_delegation(prompt) {
                Ok(delegation_json(&["healthy topic", "doomed topic"], true))
            } else {
                Ok("compressed summary".to_string())
            }
        },
        |history, _| {
            if history
                .first()
                .map(|m| m.content.contains("doomed"))
                .unwrap_or(false)
            {
                Err(DelverError::Llm("model refuses this topic".to_string()))
            } else {
                Ok(LLMResponse::text("answered directly"))
            }
        },
    ));
    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(gauge, Duration::from_millis(1));

    let supervisor = Supervisor::new(llm, tools, &research_config(3, 1), &llm_config());
    let brief = ResearchBrief::new("split brief");
    let (_, findings) = supervisor.coordinate(&brief, not_cancelled()).await.unwrap();

    assert_eq!(findings.len(), 2);
    assert_eq!(findings["t1-1"].status, FindingStatus::Complete);
    assert_eq!(findings["t1-2"].status, FindingStatus::Failed);
    assert!(findings["t1-2"].summary_text.contains("doomed topic"));
    assert_eq!(findings["t1-2"].source_count, 0);
}

#[tokio::test]
async fn every_sub_topic_failing_is_fatal() {
    let llm = Arc::new(BehaviorLLM::new(
        |prompt| {
            if is_delegation(prompt) {
                Ok(delegation_json(&["first doomed", "second doomed"], true))
            } else {
                Ok("unused".to_string())
            }
        },
        |_, _| Err(DelverError::Llm("provider outage".to_string())),
    ));
    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(gauge, Duration::from_millis(1));

    let supervisor = Supervisor::new(llm, tools, &research_config(2, 1), &llm_config());
    let brief = ResearchBrief::new("unlucky brief");
    let result = supervisor.coordinate(&brief, not_cancelled()).await;

    assert!(matches!(result, Err(DelverError::AllSubTopicsFailed(2))));
}

#[tokio::test]
async fn empty_first_delegation_falls_back_to_single_agent() {
    let llm = Arc::new(BehaviorLLM::new(
        |prompt| {
            if is_delegation(prompt) {
                Ok(delegation_json(&[], false))
            } else {
                Ok("compressed summary".to_string())
            }
        },
        |_, _| Ok(LLMResponse::text("answered without tools")),
    ));
    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(gauge, Duration::from_millis(1));

    // Two rounds: the second empty delegation, now with a finding on the
    // board, is the stop signal.
    let supervisor = Supervisor::new(llm, tools, &research_config(3, 2), &llm_config());
    let brief = ResearchBrief::new("narrow brief about one thing");
    let (assignments, findings) = supervisor.coordinate(&brief, not_cancelled()).await.unwrap();

    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].topic_id, "t1-1");
    assert_eq!(assignments[0].objective, "narrow brief about one thing");
    assert_eq!(findings.len(), 1);
}

#[tokio::test]
async fn second_round_sees_first_round_findings() {
    let delegation_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delegation_calls);
    let second_round_prompt: Arc<std::sync::Mutex<String>> = Arc::default();
    let captured = Arc::clone(&second_round_prompt);

    let llm = Arc::new(BehaviorLLM::new(
        move |prompt| {
            if is_delegation(prompt) {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                if call == 0 {
                    Ok(delegation_json(&["alpha side"], false))
                } else {
                    *captured.lock().unwrap() = prompt.to_string();
                    Ok(delegation_json(&["beta side"], true))
                }
            } else {
                Ok("alpha conclusions".to_string())
            }
        },
        |_, _| Ok(LLMResponse::text("straight answer")),
    ));
    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(gauge, Duration::from_millis(1));

    let supervisor = Supervisor::new(llm, tools, &research_config(3, 3), &llm_config());
    let brief = ResearchBrief::new("two-sided brief");
    let (assignments, findings) = supervisor.coordinate(&brief, not_cancelled()).await.unwrap();

    assert_eq!(delegation_calls.load(Ordering::SeqCst), 2);
    let ids: Vec<&str> = assignments.iter().map(|a| a.topic_id.as_str()).collect();
    assert_eq!(ids, vec!["t1-1", "t2-1"]);
    assert_eq!(findings.len(), 2);

    // Re-delegation carried the first round's compressed finding.
    let prompt = second_round_prompt.lock().unwrap().clone();
    assert!(prompt.contains("alpha side"));
    assert!(prompt.contains("alpha conclusions"));
}

#[tokio::test]
async fn round_budget_bounds_delegation_even_without_completion() {
    let delegation_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delegation_calls);

    // Never declares completion; only the round budget stops it.
    let llm = Arc::new(BehaviorLLM::new(
        move |prompt| {
            if is_delegation(prompt) {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(delegation_json(&["one more angle"], false))
            } else {
                Ok("summary".to_string())
            }
        },
        |_, _| Ok(LLMResponse::text("answer")),
    ));
    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(gauge, Duration::from_millis(1));

    let supervisor = Supervisor::new(llm, tools, &research_config(3, 2), &llm_config());
    let brief = ResearchBrief::new("open-ended brief");
    let (assignments, _) = supervisor.coordinate(&brief, not_cancelled()).await.unwrap();

    assert_eq!(delegation_calls.load(Ordering::SeqCst), 2);
    assert_eq!(assignments.len(), 2);
}

#[tokio::test]
async fn undecodable_delegation_exhausts_retries_and_fails() {
    let llm = Arc::new(ScriptedLLM::new());
    llm.push_text("I would rather describe my plan in prose.");
    llm.push_text("Still prose, sorry.");

    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(gauge, Duration::from_millis(1));
    let supervisor = Supervisor::new(llm, tools, &research_config(2, 1), &llm_config());

    let brief = ResearchBrief::new("brief");
    let result = supervisor.coordinate(&brief, not_cancelled()).await;
    assert!(matches!(result, Err(DelverError::Decode(_))));
}

#[tokio::test]
async fn cancellation_mid_batch_aborts_the_run() {
    let topics: Vec<String> = (1..=3).map(|i| format!("slow topic {i}")).collect();
    let llm = delegating_llm(topics, true);
    let gauge = Arc::new(GaugeState::default());
    // Long enough that cancellation lands while searches are in flight.
    let tools = gauged_registry(Arc::clone(&gauge), Duration::from_secs(30));

    let supervisor = Supervisor::new(llm, tools, &research_config(3, 1), &llm_config());
    let brief = ResearchBrief::new("cancelled brief");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let run = tokio::spawn(async move { supervisor.coordinate(&brief, cancel_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel_tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("cancellation must unblock the run promptly")
        .unwrap();
    assert!(matches!(result, Err(DelverError::Cancelled)));
}

#[tokio::test]
async fn sub_topic_prompts_stay_isolated_per_loop() {
    // Each loop's first message must be its own objective, never a sibling's.
    let cross_talk = Arc::new(AtomicUsize::new(0));
    let watcher = Arc::clone(&cross_talk);

    let llm = Arc::new(BehaviorLLM::new(
        |prompt| {
            if is_delegation(prompt) {
                Ok(delegation_json(&["only about apples", "only about pears"], true))
            } else {
                Ok("summary".to_string())
            }
        },
        move |history, _| {
            let first = history.first().map(|m| m.content.as_str()).unwrap_or("");
            let mentions_apples = first.contains("apples");
            let mentions_pears = first.contains("pears");
            if mentions_apples && mentions_pears {
                watcher.fetch_add(1, Ordering::SeqCst);
            }
            Ok(LLMResponse::text("answer"))
        },
    ));
    let gauge = Arc::new(GaugeState::default());
    let tools = gauged_registry(gauge, Duration::from_millis(1));

    let supervisor = Supervisor::new(llm, tools, &research_config(2, 1), &llm_config());
    let brief = ResearchBrief::new("apples versus pears");
    let (_, findings) = supervisor.coordinate(&brief, not_cancelled()).await.unwrap();

    assert_eq!(findings.len(), 2);
    assert_eq!(cross_talk.load(Ordering::SeqCst), 0);
}
