use std::time::Duration;

use jobdeck_client::{ClientError, JobApi, JobsClient};
use jobdeck_core::domain::run::RunState;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> JobsClient {
    JobsClient::new(server.uri(), "test-token", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn list_runs_maps_states_and_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/runs/list"))
        .and(query_param("job_id", "111"))
        .and(query_param("limit", "10"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "runs": [
                {
                    "run_id": 2,
                    "job_id": 111,
                    "state": {"life_cycle_state": "RUNNING"},
                    "start_time": 200000
                },
                {
                    "run_id": 1,
                    "job_id": 111,
                    "state": {"life_cycle_state": "TERMINATED", "result_state": "SUCCESS"},
                    "start_time": 100000,
                    "end_time": 160000
                }
            ],
            "has_more": false
        })))
        .mount(&server)
        .await;

    let runs = client_for(&server).list_runs_for_job(111, 10).await.unwrap();

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].state, RunState::Running);
    assert_eq!(runs[1].state, RunState::Success);
    assert_eq!(runs[1].duration_seconds, Some(60.0));
}

#[tokio::test]
async fn list_runs_without_runs_field_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/runs/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"has_more": false})))
        .mount(&server)
        .await;

    let runs = client_for(&server).list_runs_for_job(5, 10).await.unwrap();
    assert!(runs.is_empty());
}

#[tokio::test]
async fn get_job_meta_reads_settings_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/get"))
        .and(query_param("job_id", "111"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": 111,
            "settings": {"name": "nightly_etl"}
        })))
        .mount(&server)
        .await;

    let meta = client_for(&server).get_job_meta(111).await.unwrap();
    assert_eq!(meta.name, "nightly_etl");
}

#[tokio::test]
async fn trigger_run_returns_new_run_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/2.1/jobs/run-now"))
        .and(body_json(json!({"job_id": 111})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run_id": 2,
            "number_in_job": 2
        })))
        .mount(&server)
        .await;

    let run_id = client_for(&server).trigger_run(111).await.unwrap();
    assert_eq!(run_id, 2);
}

#[tokio::test]
async fn cancel_of_finished_run_is_already_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/2.1/jobs/runs/cancel"))
        .and(body_json(json!({"run_id": 7})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "INVALID_STATE",
            "message": "Run 7 is already in a terminal state"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).cancel_run(7).await.unwrap_err();
    assert!(matches!(err, ClientError::AlreadyTerminal(_)));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/get"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "RESOURCE_DOES_NOT_EXIST",
            "message": "Job 999 does not exist."
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).get_job_meta(999).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn rejected_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/runs/list"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid access token"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_runs_for_job(1, 10).await.unwrap_err();
    assert_eq!(err, ClientError::Auth("Invalid access token".to_string()));
}

#[tokio::test]
async fn slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/runs/list"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"runs": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = JobsClient::new(server.uri(), "t", Duration::from_millis(50)).unwrap();
    let err = client.list_runs_for_job(1, 10).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
}

#[tokio::test]
async fn list_workspace_jobs_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/list"))
        .and(query_param("page_token", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [{"job_id": 2, "settings": {"name": "report"}}],
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2.1/jobs/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [{"job_id": 1, "creator_user_name": "ana", "settings": {"name": "etl"}}],
            "has_more": true,
            "next_page_token": "next"
        })))
        .mount(&server)
        .await;

    let jobs = client_for(&server).list_workspace_jobs().await.unwrap();
    let names: Vec<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["etl", "report"]);
    assert_eq!(jobs[0].creator.as_deref(), Some("ana"));
}
