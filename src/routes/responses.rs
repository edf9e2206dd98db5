//! Filtered submission responses endpoint

use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::error::ApiResult;
use crate::filter;
use crate::models::{ErrorResponse, ResponsesPage, SubmissionsPage};
use crate::paginate::paginate;
use crate::params::QueryParams;
use crate::upstream::UpstreamError;
use crate::ApiState;

/// Routes for the filtered responses endpoint
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/:form_id/filteredResponses", get(filtered_responses))
}

/// List a form's submissions, optionally filtered on answer values
///
/// Without `filters` the upstream page is returned untouched. With `filters`
/// the page fetched for the given `limit`/`offset` is filtered and then
/// re-paginated, so only submissions inside that one upstream page are
/// considered. Matching records are returned as the upstream sent them.
#[utoipa::path(
    get,
    path = "/{form_id}/filteredResponses",
    params(
        ("form_id" = String, Path, description = "Upstream form identifier"),
        ("limit" = Option<u32>, Query, description = "Page size, 1 to 150 (default 150)"),
        ("offset" = Option<u64>, Query, description = "Records to skip (default 0)"),
        ("afterDate" = Option<String>, Query, description = "Only submissions after this ISO 8601 date"),
        ("beforeDate" = Option<String>, Query, description = "Only submissions before this ISO 8601 date"),
        ("status" = Option<String>, Query, description = "`in_progress` to list unfinished submissions"),
        ("includeEditLink" = Option<bool>, Query, description = "Include edit links"),
        ("sort" = Option<String>, Query, description = "`asc` (default) or `desc`"),
        ("filters" = Option<String>, Query, description = "JSON array of {id, condition, value} clauses"),
    ),
    responses(
        (status = 200, description = "Filtered page of submissions", body = ResponsesPage),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Upstream fetch failed", body = ErrorResponse)
    ),
    tag = "responses"
)]
pub async fn filtered_responses(
    State(state): State<Arc<ApiState>>,
    Path(form_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::from_query(query.as_deref())?;

    let body = state
        .upstream
        .fetch_submissions(&form_id, &params.upstream_query())
        .await?;

    let Some(filters) = params.filters else {
        return Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response());
    };

    let page: SubmissionsPage = serde_json::from_slice(&body).map_err(UpstreamError::from)?;
    let fetched = page.responses.len();
    let matching = filter::apply(page.responses, &filters);

    tracing::debug!(
        %form_id,
        clauses = filters.len(),
        fetched,
        matching = matching.len(),
        "filtered upstream page"
    );

    let offset = usize::try_from(params.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(params.limit).unwrap_or(usize::MAX);
    let page = paginate(matching, offset, limit);

    Ok(Json(ResponsesPage {
        responses: page.items,
        total_responses: page.total,
        page_count: page.page_count,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::routes::test_support::{api_config, fixture, test_server};

    const FORM_ID: &str = "cLZojxk94ous";
    const NOTES: &str = "4KC356y4M6W8jHPKx9QfEy";
    const CHECK_IN: &str = "dSRAe3hygqVwTpPK69p5td";
    const EMPLOYEES: &str = "fFnyxwWa3KV6nBdfBDCHEA";

    async fn upstream_with_fixture() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{FORM_ID}/submissions")))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
            .mount(&server)
            .await;
        server
    }

    fn route() -> String {
        format!("/{FORM_ID}/filteredResponses")
    }

    #[tokio::test]
    async fn test_responds_with_json() {
        let upstream = upstream_with_fixture().await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server.get(&route()).await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert!(body.get("responses").is_some());
        assert!(body.get("totalResponses").is_some());
        assert!(body.get("pageCount").is_some());
    }

    #[tokio::test]
    async fn test_passes_upstream_payload_through_without_filters() {
        let upstream = upstream_with_fixture().await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server.get(&route()).add_query_param("limit", 3).await;
        response.assert_status_ok();
        response.assert_json(&fixture());
    }

    #[tokio::test]
    async fn test_passthrough_keeps_upstream_bytes() {
        let raw = r#"{"responses":[{"submissionId":"z","questions":[]}],"totalResponses":1,"pageCount":1}"#;
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(raw, "application/json"))
            .mount(&upstream)
            .await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server.get(&route()).await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "application/json");
        assert_eq!(response.text(), raw);
    }

    #[tokio::test]
    async fn test_filters_responses() {
        let upstream = upstream_with_fixture().await;
        let server = test_server(api_config(&upstream.uri()));

        let filters = json!([
            { "id": NOTES, "condition": "equals", "value": "Nope" },
            { "id": CHECK_IN, "condition": "less_than", "value": "2024-02-25" },
            { "id": EMPLOYEES, "condition": "greater_than", "value": 49 }
        ]);

        let response = server
            .get(&route())
            .add_query_param("filters", filters.to_string())
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["totalResponses"], 1);
        assert_eq!(body["pageCount"], 1);
        assert_eq!(body["responses"].as_array().unwrap().len(), 1);
        assert_eq!(body["responses"][0]["submissionId"], "sub-02");
    }

    #[tokio::test]
    async fn test_filtered_records_are_returned_intact() {
        let upstream = upstream_with_fixture().await;
        let server = test_server(api_config(&upstream.uri()));

        let filters = json!([{ "id": "bE2Bo4cGUv49cjnqZ4UnkW", "condition": "equals", "value": "Amy" }]);
        let response = server
            .get(&route())
            .add_query_param("filters", filters.to_string())
            .await;

        let body: Value = response.json();
        assert_eq!(body["responses"][0], fixture()["responses"][2]);
    }

    #[tokio::test]
    async fn test_odd_records_do_not_fail_the_page() {
        let odd_type = json!({
            "submissionId": "odd",
            "questions": [{ "id": "n", "name": "N", "type": null, "value": 5 }]
        });
        let sparse = json!({
            "submissionId": "sparse",
            "submissionTime": null,
            "lastUpdatedAt": null,
            "quiz": null,
            "calculations": [{ "id": "c" }],
            "questions": [{ "id": "n", "type": "NumberInput", "value": 7 }, { "id": "blank", "type": "ShortAnswer" }]
        });
        let page = json!({
            "responses": [
                odd_type,
                { "submissionId": 42, "questions": "none" },
                "not a record",
                sparse.clone(),
                { "questions": [{ "id": "n", "type": "NumberInput", "value": 9 }] }
            ],
            "totalResponses": 5,
            "pageCount": 1
        });

        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page))
            .mount(&upstream)
            .await;
        let server = test_server(api_config(&upstream.uri()));

        let filters = json!([{ "id": "n", "condition": "greater_than", "value": 1 }]);
        let response = server
            .get(&route())
            .add_query_param("filters", filters.to_string())
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["totalResponses"], 2);
        // Kept records come back as sent, nulls and absent keys included
        assert_eq!(body["responses"][0], sparse);
        assert_eq!(
            body["responses"][1],
            json!({ "questions": [{ "id": "n", "type": "NumberInput", "value": 9 }] })
        );
    }

    #[tokio::test]
    async fn test_paginates_filtered_responses() {
        let upstream = upstream_with_fixture().await;
        let server = test_server(api_config(&upstream.uri()));
        let filters = json!([{ "id": EMPLOYEES, "condition": "greater_than", "value": 1 }]).to_string();

        let cases: [(Option<u32>, Option<u32>, usize, u64); 4] = [
            (None, None, 5, 1),
            (None, Some(4), 1, 1),
            (Some(2), Some(0), 2, 3),
            (Some(2), Some(4), 1, 3),
        ];

        for (limit, offset, expected_len, expected_pages) in cases {
            let mut request = server.get(&route()).add_query_param("filters", &filters);
            if let Some(limit) = limit {
                request = request.add_query_param("limit", limit);
            }
            if let Some(offset) = offset {
                request = request.add_query_param("offset", offset);
            }

            let response = request.await;
            response.assert_status_ok();

            let body: Value = response.json();
            assert_eq!(
                body["responses"].as_array().unwrap().len(),
                expected_len,
                "limit={limit:?} offset={offset:?}"
            );
            assert_eq!(body["pageCount"], expected_pages, "limit={limit:?} offset={offset:?}");
            assert_eq!(body["totalResponses"], 5);
        }
    }

    #[tokio::test]
    async fn test_missing_question_excludes_record_for_does_not_equal() {
        let upstream = upstream_with_fixture().await;
        let server = test_server(api_config(&upstream.uri()));

        // sub-08 has no employee count; every other record differs from 12345
        let filters = json!([{ "id": EMPLOYEES, "condition": "does_not_equal", "value": 12345 }]);
        let response = server
            .get(&route())
            .add_query_param("filters", filters.to_string())
            .await;

        let body: Value = response.json();
        assert_eq!(body["totalResponses"], 8);
        let ids: Vec<&str> = body["responses"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["submissionId"].as_str())
            .collect();
        assert!(!ids.contains(&"sub-08"));
    }

    #[tokio::test]
    async fn test_forwards_validated_params_upstream() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{FORM_ID}/submissions")))
            .and(query_param("limit", "20"))
            .and(query_param("offset", "0"))
            .and(query_param("sort", "desc"))
            .and(query_param("status", "in_progress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "responses": [] })))
            .expect(1)
            .mount(&upstream)
            .await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server
            .get(&route())
            .add_query_param("limit", 20)
            .add_query_param("sort", "desc")
            .add_query_param("status", "in_progress")
            .add_query_param("filters", "[]")
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "responses": [], "totalResponses": 0, "pageCount": 0 }));
    }

    #[tokio::test]
    async fn test_invalid_filters_rejected_before_upstream_call() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
            .expect(0)
            .mount(&upstream)
            .await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server
            .get(&route())
            .add_query_param("filters", "[{ not json")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["error"], "\"filters\" must be a valid JSON array of objects");
    }

    #[tokio::test]
    async fn test_invalid_limit_rejected() {
        let upstream = MockServer::start().await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server.get(&route()).add_query_param("limit", 151).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "\"limit\" must be less than or equal to 150" }));
    }

    #[tokio::test]
    async fn test_upstream_failure_status() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&upstream)
            .await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server.get(&route()).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Failed to fetch data" }));
    }

    #[tokio::test]
    async fn test_upstream_unreachable() {
        let upstream = MockServer::start().await;
        let uri = upstream.uri();
        drop(upstream);
        let server = test_server(api_config(&uri));

        let response = server.get(&route()).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Failed to fetch data" }));
    }

    #[tokio::test]
    async fn test_malformed_upstream_page_with_filters() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&upstream)
            .await;
        let server = test_server(api_config(&upstream.uri()));

        let response = server
            .get(&route())
            .add_query_param("filters", "[]")
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "error": "Failed to fetch data" }));
    }
}
