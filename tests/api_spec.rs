use speculate2::speculate;

speculate! {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use planner::config::WorkflowConfig;
    use planner::planning::{Orchestrator, TracingProgress, UnavailableGenerator};
    use planner::Database;
    use serde_json::{json, Value};

    fn test_server(db: &Database) -> TestServer {
        let orchestrator = Orchestrator::new(
            Arc::new(db.clone()),
            Arc::new(UnavailableGenerator::new("no model in tests")),
            Arc::new(TracingProgress),
            WorkflowConfig::default(),
        );
        TestServer::new(planner::api::create_router(Arc::new(orchestrator)))
            .expect("build test server")
    }

    fn new_plan(title: &str) -> Value {
        json!({
            "title": title,
            "goal": "expose CRUD endpoints",
            "category": "project"
        })
    }

    before {
        let db = Database::open_in_memory().expect("open in-memory database");
        db.migrate().expect("apply schema");
        let server = tokio_test::block_on(async { test_server(&db) });
    }

    it "reports health" {
        tokio_test::block_on(async {
            let response = server.get("/health").await;
            response.assert_status_ok();
            assert_eq!(response.json::<Value>()["status"], "ok");
        });
    }

    describe "creating plans" {
        it "creates a plan from the template when no model is configured" {
            tokio_test::block_on(async {
                let response = server.post("/api/v1/plans").json(&new_plan("Build REST API")).await;

                response.assert_status(StatusCode::CREATED);
                let body = response.json::<Value>();
                assert_eq!(body["outcome"], "committed");
                assert_eq!(body["plan"]["status"], "active");
                assert_eq!(body["plan"]["tasks"][0]["sequence_index"], 0);
                assert_eq!(body["notices"][0], "plan generated from template");
            });
        }

        it "rejects an unknown category with 400" {
            tokio_test::block_on(async {
                let mut body = new_plan("Build REST API");
                body["category"] = json!("hobby");

                let response = server.post("/api/v1/plans").json(&body).await;

                response.assert_status(StatusCode::BAD_REQUEST);
                assert!(response.json::<Value>()["error"].as_str().unwrap().contains("hobby"));
            });
        }
    }

    describe "listing plans" {
        it "hides completed plans unless asked" {
            tokio_test::block_on(async {
                let created = server.post("/api/v1/plans").json(&new_plan("Done soon")).await.json::<Value>();
                server.post("/api/v1/plans").json(&new_plan("Still open")).await;
                let plan_id = created["plan"]["id"].as_i64().unwrap();
                let task_ids: Vec<i64> = created["plan"]["tasks"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|t| t["id"].as_i64().unwrap())
                    .collect();

                server
                    .post(&format!("/api/v1/plans/{}/tasks/status", plan_id))
                    .json(&json!({ "task_ids": task_ids, "status": "completed" }))
                    .await
                    .assert_status_ok();

                let open = server.get("/api/v1/plans").await.json::<Value>();
                assert_eq!(open["total_count"], 1);
                assert_eq!(open["plans"][0]["title"], "Still open");

                let all = server
                    .get("/api/v1/plans")
                    .add_query_param("include_completed", true)
                    .await
                    .json::<Value>();
                assert_eq!(all["total_count"], 2);
                assert_eq!(all["plans"][1]["progress_percent"], 100.0);
            });
        }
    }

    describe "single plan routes" {
        it "returns 404 for a missing plan" {
            tokio_test::block_on(async {
                server.get("/api/v1/plans/42").await.assert_status(StatusCode::NOT_FOUND);
            });
        }

        it "appends requested tasks on PATCH" {
            tokio_test::block_on(async {
                let created = server.post("/api/v1/plans").json(&new_plan("Build REST API")).await.json::<Value>();
                let plan_id = created["plan"]["id"].as_i64().unwrap();
                let before = created["plan"]["tasks"].as_array().unwrap().len();

                let response = server
                    .patch(&format!("/api/v1/plans/{}", plan_id))
                    .json(&json!({ "description": "v2", "new_tasks": ["Write docs"] }))
                    .await;

                response.assert_status_ok();
                let plan = &response.json::<Value>()["plan"];
                assert_eq!(plan["description"], "v2");
                let tasks = plan["tasks"].as_array().unwrap();
                assert_eq!(tasks.len(), before + 1);
                assert_eq!(tasks[before]["title"], "Write docs");
                assert_eq!(tasks[before]["priority"], "medium");
            });
        }

        it "shows soft-deleted tasks only in the audit view" {
            tokio_test::block_on(async {
                let created = server.post("/api/v1/plans").json(&new_plan("Audit")).await.json::<Value>();
                let plan_id = created["plan"]["id"].as_i64().unwrap();
                let first = created["plan"]["tasks"][0]["id"].as_i64().unwrap();
                let total = created["plan"]["tasks"].as_array().unwrap().len();

                server
                    .post(&format!("/api/v1/plans/{}/tasks/status", plan_id))
                    .json(&json!({ "task_ids": [first], "status": "deleted", "notes": "not needed" }))
                    .await
                    .assert_status_ok();

                let live = server.get(&format!("/api/v1/plans/{}", plan_id)).await.json::<Value>();
                assert_eq!(live["tasks"].as_array().unwrap().len(), total - 1);

                let audit = server
                    .get(&format!("/api/v1/plans/{}", plan_id))
                    .add_query_param("include_deleted", true)
                    .await
                    .json::<Value>();
                assert_eq!(audit["tasks"].as_array().unwrap().len(), total);
                assert_eq!(audit["tasks"][0]["status"], "deleted");
            });
        }

        it "deletes a plan" {
            tokio_test::block_on(async {
                let created = server.post("/api/v1/plans").json(&new_plan("Temp")).await.json::<Value>();
                let path = format!("/api/v1/plans/{}", created["plan"]["id"]);

                server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
                server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
                server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
            });
        }
    }

    describe "task status updates" {
        it "rejects an unknown status" {
            tokio_test::block_on(async {
                let created = server.post("/api/v1/plans").json(&new_plan("Plan")).await.json::<Value>();
                let plan_id = created["plan"]["id"].as_i64().unwrap();

                server
                    .post(&format!("/api/v1/plans/{}/tasks/status", plan_id))
                    .json(&json!({ "task_ids": [1], "status": "done" }))
                    .await
                    .assert_status(StatusCode::BAD_REQUEST);
            });
        }

        it "fails atomically when a task belongs to another plan" {
            tokio_test::block_on(async {
                let a = server.post("/api/v1/plans").json(&new_plan("A")).await.json::<Value>();
                let b = server.post("/api/v1/plans").json(&new_plan("B")).await.json::<Value>();
                let a_id = a["plan"]["id"].as_i64().unwrap();
                let a_task = a["plan"]["tasks"][0]["id"].as_i64().unwrap();
                let b_task = b["plan"]["tasks"][0]["id"].as_i64().unwrap();

                server
                    .post(&format!("/api/v1/plans/{}/tasks/status", a_id))
                    .json(&json!({ "task_ids": [a_task, b_task], "status": "completed" }))
                    .await
                    .assert_status(StatusCode::NOT_FOUND);

                let plan = server.get(&format!("/api/v1/plans/{}", a_id)).await.json::<Value>();
                assert_eq!(plan["tasks"][0]["status"], "pending");
            });
        }
    }
}
