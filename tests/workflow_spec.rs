use speculate2::speculate;

speculate! {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use planner::config::WorkflowConfig;
    use planner::models::*;
    use planner::planning::*;
    use planner::{Database, PlanStore, PlannerError};

    struct ScriptedGenerator {
        judgment: Option<Sufficiency>,
        drafts: Mutex<VecDeque<Result<Vec<GeneratedTask>, GenerationError>>>,
        contexts: Mutex<Vec<GenerationContext>>,
    }

    impl ScriptedGenerator {
        fn new(
            judgment: Option<Sufficiency>,
            drafts: Vec<Result<Vec<GeneratedTask>, GenerationError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                judgment,
                drafts: Mutex::new(drafts.into()),
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn contexts(&self) -> Vec<GenerationContext> {
            self.contexts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskGenerator for ScriptedGenerator {
        async fn judge_sufficiency(
            &self,
            _context: &GenerationContext,
            _strategy: &CategoryStrategy,
        ) -> Result<Sufficiency, GenerationError> {
            self.judgment
                .clone()
                .ok_or_else(|| GenerationError::Unavailable("no judgment scripted".into()))
        }

        async fn generate_tasks(
            &self,
            context: &GenerationContext,
            _strategy: &CategoryStrategy,
        ) -> Result<Vec<GeneratedTask>, GenerationError> {
            self.contexts.lock().unwrap().push(context.clone());
            self.drafts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Unavailable("script exhausted".into())))
        }
    }

    /// Replays canned replies and records each prompt with the number of
    /// plans stored at the moment it was asked.
    struct ScriptedChannel {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<(String, u64)>>,
        db: Database,
    }

    impl ScriptedChannel {
        fn new(db: &Database, replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                db: db.clone(),
            }
        }

        fn prompts(&self) -> Vec<(String, u64)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserChannel for ScriptedChannel {
        async fn ask_user(&self, prompt: UserPrompt<'_>) -> Result<String, ChannelClosed> {
            let stored = self.db.list_plans(&all_plans()).unwrap().total_count;
            self.prompts.lock().unwrap().push((prompt.render(), stored));
            self.replies.lock().unwrap().pop_front().ok_or(ChannelClosed)
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        percents: Mutex<Vec<u8>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn report_progress(&self, percent: u8, _message: &str) {
            self.percents.lock().unwrap().push(percent);
        }

        fn log(&self, _level: LogLevel, _message: &str) {}
    }

    /// Creates plans normally but cannot write tasks.
    struct TaskWriteFails(Database);

    impl PlanStore for TaskWriteFails {
        fn create_plan(&self, input: &CreatePlanInput) -> planner::Result<Plan> {
            self.0.create_plan(input)
        }
        fn add_tasks(&self, _plan_id: i64, _tasks: &[CreateTaskInput]) -> planner::Result<Vec<Task>> {
            Err(PlannerError::Io(std::io::Error::other("disk full")))
        }
        fn get_plan(&self, plan_id: i64) -> planner::Result<Plan> {
            self.0.get_plan(plan_id)
        }
        fn get_plan_with_deleted(&self, plan_id: i64) -> planner::Result<Plan> {
            self.0.get_plan_with_deleted(plan_id)
        }
        fn list_plans(&self, query: &PlanListQuery) -> planner::Result<PlanPage> {
            self.0.list_plans(query)
        }
        fn update_task_status(
            &self,
            plan_id: i64,
            task_ids: &[i64],
            status: TaskStatus,
            notes: Option<&str>,
        ) -> planner::Result<Vec<Task>> {
            self.0.update_task_status(plan_id, task_ids, status, notes)
        }
        fn update_plan(&self, plan_id: i64, input: &UpdatePlanInput) -> planner::Result<Plan> {
            self.0.update_plan(plan_id, input)
        }
        fn delete_plan(&self, plan_id: i64) -> planner::Result<()> {
            self.0.delete_plan(plan_id)
        }
    }

    fn all_plans() -> PlanListQuery {
        PlanListQuery { include_completed: true, ..Default::default() }
    }

    fn generated(titles: &[&str]) -> Vec<GeneratedTask> {
        titles
            .iter()
            .map(|t| GeneratedTask {
                title: t.to_string(),
                description: None,
                priority: Priority::High,
            })
            .collect()
    }

    fn request(category: &str) -> PlanRequest {
        PlanRequest {
            title: "Build REST API".into(),
            goal: "expose CRUD endpoints".into(),
            category: category.into(),
            description: None,
            additional_context: None,
        }
    }

    fn orchestrator(
        store: Arc<dyn PlanStore>,
        generator: Arc<ScriptedGenerator>,
        progress: Arc<RecordingProgress>,
        config: WorkflowConfig,
    ) -> Orchestrator {
        Orchestrator::new(store, generator, progress, config)
    }

    fn titles(plan: &Plan) -> Vec<&str> {
        plan.tasks.iter().map(|t| t.title.as_str()).collect()
    }

    before {
        let db = Database::open_in_memory().expect("open in-memory database");
        db.migrate().expect("apply schema");
        let progress = Arc::new(RecordingProgress::default());
    }

    describe "new_plan" {
        it "goes straight to generation when the request is sufficient" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency::sufficient()),
                vec![Ok(generated(&["Design schema", "Write handlers", "Add tests"]))],
            );
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["yes"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            let PlanOutcome::Committed { plan, notices } = outcome else { panic!("expected a committed plan") };
            assert_eq!(titles(&plan), vec!["Design schema", "Write handlers", "Add tests"]);
            assert_eq!(plan.status, PlanStatus::Active);
            assert!(plan.tasks.iter().all(|t| t.status == TaskStatus::Pending));
            assert!(notices.is_empty());

            let prompts = channel.prompts();
            assert_eq!(prompts.len(), 1);
            assert!(prompts[0].0.starts_with("Plan preview"));
            assert_eq!(*progress.percents.lock().unwrap(), vec![10, 30, 60, 80, 95, 100]);

            let stored = db.get_plan(plan.id).unwrap();
            assert_eq!(stored.tasks.len(), 3);
        }

        it "asks at most five clarifying questions once and passes the answers on" {
            let questions = (1..=7).map(|i| format!("Question {}", i)).collect();
            let generator = ScriptedGenerator::new(
                Some(Sufficiency { sufficient: false, questions }),
                vec![Ok(generated(&["One", "Two"]))],
            );
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["Postgres and axum", ""]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            assert!(outcome.plan().is_some());
            let prompts = channel.prompts();
            assert_eq!(prompts.len(), 2);
            assert!(prompts[0].0.contains("5. Question 5"));
            assert!(!prompts[0].0.contains("Question 6"));
            assert_eq!(
                generator.contexts()[0].clarifications.as_deref(),
                Some("Postgres and axum")
            );
        }

        it "treats a failed sufficiency check as sufficient" {
            let generator = ScriptedGenerator::new(None, vec![Ok(generated(&["Only task"]))]);
            let planner = orchestrator(Arc::new(db.clone()), generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["ok"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("personal"), &channel)).unwrap();

            assert_eq!(titles(outcome.plan().unwrap()), vec!["Only task"]);
            assert_eq!(channel.prompts().len(), 1);
        }

        it "retries with a strict instruction, then falls back to the template" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency::sufficient()),
                vec![
                    Err(GenerationError::Malformed("prose".into())),
                    Err(GenerationError::Malformed("prose again".into())),
                ],
            );
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["yes"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            let PlanOutcome::Committed { plan, notices } = outcome else { panic!("expected a committed plan") };
            assert_eq!(plan.tasks.len(), plan_tasks(PlanCategory::Project, "x").len());
            assert_eq!(notices, vec![TEMPLATE_NOTICE.to_string()]);
            let contexts = generator.contexts();
            assert_eq!(contexts.len(), 2);
            assert!(!contexts[0].strict_output);
            assert!(contexts[1].strict_output);
            assert!(channel.prompts()[0].0.contains("plan generated from template"));
        }

        it "falls back when the model returns an empty list" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency::sufficient()),
                vec![Ok(Vec::new()), Ok(Vec::new())],
            );
            let planner = orchestrator(Arc::new(db.clone()), generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["yes"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("learning"), &channel)).unwrap();

            let plan = outcome.plan().unwrap();
            assert_eq!(titles(plan)[0], "Assess current knowledge and gaps");
        }

        it "stores nothing while feedback regenerates the draft" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency::sufficient()),
                vec![
                    Ok(generated(&["Design", "Build"])),
                    Ok(generated(&["Design", "Build", "Test"])),
                ],
            );
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["add a testing task", "yes"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            assert_eq!(titles(outcome.plan().unwrap()), vec!["Design", "Build", "Test"]);
            let prompts = channel.prompts();
            assert_eq!(prompts.len(), 2);
            assert!(prompts.iter().all(|(_, stored)| *stored == 0));

            let second = &generator.contexts()[1];
            assert_eq!(second.feedback, vec!["add a testing task".to_string()]);
            let previous: Vec<&str> = second.previous_draft.iter().map(|t| t.title.as_str()).collect();
            assert_eq!(previous, vec!["Design", "Build"]);
            assert_eq!(db.list_plans(&all_plans()).unwrap().total_count, 1);
        }

        it "discards the session when the preview is cancelled" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency::sufficient()),
                vec![Ok(generated(&["Design"]))],
            );
            let planner = orchestrator(Arc::new(db.clone()), generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["cancel"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            assert!(matches!(outcome, PlanOutcome::Cancelled { .. }));
            assert_eq!(db.list_plans(&all_plans()).unwrap().total_count, 0);
            assert!(!progress.percents.lock().unwrap().contains(&95));
        }

        it "cancels when the user goes away during elicitation" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency { sufficient: false, questions: vec!["Which stack?".into()] }),
                vec![Ok(generated(&["Design"]))],
            );
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &[]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            assert!(matches!(outcome, PlanOutcome::Cancelled { .. }));
            assert!(generator.contexts().is_empty());
            assert_eq!(db.list_plans(&all_plans()).unwrap().total_count, 0);
        }

        it "offers the last draft with a notice once the regeneration limit is hit" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency::sufficient()),
                vec![Ok(generated(&["First"])), Ok(generated(&["Second"]))],
            );
            let config = WorkflowConfig { max_regenerations: 1, ..WorkflowConfig::default() };
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), config);
            let channel = ScriptedChannel::new(&db, &["different please", "still different"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            let PlanOutcome::Committed { plan, notices } = outcome else { panic!("expected a committed plan") };
            assert_eq!(titles(&plan), vec!["Second"]);
            assert_eq!(generator.contexts().len(), 2);
            let prompts = channel.prompts();
            assert!(!prompts[0].0.contains("Regeneration limit"));
            assert!(prompts[1].0.contains("Regeneration limit (1) reached"));
            assert!(notices.iter().any(|n| n.contains("regeneration limit")));
        }

        it "does not regenerate a template when generation is unavailable" {
            let generator = ScriptedGenerator::new(None, Vec::new());
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["add a testing task"]);

            let outcome = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap();

            let PlanOutcome::Committed { plan, notices } = outcome else { panic!("expected a committed plan") };
            assert!(!plan.tasks.is_empty());
            assert_eq!(generator.contexts().len(), 1);
            let prompts = channel.prompts();
            assert_eq!(prompts.len(), 1);
            assert!(prompts[0].0.contains("feedback cannot be applied"));
            assert!(notices.iter().any(|n| n.contains("feedback could not be applied")));
            assert!(notices.contains(&TEMPLATE_NOTICE.to_string()));
        }

        it "removes the plan again when its tasks cannot be saved" {
            let generator = ScriptedGenerator::new(
                Some(Sufficiency::sufficient()),
                vec![Ok(generated(&["Design"]))],
            );
            let store = Arc::new(TaskWriteFails(db.clone()));
            let planner = orchestrator(store, generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["yes"]);

            let err = tokio_test::block_on(planner.new_plan(request("project"), &channel)).unwrap_err();

            assert!(matches!(err, PlannerError::Io(_)));
            assert_eq!(db.list_plans(&all_plans()).unwrap().total_count, 0);
        }

        it "rejects an unknown category before generating anything" {
            let generator = ScriptedGenerator::new(Some(Sufficiency::sufficient()), Vec::new());
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &[]);

            let err = tokio_test::block_on(planner.new_plan(request("hobby"), &channel)).unwrap_err();

            assert!(err.is_validation());
            assert!(generator.contexts().is_empty());
            assert!(progress.percents.lock().unwrap().is_empty());
        }

        it "rejects an over-long goal" {
            let generator = ScriptedGenerator::new(Some(Sufficiency::sufficient()), Vec::new());
            let planner = orchestrator(Arc::new(db.clone()), generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &[]);
            let mut req = request("project");
            req.goal = "g".repeat(501);

            let err = tokio_test::block_on(planner.new_plan(req, &channel)).unwrap_err();

            assert!(err.is_validation());
        }
    }

    describe "update_plan" {
        it "previews requested titles and appends them after the existing tasks" {
            let plan = db.create_plan(&CreatePlanInput {
                title: "Build REST API".into(),
                goal: "expose CRUD endpoints".into(),
                category: PlanCategory::Project,
                description: None,
            }).unwrap();
            db.add_tasks(plan.id, &[CreateTaskInput::titled("Design schema")]).unwrap();

            let generator = ScriptedGenerator::new(None, Vec::new());
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["yes"]);
            let update = PlanUpdateRequest {
                title: Some("Build the REST API".into()),
                new_tasks: vec!["Write docs".into()],
                ..Default::default()
            };

            let outcome = tokio_test::block_on(planner.update_plan(plan.id, update, &channel)).unwrap();

            let updated = outcome.plan().unwrap();
            assert_eq!(updated.title, "Build the REST API");
            assert_eq!(titles(updated), vec!["Design schema", "Write docs"]);
            assert_eq!(updated.tasks[1].sequence_index, 1);
            assert_eq!(updated.tasks[1].priority, Priority::Medium);
            assert!(generator.contexts().is_empty());
            assert!(channel.prompts()[0].0.contains("Write docs"));
        }

        it "asks the generator for additions given only a description of them" {
            let plan = db.create_plan(&CreatePlanInput {
                title: "Learn Rust".into(),
                goal: "write a CLI".into(),
                category: PlanCategory::Learning,
                description: None,
            }).unwrap();
            db.add_tasks(plan.id, &[CreateTaskInput::titled("Read the book")]).unwrap();

            let generator = ScriptedGenerator::new(None, vec![Ok(generated(&["Build a CLI"]))]);
            let planner = orchestrator(Arc::new(db.clone()), generator.clone(), progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["yes"]);
            let update = PlanUpdateRequest {
                additional_context: Some("add a hands-on project".into()),
                ..Default::default()
            };

            let outcome = tokio_test::block_on(planner.update_plan(plan.id, update, &channel)).unwrap();

            assert_eq!(titles(outcome.plan().unwrap()), vec!["Read the book", "Build a CLI"]);
            let context = &generator.contexts()[0];
            assert!(context.extending);
            assert_eq!(context.existing_tasks, vec!["Read the book".to_string()]);
        }

        it "changes the title without a preview when no tasks are added" {
            let plan = db.create_plan(&CreatePlanInput {
                title: "Old".into(),
                goal: "g".into(),
                category: PlanCategory::Personal,
                description: None,
            }).unwrap();
            let generator = ScriptedGenerator::new(None, Vec::new());
            let planner = orchestrator(Arc::new(db.clone()), generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &[]);
            let update = PlanUpdateRequest { title: Some("New".into()), ..Default::default() };

            let outcome = tokio_test::block_on(planner.update_plan(plan.id, update, &channel)).unwrap();

            assert_eq!(outcome.plan().unwrap().title, "New");
            assert!(channel.prompts().is_empty());
        }

        it "leaves the plan untouched when the additions are cancelled" {
            let plan = db.create_plan(&CreatePlanInput {
                title: "Keep".into(),
                goal: "g".into(),
                category: PlanCategory::Personal,
                description: None,
            }).unwrap();
            let generator = ScriptedGenerator::new(None, Vec::new());
            let planner = orchestrator(Arc::new(db.clone()), generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &["cancel"]);
            let update = PlanUpdateRequest {
                title: Some("Changed".into()),
                new_tasks: vec!["Extra".into()],
                ..Default::default()
            };

            let outcome = tokio_test::block_on(planner.update_plan(plan.id, update, &channel)).unwrap();

            assert!(matches!(outcome, PlanOutcome::Cancelled { .. }));
            let stored = db.get_plan(plan.id).unwrap();
            assert_eq!(stored.title, "Keep");
            assert!(stored.tasks.is_empty());
        }

        it "reports a missing plan" {
            let generator = ScriptedGenerator::new(None, Vec::new());
            let planner = orchestrator(Arc::new(db.clone()), generator, progress.clone(), WorkflowConfig::default());
            let channel = ScriptedChannel::new(&db, &[]);

            let err = tokio_test::block_on(
                planner.update_plan(99, PlanUpdateRequest::default(), &channel),
            ).unwrap_err();

            assert!(err.is_not_found());
        }
    }
}
