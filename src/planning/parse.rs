//! Tolerant decoding of model replies.
//!
//! Models often wrap JSON in prose or code fences, so decoding looks for the
//! outermost array or object span before giving up.

use planner_core::models::{CreateTaskInput, Priority, TASK_DESCRIPTION_MAX, TASK_TITLE_MAX};
use serde_json::Value;

use super::collaborators::{GeneratedTask, GenerationError, Sufficiency};
use super::fallback::truncate;
use super::strategy::CategoryStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn delimiters(self) -> (char, char) {
        match self {
            Self::Array => ('[', ']'),
            Self::Object => ('{', '}'),
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Find a JSON value of the given shape in free text.
pub fn extract_json(text: &str, shape: JsonShape) -> Option<Value> {
    let text = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if shape.matches(&value) {
            return Some(value);
        }
    }

    let (open, close) = shape.delimiters();
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(|value| shape.matches(value))
}

/// Decode `{"has_sufficient_info": bool, "specific_questions": [..]}`.
pub fn parse_judgment(text: &str) -> Result<Sufficiency, GenerationError> {
    let value = extract_json(text, JsonShape::Object)
        .ok_or_else(|| GenerationError::Malformed("no JSON object in analysis".into()))?;

    let sufficient = value
        .get("has_sufficient_info")
        .or_else(|| value.get("sufficient"))
        .and_then(Value::as_bool)
        .ok_or_else(|| GenerationError::Malformed("missing sufficiency flag".into()))?;

    let questions = value
        .get("specific_questions")
        .or_else(|| value.get("questions"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Sufficiency {
        sufficient,
        questions,
    })
}

/// Decode a task list. Entries without a usable title are skipped.
pub fn parse_tasks(text: &str) -> Result<Vec<GeneratedTask>, GenerationError> {
    let value = extract_json(text, JsonShape::Array)
        .ok_or_else(|| GenerationError::Malformed("no JSON array in task list".into()))?;
    let Value::Array(items) = value else {
        return Err(GenerationError::Malformed("task list is not an array".into()));
    };

    Ok(items.iter().filter_map(task_from_value).collect())
}

fn task_from_value(value: &Value) -> Option<GeneratedTask> {
    if let Some(title) = value.as_str() {
        return non_blank(title).map(|title| GeneratedTask {
            title,
            description: None,
            priority: Priority::Medium,
        });
    }

    let title = value.get("title").and_then(Value::as_str).and_then(non_blank)?;
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .and_then(non_blank);
    let priority = value
        .get("priority")
        .and_then(Value::as_str)
        .map(Priority::from_str_lossy)
        .unwrap_or_default();

    Some(GeneratedTask {
        title,
        description,
        priority,
    })
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Check a generated list against the strategy and clamp it to storable specs.
pub fn validate_draft(
    tasks: Vec<GeneratedTask>,
    strategy: &CategoryStrategy,
) -> Result<Vec<CreateTaskInput>, GenerationError> {
    if tasks.is_empty() {
        return Err(GenerationError::Malformed("empty task list".into()));
    }
    if !strategy.accepts_count(tasks.len()) {
        return Err(GenerationError::Malformed(format!(
            "{} tasks is far outside the expected {}..={}",
            tasks.len(),
            strategy.expected_tasks.start(),
            strategy.expected_tasks.end()
        )));
    }

    Ok(tasks
        .into_iter()
        .map(|task| CreateTaskInput {
            title: truncate(&task.title, TASK_TITLE_MAX),
            description: task.description.map(|d| truncate(&d, TASK_DESCRIPTION_MAX)),
            priority: task.priority,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::strategy::strategy_for;
    use planner_core::models::PlanCategory;

    #[test]
    fn extracts_from_fenced_reply() {
        let reply = "Here you go:\n```json\n[{\"title\": \"A\"}]\n```\nGood luck!";
        let value = extract_json(reply, JsonShape::Array).unwrap();
        assert_eq!(value[0]["title"], "A");
    }

    #[test]
    fn shape_mismatch_is_none() {
        assert!(extract_json("{\"a\": 1}", JsonShape::Array).is_none());
        assert!(extract_json("no json here", JsonShape::Object).is_none());
    }

    #[test]
    fn judgment_with_questions() {
        let reply = r#"{"has_sufficient_info": false, "specific_questions": ["Which stack?", " "]}"#;
        let judgment = parse_judgment(reply).unwrap();
        assert!(!judgment.sufficient);
        assert_eq!(judgment.questions, vec!["Which stack?".to_string()]);
    }

    #[test]
    fn judgment_without_flag_is_malformed() {
        assert!(matches!(
            parse_judgment(r#"{"questions": []}"#),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn tasks_are_lenient() {
        let reply = r#"[
            {"title": "Design", "description": "schema", "priority": "HIGH"},
            {"title": "Build", "priority": "urgent"},
            {"description": "no title"},
            "Ship"
        ]"#;
        let tasks = parse_tasks(reply).unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[1].priority, Priority::Medium);
        assert_eq!(tasks[2].title, "Ship");
    }

    #[test]
    fn draft_rejects_empty_and_oversized() {
        let strategy = strategy_for(PlanCategory::Personal);
        assert!(validate_draft(Vec::new(), &strategy).is_err());

        let many = (0..50)
            .map(|i| GeneratedTask {
                title: format!("Task {}", i),
                description: None,
                priority: Priority::Low,
            })
            .collect();
        assert!(validate_draft(many, &strategy).is_err());
    }

    #[test]
    fn draft_clamps_long_titles() {
        let strategy = strategy_for(PlanCategory::Project);
        let tasks = vec![GeneratedTask {
            title: "x".repeat(300),
            description: Some("y".repeat(1500)),
            priority: Priority::High,
        }];
        let draft = validate_draft(tasks, &strategy).unwrap();
        assert_eq!(draft[0].title.chars().count(), 200);
        assert!(draft[0].validate().is_ok());
    }
}
