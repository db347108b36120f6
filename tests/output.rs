use serde_json::Value;
use todo::error::Error;
use todo::output::{error_json, format_human, infer_command_name, success_json, HumanOutput};

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("Task added");
    human.push_summary("Title", "Buy milk");
    human.push_detail("[ ][medium] 1a2b3c4d Buy milk");
    human.push_warning("no data directory available; changes will not be saved");
    human.push_next_step("todo list");

    let rendered = format_human(&human);
    assert!(rendered.contains("Task added"));
    assert!(rendered.contains("  Title: Buy milk"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- [ ][medium] 1a2b3c4d Buy milk"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- todo list"));
}

#[test]
fn summary_values_line_up() {
    let mut human = HumanOutput::new("Task stats");
    human.push_summary("Total", "3");
    human.push_summary("Completion rate", "33%");
    let rendered = format_human(&human);
    assert!(rendered.contains("  Total:           3"));
    assert!(rendered.contains("  Completion rate: 33%"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("Tasks cleared");
    assert_eq!(format_human(&human), "Tasks cleared");
}

#[test]
fn success_envelope_carries_warnings() {
    let mut human = HumanOutput::new("Tasks");
    human.push_warning("careful");
    let rendered = success_json("list", &serde_json::json!({"total": 0}), Some(&human)).unwrap();
    let value: Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["schema_version"], "todo.v1");
    assert_eq!(value["command"], "list");
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["total"], 0);
    assert_eq!(value["warnings"][0], "careful");
    assert!(value.get("next_steps").is_none());
}

#[test]
fn error_envelope_has_kind_and_hint() {
    let err = Error::Validation("title cannot be empty".to_string());
    let value: Value = serde_json::from_str(&error_json("add", &err).unwrap()).unwrap();
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["code"], 2);
    assert_eq!(value["error"]["kind"], "validation");
    assert!(value["next_steps"][0].as_str().unwrap().starts_with("todo add"));
}

#[test]
fn command_name_skips_flags_and_dir_value() {
    assert_eq!(infer_command_name(args(&[])), "todo");
    assert_eq!(infer_command_name(args(&["--json", "list"])), "list");
    assert_eq!(infer_command_name(args(&["--dir", "/tmp/data", "add", "x"])), "add");
    assert_eq!(infer_command_name(args(&["admin", "on"])), "admin on");
    assert_eq!(infer_command_name(args(&["-q", "admin"])), "admin");
}
