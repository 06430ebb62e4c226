//! taskdeck task command implementations.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::filter::{Filter, TaskStats};
use crate::output::{emit_success, pluralize_tasks, progress_bar, HumanOutput, OutputOptions};
use crate::storage::{resolve_data_dir, FileStore};
use crate::task::{LoadOutcome, Task, TaskStore};

const PROGRESS_WIDTH: usize = 20;

/// Global flags shared by every task command
pub struct CommandContext {
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

struct TaskContext {
    store: TaskStore<FileStore>,
    config: Config,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct AddOutput {
    created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
}

#[derive(Serialize)]
struct ToggleOutput {
    id: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
}

#[derive(Serialize)]
struct DeleteOutput {
    id: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<Task>,
}

#[derive(Serialize)]
struct ClearOutput {
    removed: usize,
    remaining: usize,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    filter: Filter,
    total: usize,
    active_count: usize,
    completed_count: usize,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct StatsOutput {
    #[serde(flatten)]
    stats: TaskStats,
    completion_ratio: Option<f64>,
    percent_complete: Option<u8>,
}

pub fn run_add(ctx: CommandContext, text: String) -> Result<()> {
    let mut task_ctx = load_context(&ctx)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(ctx.events.as_deref())?;

    let created = task_ctx.store.add_task(&text)?;

    let mut human = match created.as_ref() {
        Some(task) => {
            let mut human = HumanOutput::new("Task added");
            human.push_summary("ID", task.id.clone());
            human.push_summary("Text", task.text.clone());
            if let Some(warning) = emit_event(&mut event_sink, EventKind::TaskAdded, task) {
                human.push_warning(warning);
            }
            human
        }
        None => HumanOutput::new("Nothing to add: task text is empty"),
    };
    push_warnings(&mut human, &task_ctx.warnings);

    let output = AddOutput {
        created: created.is_some(),
        task: created,
    };
    emit_success(
        output_options(&ctx, events_to_stdout),
        "add",
        &output,
        Some(&human),
    )
}

pub fn run_toggle(ctx: CommandContext, input: String) -> Result<()> {
    let mut task_ctx = load_context(&ctx)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(ctx.events.as_deref())?;

    require_id(&input)?;
    let resolved = task_ctx.store.resolve_id(&input).into_id(&input)?;
    let completed = match resolved.as_deref() {
        Some(id) => task_ctx.store.toggle_task(id)?,
        None => None,
    };
    let id = resolved.unwrap_or(input);

    let mut human = match completed {
        Some(completed) => {
            let header = if completed { "Task completed" } else { "Task reopened" };
            let mut human = HumanOutput::new(header);
            human.push_summary("ID", id.clone());
            if let Some(task) = task_ctx.store.get(&id) {
                human.push_summary("Text", task.text.clone());
                if let Some(warning) = emit_event(&mut event_sink, EventKind::TaskToggled, task) {
                    human.push_warning(warning);
                }
            }
            human
        }
        None => no_match(&id),
    };
    push_warnings(&mut human, &task_ctx.warnings);

    let output = ToggleOutput {
        id,
        found: completed.is_some(),
        completed,
    };
    emit_success(
        output_options(&ctx, events_to_stdout),
        "toggle",
        &output,
        Some(&human),
    )
}

pub fn run_delete(ctx: CommandContext, input: String) -> Result<()> {
    let mut task_ctx = load_context(&ctx)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(ctx.events.as_deref())?;

    require_id(&input)?;
    let resolved = task_ctx.store.resolve_id(&input).into_id(&input)?;
    let removed = match resolved.as_deref() {
        Some(id) => task_ctx.store.delete_task(id)?,
        None => None,
    };
    let id = resolved.unwrap_or(input);

    let mut human = match removed.as_ref() {
        Some(task) => {
            let mut human = HumanOutput::new("Task deleted");
            human.push_summary("ID", task.id.clone());
            human.push_summary("Text", task.text.clone());
            if let Some(warning) = emit_event(&mut event_sink, EventKind::TaskDeleted, task) {
                human.push_warning(warning);
            }
            human
        }
        None => no_match(&id),
    };
    push_warnings(&mut human, &task_ctx.warnings);

    let output = DeleteOutput {
        id,
        found: removed.is_some(),
        task: removed,
    };
    emit_success(
        output_options(&ctx, events_to_stdout),
        "rm",
        &output,
        Some(&human),
    )
}

pub fn run_clear_completed(ctx: CommandContext) -> Result<()> {
    let mut task_ctx = load_context(&ctx)?;
    let (mut event_sink, events_to_stdout) = open_event_sink(ctx.events.as_deref())?;

    let removed = task_ctx.store.clear_completed()?;
    let output = ClearOutput {
        removed,
        remaining: task_ctx.store.len(),
    };

    let header = if removed == 0 {
        "No completed tasks to clear".to_string()
    } else {
        format!("Cleared {} completed", pluralize_tasks(removed))
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Remaining", output.remaining.to_string());
    if removed > 0 {
        if let Some(warning) = emit_event(&mut event_sink, EventKind::CompletedCleared, &output) {
            human.push_warning(warning);
        }
    }
    push_warnings(&mut human, &task_ctx.warnings);

    emit_success(
        output_options(&ctx, events_to_stdout),
        "clear-completed",
        &output,
        Some(&human),
    )
}

pub fn run_list(ctx: CommandContext, filter: Option<String>) -> Result<()> {
    let task_ctx = load_context(&ctx)?;
    let filter = filter
        .as_deref()
        .map(Filter::parse)
        .unwrap_or_else(|| task_ctx.config.view.default_filter());
    let view = task_ctx.store.view(filter);
    let stats = view.stats();

    let mut human = HumanOutput::new(format!("Tasks ({filter})"));
    for selector in Filter::ALL {
        human.push_summary(capitalize(selector.as_str()), stats.count_for(selector).to_string());
    }
    if view.is_empty() {
        human.push_detail(filter.empty_message());
    }
    for task in &view.filtered_tasks {
        human.push_detail(task_line(task));
    }
    if stats.completed_count > 0 {
        human.push_next_step("taskdeck clear-completed");
    }
    push_warnings(&mut human, &task_ctx.warnings);

    let output = ListOutput {
        filter,
        total: view.total,
        active_count: view.active_count,
        completed_count: view.completed_count,
        tasks: view.filtered_tasks.clone(),
    };
    emit_success(
        OutputOptions {
            json: ctx.json,
            quiet: ctx.quiet,
        },
        "list",
        &output,
        Some(&human),
    )
}

pub fn run_stats(ctx: CommandContext) -> Result<()> {
    let task_ctx = load_context(&ctx)?;
    let stats = TaskStats::from_tasks(task_ctx.store.tasks());

    let mut human = HumanOutput::new("Task stats");
    if stats.total == 0 {
        human.push_detail(Filter::All.empty_message());
    } else {
        human.push_summary("Remaining", pluralize_tasks(stats.active_count));
        human.push_summary("Completed", stats.completed_count.to_string());
        human.push_summary("Total", stats.total.to_string());
        if task_ctx.config.view.show_progress {
            if let Some(percent) = stats.percent_complete() {
                human.push_summary("Progress", progress_bar(percent, PROGRESS_WIDTH));
            }
        }
    }
    if stats.completed_count > 0 {
        human.push_next_step("taskdeck clear-completed");
    }
    push_warnings(&mut human, &task_ctx.warnings);

    let output = StatsOutput {
        stats,
        completion_ratio: stats.completion_ratio(),
        percent_complete: stats.percent_complete(),
    };
    emit_success(
        OutputOptions {
            json: ctx.json,
            quiet: ctx.quiet,
        },
        "stats",
        &output,
        Some(&human),
    )
}

fn load_context(ctx: &CommandContext) -> Result<TaskContext> {
    let dir = resolve_data_dir(ctx.dir.as_deref())?;
    let config = Config::load_from_dir(&dir)?;
    let backend = FileStore::new(&dir).with_lock_timeout(config.storage.lock_timeout_ms);
    let store = TaskStore::open_with_key(backend, config.storage.key.clone())?;

    let mut warnings = Vec::new();
    if let LoadOutcome::Recovered { reason } = store.load_outcome() {
        warnings.push(format!(
            "stored tasks were unreadable ({reason}); starting from an empty list"
        ));
    }

    Ok(TaskContext {
        store,
        config,
        warnings,
    })
}

fn output_options(ctx: &CommandContext, events_to_stdout: bool) -> OutputOptions {
    OutputOptions {
        json: ctx.json && !events_to_stdout,
        quiet: ctx.quiet || events_to_stdout,
    }
}

fn open_event_sink(events: Option<&str>) -> Result<(Option<EventSink>, bool)> {
    let destination = EventDestination::parse(events);
    let sink = destination.as_ref().map(|dest| dest.open()).transpose()?;
    let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));
    Ok((sink, events_to_stdout))
}

fn emit_event<T: Serialize>(
    sink: &mut Option<EventSink>,
    kind: EventKind,
    data: &T,
) -> Option<String> {
    let sink = sink.as_mut()?;

    let event = match Event::new(kind).with_data(data) {
        Ok(event) => event,
        Err(err) => return Some(format!("event output failed: {err}")),
    };
    if let Err(err) = sink.emit(&event) {
        return Some(format!("event output failed: {err}"));
    }
    None
}

fn require_id(input: &str) -> Result<()> {
    if input.trim().is_empty() {
        return Err(Error::InvalidArgument("task id must not be empty".to_string()));
    }
    Ok(())
}

fn no_match(id: &str) -> HumanOutput {
    let mut human = HumanOutput::new("No matching task");
    human.push_summary("ID", id.to_string());
    human.push_next_step("taskdeck list");
    human
}

fn push_warnings(human: &mut HumanOutput, warnings: &[String]) {
    for warning in warnings {
        human.push_warning(warning.clone());
    }
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!(
        "[{mark}] {} {} ({})",
        task.id,
        task.text,
        task.created_at.format("%Y-%m-%d")
    )
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
