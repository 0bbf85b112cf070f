use std::fmt::Write as _;
use std::io;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::{ActionDispatcher, AppContext, Summary, Workspace};
use crate::backup::{RestoreOutcome, SimulatedBackupProvider};
use crate::config::{AppConfig, DateFormat};
use crate::error::EngineResult;
use crate::highlight::Highlighter;
use crate::model::temporal::format_timestamp;
use crate::model::{
    Backup, BackupStatus, BackupType, Clock, Confirmation, Diary, EntityKind, Plan, Record, RecordId,
    Reminder, Todo, TodoStatus, Website,
};
use crate::store::EntityStore;
use crate::view::{
    group_records, project, GroupKey, Projection, SortDirection, SortField, SortSpec, ViewQuery,
};

const TITLE_WIDTH: usize = 40;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Record kind: diary, todo, plan, reminder, website or backup
    pub kind: EntityKind,
    /// Search text with optional filters (category:, tag:, status:, priority:,
    /// favorite:, window:, date:)
    #[arg()]
    pub query: Vec<String>,
    /// Sort field (defaults to the configured sort)
    #[arg(long)]
    pub sort: Option<SortField>,
    /// Sort ascending
    #[arg(long, conflicts_with = "desc")]
    pub asc: bool,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// Group results by status or category
    #[arg(long)]
    pub group: Option<GroupKey>,
    /// Limit the number of records printed per list or group
    #[arg(long)]
    pub limit: Option<usize>,
    /// Print the projection as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoriesArgs {
    /// Record kind: diary, todo or website
    pub kind: EntityKind,
}

#[derive(Args, Debug, Clone)]
pub struct ToggleArgs {
    /// Record kind: todo (status), reminder (completion), website (favorite)
    /// or plan (milestone)
    pub kind: EntityKind,
    /// Record identifier
    pub id: RecordId,
    /// Milestone to toggle when the kind is plan
    #[arg(long)]
    pub milestone: Option<RecordId>,
}

#[derive(Args, Debug, Clone)]
pub struct VisitArgs {
    /// Website identifier
    pub id: RecordId,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Record kind
    pub kind: EntityKind,
    /// Record identifier
    pub id: RecordId,
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum BackupCommand {
    /// Run a backup of the loaded data
    Create(BackupCreateArgs),
    /// Restore from a completed backup
    Restore(BackupRestoreArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BackupCreateArgs {
    /// Mark the backup as manual (default)
    #[arg(long, conflicts_with = "auto")]
    pub manual: bool,
    /// Mark the backup as automatic
    #[arg(long)]
    pub auto: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BackupRestoreArgs {
    /// Backup identifier
    pub id: RecordId,
}

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommand,
}

/// Output switches that depend on the terminal rather than the command.
#[derive(Debug, Clone, Copy)]
pub struct OutputStyle {
    pub colored: bool,
    pub date_format: DateFormat,
}

impl OutputStyle {
    pub fn detect(config: &AppConfig) -> Self {
        Self {
            colored: atty::is(atty::Stream::Stdout),
            date_format: config.date_format,
        }
    }

    pub fn plain(date_format: DateFormat) -> Self {
        Self {
            colored: false,
            date_format,
        }
    }
}

pub fn run_list(
    workspace: &Workspace,
    ctx: &AppContext,
    config: &AppConfig,
    style: OutputStyle,
    args: &ListArgs,
) -> Result<String> {
    let raw_query = args.query.join(" ");
    let mut query = ViewQuery::parse(&raw_query)
        .with_context(|| format!("parsing query {raw_query:?}"))?
        .sorted(sort_spec(config.default_sort, args));
    query.group = args.group;
    let limit = args.limit.unwrap_or(config.search.max_results);

    let printer = ListPrinter {
        ctx,
        style,
        query: &query,
        limit,
        json: args.json,
    };
    match args.kind {
        EntityKind::Diary => printer.print(&workspace.diaries),
        EntityKind::Todo => printer.print(&workspace.todos),
        EntityKind::Plan => printer.print(&workspace.plans),
        EntityKind::Reminder => printer.print(&workspace.reminders),
        EntityKind::Website => printer.print(&workspace.websites),
        EntityKind::Backup => printer.print(workspace.backups().store()),
    }
}

fn sort_spec(default: SortSpec, args: &ListArgs) -> SortSpec {
    let mut spec = default;
    if let Some(field) = args.sort {
        spec.field = field;
    }
    if args.asc {
        spec.direction = SortDirection::Ascending;
    } else if args.desc {
        spec.direction = SortDirection::Descending;
    }
    spec
}

struct ListPrinter<'a> {
    ctx: &'a AppContext,
    style: OutputStyle,
    query: &'a ViewQuery,
    limit: usize,
    json: bool,
}

impl ListPrinter<'_> {
    fn print<R: Record + ListLine>(&self, store: &EntityStore<R>) -> Result<String> {
        let projection = limited_projection(store, self.query, self.ctx.clock(), self.limit)
            .with_context(|| format!("listing {} records", R::KIND))?;
        if self.json {
            let mut out = serde_json::to_string_pretty(&projection)
                .context("serializing projection")?;
            out.push('\n');
            return Ok(out);
        }

        let highlighter = Highlighter::new(&self.query.search, self.ctx.theme(), self.style.colored);
        let mut out = String::new();
        let chips = self.query.filters.chips();
        if !chips.is_empty() {
            let _ = writeln!(&mut out, "filters: {}", chips.join(" "));
        }
        match &projection {
            Projection::NotLoaded => out.push_str("Nothing loaded yet.\n"),
            Projection::Empty => out.push_str("No matches found.\n"),
            Projection::List(records) => {
                for record in records {
                    self.write_record(&mut out, record, &highlighter, "");
                }
            }
            Projection::Grouped(groups) => {
                for (label, records) in groups {
                    let _ = writeln!(&mut out, "== {label} ({}) ==", records.len());
                    for record in records {
                        self.write_record(&mut out, record, &highlighter, "  ");
                    }
                }
            }
        }
        Ok(out)
    }

    fn write_record<R: ListLine>(
        &self,
        out: &mut String,
        record: &R,
        highlighter: &Highlighter,
        indent: &str,
    ) {
        let title = highlighter.apply(&truncate_width(record.list_title(), TITLE_WIDTH));
        let _ = writeln!(out, "{indent}{} {title}{}", record.marker(), record.suffix());
        for detail in record.details(self.style.date_format) {
            let _ = writeln!(out, "{indent}    {}", highlighter.apply(&detail));
        }
    }
}

/// Keeps the first `limit` matches in sorted order and only then groups them,
/// so every bucket agrees with `all`.
fn limited_projection<R: Record>(
    store: &EntityStore<R>,
    query: &ViewQuery,
    clock: &dyn Clock,
    limit: usize,
) -> EngineResult<Projection<R>> {
    let flat = ViewQuery {
        group: None,
        ..query.clone()
    };
    let records: Vec<R> = match project(store, &flat, clock)? {
        Projection::NotLoaded => return Ok(Projection::NotLoaded),
        Projection::List(records) => records.into_iter().take(limit).collect(),
        Projection::Empty | Projection::Grouped(_) => Vec::new(),
    };
    let groups = match query.group {
        Some(key) => Some(group_records(&records, key)?),
        None => None,
    };
    if records.is_empty() {
        return Ok(Projection::Empty);
    }
    Ok(match groups {
        Some(groups) => Projection::Grouped(groups),
        None => Projection::List(records),
    })
}

pub fn run_summary(
    workspace: &Workspace,
    ctx: &AppContext,
    style: OutputStyle,
    args: &SummaryArgs,
) -> Result<String> {
    let summary = workspace
        .summary(ctx.clock())
        .context("computing dashboard summary")?;
    if args.json {
        let mut out = serde_json::to_string_pretty(&summary).context("serializing summary")?;
        out.push('\n');
        return Ok(out);
    }
    Ok(format_summary(&summary, ctx, style))
}

fn format_summary(summary: &Summary, ctx: &AppContext, style: OutputStyle) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "As of {}", format_timestamp(ctx.clock().now()));
    for (kind, count) in &summary.counts {
        let _ = writeln!(&mut out, "  {:<10}{count}", kind.as_ref());
    }
    let _ = writeln!(&mut out, "pending todos       {}", summary.pending_todos);
    let _ = writeln!(&mut out, "upcoming reminders  {}", summary.upcoming_reminders);
    let _ = writeln!(&mut out, "favorite websites   {}", summary.favorite_websites);
    if summary.next_todos.is_empty() {
        out.push_str("Nothing due.\n");
    } else {
        out.push_str("Next up:\n");
        for todo in &summary.next_todos {
            let _ = writeln!(
                &mut out,
                "  #{} {}  due {}  ({})",
                todo.id,
                truncate_width(&todo.title, TITLE_WIDTH),
                display_date(todo, style.date_format),
                todo.priority
            );
        }
    }
    out
}

pub fn run_categories(workspace: &Workspace, args: &CategoriesArgs) -> Result<String> {
    let categories = workspace
        .categories(args.kind)
        .with_context(|| format!("listing {} categories", args.kind))?;
    let width = categories
        .iter()
        .map(|category| category.name.width())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for category in categories {
        let pad = width - category.name.width();
        let _ = writeln!(
            &mut out,
            "{}{}  {}",
            category.name,
            " ".repeat(pad),
            category.count
        );
    }
    Ok(out)
}

pub fn run_toggle(workspace: &mut Workspace, ctx: &AppContext, args: &ToggleArgs) -> Result<String> {
    let mut actions = ActionDispatcher::new(workspace, ctx.clock());
    let line = match (args.kind, args.milestone) {
        (EntityKind::Todo, None) => {
            let todo = actions.toggle_todo(args.id)?;
            format!("todo #{} is now {}", todo.id, todo.status)
        }
        (EntityKind::Reminder, None) => {
            let reminder = actions.toggle_reminder(args.id)?;
            format!("reminder #{} is now {}", reminder.id, completion(reminder.is_completed))
        }
        (EntityKind::Website, None) => {
            let site = actions.toggle_favorite(args.id)?;
            let state = if site.is_favorite { "a favorite" } else { "not a favorite" };
            format!("website #{} is now {state}", site.id)
        }
        (EntityKind::Plan, Some(milestone)) => {
            let done = actions.toggle_milestone(args.id, milestone)?;
            format!(
                "plan #{} milestone #{milestone} is now {}",
                args.id,
                completion(done)
            )
        }
        (EntityKind::Plan, None) => bail!("toggling a plan needs --milestone <ID>"),
        (kind, None) => bail!("{kind} records cannot be toggled"),
        (kind, Some(_)) => bail!("--milestone only applies to plans, not {kind}"),
    };
    Ok(format!("{line}\n"))
}

pub fn run_visit(workspace: &mut Workspace, ctx: &AppContext, args: &VisitArgs) -> Result<String> {
    let mut actions = ActionDispatcher::new(workspace, ctx.clock());
    let site = actions
        .record_visit(args.id)
        .with_context(|| format!("recording visit to website #{}", args.id))?;
    Ok(format!(
        "{} visited {} times, last {}\n",
        site.name, site.visits, site.last_visit
    ))
}

/// Asks on the terminal unless `--yes` was given. Without a terminal the
/// answer is no.
pub fn delete_confirmation(args: &DeleteArgs) -> Result<Confirmation> {
    if args.yes {
        return Ok(Confirmation::Confirmed);
    }
    if !atty::is(atty::Stream::Stdin) {
        return Ok(Confirmation::Declined);
    }
    let answer = prompt(&format!("Delete {} #{}? [y/N]", args.kind, args.id))?;
    Ok(Confirmation::from_flag(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    )))
}

pub fn run_delete(
    workspace: &mut Workspace,
    ctx: &AppContext,
    args: &DeleteArgs,
    confirmation: Confirmation,
) -> Result<String> {
    let mut actions = ActionDispatcher::new(workspace, ctx.clock());
    actions
        .delete(args.kind, args.id, confirmation)
        .with_context(|| format!("deleting {} #{}", args.kind, args.id))?;
    Ok(format!("Deleted {} #{}\n", args.kind, args.id))
}

pub fn run_backup(workspace: &mut Workspace, ctx: &AppContext, args: &BackupArgs) -> Result<String> {
    match &args.command {
        BackupCommand::Create(create) => {
            let kind = if create.auto {
                BackupType::Auto
            } else {
                BackupType::Manual
            };
            let backup = workspace
                .create_backup(kind, &SimulatedBackupProvider, ctx.clock())
                .context("creating backup")?;
            Ok(format!(
                "{} {}{}\n",
                backup.marker(),
                backup.name,
                backup.suffix()
            ))
        }
        BackupCommand::Restore(restore) => {
            let outcome = workspace
                .restore_backup(restore.id, &SimulatedBackupProvider, ctx.clock())
                .with_context(|| format!("restoring backup #{}", restore.id))?;
            match outcome {
                RestoreOutcome::Restored { id } => Ok(format!("Restored backup #{id}\n")),
                RestoreOutcome::Failed { id, reason } => {
                    bail!("restoring backup #{id} failed: {reason}")
                }
            }
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn completion(done: bool) -> &'static str {
    if done {
        "completed"
    } else {
        "pending"
    }
}

fn check(done: bool) -> &'static str {
    if done {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Cuts `text` to at most `max` terminal columns, keeping whole graphemes.
fn truncate_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let width = grapheme.width();
        if used + width + 1 > max {
            break;
        }
        out.push_str(grapheme);
        used += width;
    }
    out.push('…');
    out
}

fn display_date<R: Record>(record: &R, format: DateFormat) -> String {
    match record.date_key() {
        Ok(stamp) => format.format(stamp.date()),
        Err(err) => err.to_string(),
    }
}

/// How one record kind prints in `list` output.
trait ListLine {
    fn list_title(&self) -> &str;
    /// `#id` plus any state badge, printed before the title.
    fn marker(&self) -> String;
    /// Printed after the title on the same line.
    fn suffix(&self) -> String {
        String::new()
    }
    fn details(&self, format: DateFormat) -> Vec<String>;
}

impl ListLine for Diary {
    fn list_title(&self) -> &str {
        &self.title
    }

    fn marker(&self) -> String {
        format!("#{}", self.id)
    }

    fn suffix(&self) -> String {
        format!("  [{}]", self.category)
    }

    fn details(&self, format: DateFormat) -> Vec<String> {
        let mut lines = vec![format!("{} {}", display_date(self, format), self.time)];
        if !self.tags.is_empty() {
            let tags = self
                .tags
                .iter()
                .map(|tag| format!("#{tag}"))
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(format!("tags {tags}"));
        }
        lines
    }
}

impl ListLine for Todo {
    fn list_title(&self) -> &str {
        &self.title
    }

    fn marker(&self) -> String {
        format!("#{} {}", self.id, check(self.status == TodoStatus::Completed))
    }

    fn suffix(&self) -> String {
        format!("  ({})  [{}]", self.priority, self.category)
    }

    fn details(&self, format: DateFormat) -> Vec<String> {
        vec![format!("due {}", display_date(self, format))]
    }
}

impl ListLine for Plan {
    fn list_title(&self) -> &str {
        &self.title
    }

    fn marker(&self) -> String {
        format!("#{}", self.id)
    }

    fn suffix(&self) -> String {
        format!("  {}%  ({})", self.progress, self.priority)
    }

    fn details(&self, _format: DateFormat) -> Vec<String> {
        let mut line = format!("{} .. {}", self.start_date, self.end_date);
        if let Ok(days) = self.duration_days() {
            let _ = write!(line, "  {days} days");
        }
        if let Some((done, total)) = self.milestone_completion() {
            let _ = write!(line, "  milestones {done}/{total}");
        }
        vec![line]
    }
}

impl ListLine for Reminder {
    fn list_title(&self) -> &str {
        &self.title
    }

    fn marker(&self) -> String {
        format!("#{} {}", self.id, check(self.is_completed))
    }

    fn suffix(&self) -> String {
        if self.is_repeating {
            format!("  ({})", self.repeat_type)
        } else {
            String::new()
        }
    }

    fn details(&self, format: DateFormat) -> Vec<String> {
        let time = self.time.split_once('T').map_or("", |(_, time)| time);
        let mut line = format!("at {} {time}", display_date(self, format));
        if let Some(notice) = &self.advance_notice {
            let _ = write!(line, "  notice {notice}");
        }
        vec![line]
    }
}

impl ListLine for Website {
    fn list_title(&self) -> &str {
        &self.name
    }

    fn marker(&self) -> String {
        let star = if self.is_favorite { "*" } else { " " };
        format!("#{} {star}", self.id)
    }

    fn suffix(&self) -> String {
        format!("  {}  [{}]", self.url, self.category)
    }

    fn details(&self, format: DateFormat) -> Vec<String> {
        vec![format!(
            "{} visits, last {}",
            self.visits,
            display_date(self, format)
        )]
    }
}

impl ListLine for Backup {
    fn list_title(&self) -> &str {
        &self.name
    }

    fn marker(&self) -> String {
        format!("#{}", self.id)
    }

    fn suffix(&self) -> String {
        match self.status {
            BackupStatus::Completed => format!(
                "  completed  {}  {} entries",
                self.size.as_deref().unwrap_or("-"),
                self.entries
            ),
            BackupStatus::InProgress => "  in-progress".to_string(),
            BackupStatus::Failed => format!(
                "  failed: {}",
                self.failure_reason.as_deref().unwrap_or("unknown reason")
            ),
        }
    }

    fn details(&self, format: DateFormat) -> Vec<String> {
        vec![format!("{} ({})", display_date(self, format), self.kind)]
    }
}
