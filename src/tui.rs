use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{Case, MonetizationMethod};
use crate::store::Catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Methods,
    Cases,
}

struct AppState<'a> {
    catalog: &'a Catalog,
    methods: Vec<&'a MonetizationMethod>,
    cases: Vec<&'a Case>,
    tab: Tab,
    selected: usize,
    scroll_offset: u16,
}

impl<'a> AppState<'a> {
    fn new(catalog: &'a Catalog, methods: Vec<&'a MonetizationMethod>, cases: Vec<&'a Case>) -> Self {
        let tab = if methods.is_empty() { Tab::Cases } else { Tab::Methods };
        Self {
            catalog,
            methods,
            cases,
            tab,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn len(&self) -> usize {
        match self.tab {
            Tab::Methods => self.methods.len(),
            Tab::Cases => self.cases.len(),
        }
    }

    fn toggle_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Methods => Tab::Cases,
            Tab::Cases => Tab::Methods,
        };
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn next(&mut self) {
        if self.len() > 0 && self.selected < self.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

pub fn run_browse(
    catalog: &Catalog,
    methods: Vec<&MonetizationMethod>,
    cases: Vec<&Case>,
) -> Result<()> {
    if methods.is_empty() && cases.is_empty() {
        println!("Nothing to browse.");
        return Ok(());
    }

    let mut state = AppState::new(catalog, methods, cases);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Tab => state.toggle_tab(),
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(frame.area());

    // Left panel: record list
    let (title, items): (String, Vec<ListItem>) = match state.tab {
        Tab::Methods => (
            format!(" Methods ({}) ", state.methods.len()),
            state
                .methods
                .iter()
                .map(|m| {
                    let star = if m.is_featured { "*" } else { " " };
                    ListItem::new(format!("{} {} | {}", star, m.name, m.chain_level.label()))
                })
                .collect(),
        ),
        Tab::Cases => (
            format!(" Cases ({}) ", state.cases.len()),
            state
                .cases
                .iter()
                .map(|c| {
                    let star = if c.is_featured { "*" } else { " " };
                    ListItem::new(format!("{} {} | {}", star, c.name, c.company_name))
                })
                .collect(),
        ),
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail = match state.tab {
        Tab::Methods => state
            .methods
            .get(state.selected)
            .map(|m| method_detail(state.catalog, m)),
        Tab::Cases => state
            .cases
            .get(state.selected)
            .map(|c| case_detail(state.catalog, c)),
    }
    .unwrap_or_else(|| Text::raw("Nothing selected"));

    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = Paragraph::new(" j/k:navigate  J/K:scroll  tab:methods/cases  q:quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
}

fn bullets(lines: &mut Vec<Line<'static>>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(Line::from(Span::styled(
        format!("  {}", title),
        Style::default().fg(Color::Cyan),
    )));
    for item in items {
        lines.push(Line::from(format!("    - {}", item)));
    }
}

fn method_detail(catalog: &Catalog, method: &MonetizationMethod) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(heading(&method.name));
    lines.push(Line::from(format!(
        "{} | 毛利 {} | 规模化 {} | 数据依赖 {} | 算力敏感 {}",
        method.chain_level.label(),
        method.gross_margin_level.label(),
        method.scalability_level.label(),
        method.data_dependency_level.label(),
        method.compute_cost_sensitivity.label(),
    )));
    if let Some(anchor) = method.price_anchor() {
        lines.push(Line::from(format!("Price: {}", anchor)));
    }
    lines.push(Line::from(""));

    for line in textwrap::fill(&method.definition, 70).lines() {
        lines.push(Line::from(line.to_string()));
    }
    lines.push(Line::from(""));

    bullets(&mut lines, "Advantages", &method.advantages);
    bullets(&mut lines, "Disadvantages", &method.disadvantages);
    bullets(&mut lines, "Risks", &method.risk_points);

    let related = catalog.cases_by_method(&method.id);
    if !related.is_empty() {
        lines.push(Line::from(""));
        lines.push(heading(&format!("Cases ({})", related.len())));
        for case in related {
            lines.push(Line::from(format!("  {} ({})", case.name, case.company_name)));
        }
    }

    Text::from(lines)
}

fn case_detail(catalog: &Catalog, case: &Case) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(heading(&case.name));
    lines.push(Line::from(format!(
        "{} | {} | {}",
        case.company_name,
        case.company_type.label(),
        case.chain_level.label()
    )));
    if let Some(valuation) = case.valuation() {
        lines.push(Line::from(format!("Valuation: {}", valuation)));
    }
    if let Some(revenue) = case.revenue() {
        lines.push(Line::from(format!("Revenue: {}", revenue)));
    }
    lines.push(Line::from(""));

    if !case.short_description.is_empty() {
        for line in textwrap::fill(&case.short_description, 70).lines() {
            lines.push(Line::from(line.to_string()));
        }
        lines.push(Line::from(""));
    }

    lines.push(heading("Monetization"));
    for binding in &case.monetization_methods {
        let method_name = catalog
            .method(&binding.method_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| "-".to_string());
        let marker = if binding.is_primary { "*" } else { " " };
        lines.push(Line::from(format!("  {} {}", marker, method_name)));
    }

    if !case.growth_path.is_empty() {
        lines.push(Line::from(""));
        lines.push(heading("Growth"));
        for stage in &case.growth_path {
            lines.push(Line::from(format!("  {} [{}] {}", stage.stage, stage.period, stage.description)));
        }
    }

    Text::from(lines)
}
