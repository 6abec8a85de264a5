use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::HashSet;
use std::io;
use textbook_fees::aggregate::{format_money, StudentTotal, TOTAL_LABEL};
use textbook_fees::report::{titles_by_student, AMBIGUOUS_WARNING};
use textbook_fees::FeeReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Books,
    Purchases,
    Fees,
}

impl Pane {
    pub fn next(&self) -> Self {
        match self {
            Pane::Books => Pane::Purchases,
            Pane::Purchases => Pane::Fees,
            Pane::Fees => Pane::Books,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Pane::Books => Pane::Fees,
            Pane::Purchases => Pane::Books,
            Pane::Fees => Pane::Purchases,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Pane::Books => " 教材清单 ",
            Pane::Purchases => " 学生购书记录 ",
            Pane::Fees => " 学生购书费用 ",
        }
    }
}

pub struct App {
    pub report: FeeReport,
    pub purchases_by_student: Vec<(String, Vec<String>)>,
    pub fees: Vec<StudentTotal>,
    /// (name, title) pairs matched below the confidence line
    pub flagged: HashSet<(String, String)>,
    pub focus: Pane,
    pub books_state: TableState,
    pub purchases_state: TableState,
    pub fees_state: TableState,
}

impl App {
    pub fn new(report: FeeReport) -> Self {
        let purchases_by_student = titles_by_student(&report.purchases);
        let fees = report.summary.sorted_by_name();
        let flagged = report
            .ambiguous_matches()
            .into_iter()
            .map(|m| (m.purchase.student_name.clone(), m.purchase.book_title.clone()))
            .collect();

        let mut app = Self {
            report,
            purchases_by_student,
            fees,
            flagged,
            focus: Pane::Books,
            books_state: TableState::default(),
            purchases_state: TableState::default(),
            fees_state: TableState::default(),
        };
        for pane in [Pane::Books, Pane::Purchases, Pane::Fees] {
            if app.len(pane) > 0 {
                app.state_mut(pane).select(Some(0));
            }
        }
        app
    }

    /// Row count of a pane; the fee pane carries an extra total row
    pub fn len(&self, pane: Pane) -> usize {
        match pane {
            Pane::Books => self.report.books.len(),
            Pane::Purchases => self.purchases_by_student.len(),
            Pane::Fees => self.fees.len() + 1,
        }
    }

    pub fn state_mut(&mut self, pane: Pane) -> &mut TableState {
        match pane {
            Pane::Books => &mut self.books_state,
            Pane::Purchases => &mut self.purchases_state,
            Pane::Fees => &mut self.fees_state,
        }
    }

    pub fn next_pane(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn previous_pane(&mut self) {
        self.focus = self.focus.previous();
    }

    pub fn next(&mut self) {
        let len = self.len(self.focus);
        if len == 0 {
            return;
        }
        let state = self.state_mut(self.focus);
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.len(self.focus);
        if len == 0 {
            return;
        }
        let state = self.state_mut(self.focus);
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn first(&mut self) {
        if self.len(self.focus) > 0 {
            self.state_mut(self.focus).select(Some(0));
        }
    }

    pub fn last(&mut self) {
        let len = self.len(self.focus);
        if len > 0 {
            self.state_mut(self.focus).select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_pane();
                    } else {
                        app.next_pane();
                    }
                }
                KeyCode::BackTab => app.previous_pane(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Class summary
            Constraint::Min(0),    // Three panes
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(32),
            Constraint::Percentage(36),
            Constraint::Percentage(32),
        ])
        .split(chunks[1]);

    render_books(f, panes[0], app);
    render_purchases(f, panes[1], app);
    render_fees(f, panes[2], app);

    render_status_bar(f, chunks[2], app);
}

fn pane_block(app: &App, pane: Pane) -> Block<'static> {
    let border = if app.focus == pane {
        Color::Cyan
    } else {
        Color::White
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(pane.title().to_string())
}

fn header_row(titles: &[&str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(h.to_string()).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let summary = &app.report.summary;
    let spans = vec![
        Span::styled(
            format!(" 班级: {} ", app.report.class_name),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::raw(format!("教材: {}", app.report.books.len())),
        Span::raw(" │ "),
        Span::raw(format!("购书记录: {}", app.report.purchases.len())),
        Span::raw(" │ "),
        Span::raw(format!("学生: {}", summary.totals.len())),
        Span::raw(" │ "),
        Span::styled(
            format!("{}: ￥{}", TOTAL_LABEL, format_money(summary.grand_total)),
            Style::default().fg(Color::Green),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
    f.render_widget(header, area);
}

fn render_books(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .report
        .books
        .iter()
        .map(|book| {
            Row::new(vec![
                Cell::from(book.serial.to_string()),
                Cell::from(book.title.clone()),
                Cell::from(format!("￥{}", format_money(book.price))),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(5), Constraint::Min(10), Constraint::Length(10)],
    )
    .header(header_row(&["序号", "教材", "价格"]))
    .block(pane_block(app, Pane::Books))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.books_state);
}

fn render_purchases(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .purchases_by_student
        .iter()
        .map(|(name, titles)| {
            let titles: Vec<String> = titles
                .iter()
                .map(|title| {
                    if app.flagged.contains(&(name.clone(), title.clone())) {
                        format!("{title} ⚠")
                    } else {
                        title.clone()
                    }
                })
                .collect();
            Row::new(vec![
                Cell::from(name.clone()),
                Cell::from(titles.join(", ")),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(10)])
        .header(header_row(&["姓名", "教材"]))
        .block(pane_block(app, Pane::Purchases))
        .highlight_style(highlight())
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.purchases_state);
}

fn render_fees(f: &mut Frame, area: Rect, app: &mut App) {
    let mut rows: Vec<Row> = app
        .fees
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.student_name.clone()),
                Cell::from(format!("￥{}", format_money(t.total_fee))),
            ])
        })
        .collect();
    rows.push(
        Row::new(vec![
            Cell::from(TOTAL_LABEL),
            Cell::from(format!("￥{}", format_money(app.report.grand_total()))),
        ])
        .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
    );

    let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(14)])
        .header(header_row(&["姓名", "购书费用"]))
        .block(pane_block(app, Pane::Fees))
        .highlight_style(highlight())
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.fees_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if app.report.is_ambiguous() {
        status_spans.push(Span::styled(
            format!(" {}（{} 条）", AMBIGUOUS_WARNING, app.flagged.len()),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" 切换 | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" 移动 | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" 退出"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status_bar, area);
}
