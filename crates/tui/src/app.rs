//! Dashboard interaction state and key handling.

#![forbid(unsafe_code)]

use std::path::Path;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use onair_core::{EventKind, Filter, Order, SortKey};
use onair_store::{Action, ViewState};
use onair_view::export::write_export;
use tracing::warn;

pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Kind,
    Limit,
    Order,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            Self::Kind => Self::Limit,
            Self::Limit => Self::Order,
            Self::Order => Self::Kind,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Kind => Self::Order,
            Self::Limit => Self::Kind,
            Self::Order => Self::Limit,
        }
    }
}

/// Raw filter inputs while the editor is open; the limit stays text until applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterForm {
    pub kind: EventKind,
    pub limit: String,
    pub order: Order,
    pub focus: FormField,
}

impl FilterForm {
    pub fn from_filter(f: &Filter) -> Self {
        Self { kind: f.kind.clone(), limit: f.limit.to_string(), order: f.order, focus: FormField::Kind }
    }

    pub fn to_filter(&self) -> Filter { Filter::from_inputs(self.kind.as_str(), &self.limit, self.order.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    EditFilter(FilterForm),
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
    Dispatch(Action),
    Export,
}

#[derive(Debug)]
pub struct App {
    pub mode: Mode,
    /// One-line feedback shown in the status bar (export result and the like).
    pub message: Option<String>,
}

impl Default for App {
    fn default() -> Self { Self::new() }
}

impl App {
    pub fn new() -> Self { Self { mode: Mode::Normal, message: None } }

    pub fn handle_key(&mut self, key: KeyEvent, state: &ViewState) -> Command {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Command::Quit;
        }
        match &mut self.mode {
            Mode::Normal => self.normal_key(key, state),
            Mode::EditFilter(form) => match edit_key(form, key) {
                Edit::Stay => Command::None,
                Edit::Cancel => {
                    self.mode = Mode::Normal;
                    Command::None
                }
                Edit::Apply(filter) => {
                    self.mode = Mode::Normal;
                    Command::Dispatch(Action::ApplyFilter(filter))
                }
            },
        }
    }

    fn normal_key(&mut self, key: KeyEvent, state: &ViewState) -> Command {
        match key.code {
            KeyCode::Char('q') => Command::Quit,
            KeyCode::Char('r') => Command::Dispatch(Action::Refresh),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = (c as u8 - b'1') as usize;
                Command::Dispatch(Action::SortBy(SortKey::ALL[idx]))
            }
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => Command::Dispatch(Action::NextPage),
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => Command::Dispatch(Action::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Command::Dispatch(Action::GoToPage(1)),
            KeyCode::Char('G') | KeyCode::End => Command::Dispatch(Action::GoToPage(state.page_count())),
            KeyCode::Char('+') | KeyCode::Char('=') => page_size_step(state.page.page_size, larger_page_size),
            KeyCode::Char('-') => page_size_step(state.page.page_size, smaller_page_size),
            KeyCode::Char('f') => {
                self.mode = Mode::EditFilter(FilterForm::from_filter(&state.filter));
                Command::None
            }
            KeyCode::Char('e') => Command::Export,
            KeyCode::Esc => {
                self.message = None;
                Command::None
            }
            _ => Command::None,
        }
    }

    /// Write the full fetched set as CSV into `dir`; the outcome lands in `message`.
    pub fn export(&mut self, state: &ViewState, dir: &Path) {
        match write_export(dir, &state.filter.kind, &state.events) {
            Ok(path) => self.message = Some(format!("exported {} rows to {}", state.events.len(), path.display())),
            Err(e) => {
                warn!(error = %e, dir = %dir.display(), "export failed");
                self.message = Some(format!("export failed: {e}"));
            }
        }
    }
}

pub fn larger_page_size(cur: usize) -> usize { PAGE_SIZES.iter().copied().find(|&s| s > cur).unwrap_or(cur) }

pub fn smaller_page_size(cur: usize) -> usize { PAGE_SIZES.iter().rev().copied().find(|&s| s < cur).unwrap_or(cur) }

fn page_size_step(cur: usize, step: fn(usize) -> usize) -> Command {
    let next = step(cur);
    if next == cur {
        Command::None
    } else {
        Command::Dispatch(Action::SetPageSize(next))
    }
}

enum Edit {
    Stay,
    Cancel,
    Apply(Filter),
}

fn edit_key(form: &mut FilterForm, key: KeyEvent) -> Edit {
    match key.code {
        KeyCode::Esc => return Edit::Cancel,
        KeyCode::Enter => return Edit::Apply(form.to_filter()),
        KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
        KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
        code => match form.focus {
            FormField::Kind => {
                if matches!(code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                    form.kind = form.kind.next();
                }
            }
            FormField::Limit => match code {
                KeyCode::Backspace => {
                    form.limit.pop();
                }
                KeyCode::Char(c) if !c.is_control() => form.limit.push(c),
                _ => {}
            },
            FormField::Order => {
                if matches!(code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                    form.order = form.order.flip();
                }
            }
        },
    }
    Edit::Stay
}
