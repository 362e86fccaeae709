use crate::model::{Architecture, InstallContext, RunConfig, RunState};
use crate::terminal::Terminal;

/// Form fields in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AppIds,
    Version,
    Architecture,
    Context,
    Tenant,
    Submit,
}

impl Field {
    const ORDER: [Field; 6] = [
        Field::AppIds,
        Field::Version,
        Field::Architecture,
        Field::Context,
        Field::Tenant,
        Field::Submit,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Field {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Field {
        let n = Self::ORDER.len();
        Self::ORDER[(self.index() + n - 1) % n]
    }

    pub fn is_text(self) -> bool {
        matches!(self, Field::AppIds | Field::Version | Field::Tenant)
    }
}

/// Editable run configuration. Owns the widgets' values; hands out `RunConfig` snapshots.
#[derive(Debug, Clone)]
pub struct FormState {
    pub app_ids: String,
    pub version: String,
    pub architecture: Architecture,
    pub context: InstallContext,
    pub tenant_id: String,
    pub focus: Field,
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let i = all.iter().position(|v| *v == current).unwrap_or(0);
    let n = all.len();
    if forward {
        all[(i + 1) % n]
    } else {
        all[(i + n - 1) % n]
    }
}

impl FormState {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            app_ids: cfg.app_ids.clone(),
            version: cfg.version.clone(),
            architecture: cfg.architecture,
            context: cfg.context,
            tenant_id: cfg.tenant_id.clone().unwrap_or_default(),
            focus: Field::AppIds,
        }
    }

    pub fn to_config(&self) -> RunConfig {
        RunConfig {
            app_ids: self.app_ids.clone(),
            version: self.version.clone(),
            architecture: self.architecture,
            context: self.context,
            tenant_id: Some(self.tenant_id.trim().to_string()).filter(|t| !t.is_empty()),
        }
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::AppIds => Some(&mut self.app_ids),
            Field::Version => Some(&mut self.version),
            Field::Tenant => Some(&mut self.tenant_id),
            _ => None,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(text) = self.focused_text() {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.focused_text() {
            text.pop();
        }
    }

    /// Step the focused option field through its choices.
    pub fn cycle_option(&mut self, forward: bool) {
        match self.focus {
            Field::Architecture => {
                self.architecture = cycle(&Architecture::ALL, self.architecture, forward)
            }
            Field::Context => self.context = cycle(&InstallContext::ALL, self.context, forward),
            _ => {}
        }
    }
}

pub struct UiState {
    pub form: FormState,
    pub terminal: Terminal,
    pub run_state: RunState,
    pub info: String,
    pub show_help: bool,
    pub endpoint: String,
    pub mode_label: &'static str,
    pub last_exported_path: Option<String>,
}

impl UiState {
    pub fn new(form: FormState, endpoint: String, mode_label: &'static str) -> Self {
        Self {
            form,
            terminal: Terminal::new(),
            run_state: RunState::Idle,
            info: String::new(),
            show_help: false,
            endpoint,
            mode_label,
            last_exported_path: None,
        }
    }

    /// The submit control is enabled only while idle.
    pub fn can_submit(&self) -> bool {
        !self.run_state.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_wraps_in_both_directions() {
        assert_eq!(Field::Submit.next(), Field::AppIds);
        assert_eq!(Field::AppIds.prev(), Field::Submit);
        assert_eq!(Field::Version.next(), Field::Architecture);
    }

    #[test]
    fn typing_only_edits_text_fields() {
        let mut form = FormState::from_config(&RunConfig::default());
        for c in "Foo.Bar".chars() {
            form.insert_char(c);
        }
        form.backspace();
        assert_eq!(form.app_ids, "Foo.Ba");

        form.focus = Field::Architecture;
        form.insert_char('z');
        assert_eq!(form.architecture, Architecture::X64);
        assert_eq!(form.app_ids, "Foo.Ba");
    }

    #[test]
    fn option_fields_cycle_through_choices() {
        let mut form = FormState::from_config(&RunConfig::default());
        form.focus = Field::Architecture;
        form.cycle_option(true);
        assert_eq!(form.architecture, Architecture::X86);
        form.cycle_option(false);
        form.cycle_option(false);
        assert_eq!(form.architecture, Architecture::Arm64);

        form.focus = Field::Context;
        form.cycle_option(true);
        form.cycle_option(true);
        assert_eq!(form.context, InstallContext::System);
    }

    #[test]
    fn snapshot_drops_blank_tenant() {
        let mut form = FormState::from_config(&RunConfig {
            app_ids: "A.B".into(),
            tenant_id: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(form.to_config().tenant_id, None);
        form.tenant_id = " contoso ".into();
        assert_eq!(form.to_config().tenant_id.as_deref(), Some("contoso"));
    }
}
