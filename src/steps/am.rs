// src/steps/am.rs

use std::collections::BTreeSet;

use tracing::info;

use crate::commands::am::clean_extras;
use crate::commands::{AmCommand, AmCommandBuilder, Extra, Intent, IntentFlag};
use crate::errors::Result;
use crate::exec::{AdbBackend, BoxFuture};

use super::{CommandSettings, Step, ValidationError, Verdict, handle_result, is_blank};

/// Sends one command to the device's activity manager.
///
/// Intent fields are `None` when disabled; an enabled field must not be
/// blank.
#[derive(Debug, Clone)]
pub struct ActivityManagerStep {
    pub device_id: Option<String>,
    pub command: AmCommand,
    pub component: Option<String>,
    pub action: Option<String>,
    pub data_uri: Option<String>,
    pub mime_type: Option<String>,
    pub category: Option<String>,
    pub selector: bool,
    pub flags: BTreeSet<IntentFlag>,
    pub extras: Vec<Extra>,
    /// Target of [`AmCommand::ForceStop`].
    pub package: String,
    pub debug: bool,
    pub wait: bool,
    pub force_stop: bool,
    pub user: Option<String>,
    pub settings: CommandSettings,
}

impl Default for ActivityManagerStep {
    fn default() -> Self {
        Self {
            device_id: None,
            command: AmCommand::Start,
            component: Some(String::new()),
            action: Some(String::new()),
            data_uri: None,
            mime_type: None,
            category: None,
            selector: false,
            flags: BTreeSet::new(),
            extras: Vec::new(),
            package: String::new(),
            debug: false,
            wait: false,
            force_stop: false,
            user: None,
            settings: CommandSettings::default(),
        }
    }
}

impl ActivityManagerStep {
    pub fn intent_required(&self) -> bool {
        self.command.takes_intent()
    }

    pub fn build_intent(&self) -> Intent {
        Intent {
            action: self.action.clone(),
            data_uri: self.data_uri.clone(),
            mime_type: self.mime_type.clone(),
            category: self.category.clone(),
            component: self.component.clone(),
            flags: self.flags.clone(),
            extras: self.extras.clone(),
            selector: self.selector,
        }
    }

    pub fn build_command(&self) -> AmCommandBuilder {
        let user = self.user.clone();
        match self.command {
            AmCommand::Start => AmCommandBuilder::start(
                self.build_intent(),
                self.debug,
                self.wait,
                self.force_stop,
                user,
            ),
            AmCommand::StartService => AmCommandBuilder::start_service(self.build_intent(), user),
            AmCommand::Broadcast => AmCommandBuilder::broadcast(self.build_intent(), user),
            AmCommand::ForceStop => AmCommandBuilder::force_stop(self.package.clone()),
        }
    }
}

fn enabled_and_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !is_blank(v))
}

impl Step for ActivityManagerStep {
    fn name(&self) -> &'static str {
        "activity manager"
    }

    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.intent_required() {
            let fields = [
                ("action", &self.action, "please specify the intent action"),
                ("data_uri", &self.data_uri, "please specify the intent data URI"),
                ("mime_type", &self.mime_type, "please specify the intent MIME type"),
                ("category", &self.category, "please specify the intent category"),
                ("component", &self.component, "please specify the intent component"),
            ];
            for (name, value, message) in fields {
                if value.is_some() && !enabled_and_set(value) {
                    errors.push(ValidationError::new(name, message));
                }
            }
            if self.selector && !(enabled_and_set(&self.data_uri) && enabled_and_set(&self.mime_type))
            {
                errors.push(ValidationError::new(
                    "selector",
                    "a selector requires both the data URI and the MIME type",
                ));
            }
        } else if is_blank(&self.package) {
            errors.push(ValidationError::new("package", "please specify the package name"));
        }

        self.settings.validate(&mut errors);
        errors
    }

    fn pre_plan_run(&mut self) {
        let removed = clean_extras(&mut self.extras);
        if removed != 0 {
            info!(removed, "removing duplicated or invalid extras");
        }
    }

    fn run<'a>(&'a mut self, backend: &'a dyn AdbBackend) -> BoxFuture<'a, Result<Verdict>> {
        Box::pin(async move {
            let args = self.build_command().build();
            let result = backend
                .execute(args, self.device_id.as_deref(), self.settings.options())
                .await;
            let mut verdict = Verdict::NotSet;
            handle_result(&mut verdict, &result);
            Ok(verdict)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ExtraType;

    #[test]
    fn default_step_wants_action_and_component() {
        let fields: Vec<_> = ActivityManagerStep::default()
            .validate()
            .iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, ["action", "component"]);
    }

    #[test]
    fn force_stop_only_needs_a_package() {
        let step = ActivityManagerStep {
            command: AmCommand::ForceStop,
            package: "com.example".to_string(),
            ..ActivityManagerStep::default()
        };
        assert!(step.validate().is_empty());
        assert_eq!(
            step.build_command().build().to_string(),
            "shell am force-stop com.example"
        );
    }

    #[test]
    fn selector_needs_data_uri_and_mime_type() {
        let step = ActivityManagerStep {
            action: Some("VIEW".to_string()),
            component: None,
            data_uri: Some("content://x".to_string()),
            selector: true,
            ..ActivityManagerStep::default()
        };
        let fields: Vec<_> = step.validate().iter().map(|e| e.field).collect();
        assert_eq!(fields, ["selector"]);
    }

    #[test]
    fn pre_plan_run_cleans_extras() {
        let mut step = ActivityManagerStep {
            extras: vec![
                Extra::new(ExtraType::String, "k", "v"),
                Extra::new(ExtraType::String, "k", "v"),
                Extra::new(ExtraType::Int, "n", ""),
            ],
            ..ActivityManagerStep::default()
        };
        step.pre_plan_run();
        assert_eq!(step.extras, vec![Extra::new(ExtraType::String, "k", "v")]);
    }

    #[test]
    fn start_command_from_settings() {
        let step = ActivityManagerStep {
            action: Some("android.intent.action.MAIN".to_string()),
            component: Some("com.example/.Main".to_string()),
            wait: true,
            user: Some("0".to_string()),
            ..ActivityManagerStep::default()
        };
        assert_eq!(
            step.build_command().build().to_string(),
            "shell am start -W --user 0 -a android.intent.action.MAIN -n com.example/.Main"
        );
    }
}
