// src/commands/am.rs

//! `adb shell am` (activity manager) argument builder.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AdbError, Result};
use crate::exec::AdbArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AmCommand {
    #[default]
    Start,
    StartService,
    ForceStop,
    Broadcast,
}

impl AmCommand {
    pub const ALL: [AmCommand; 4] = [
        AmCommand::Start,
        AmCommand::StartService,
        AmCommand::ForceStop,
        AmCommand::Broadcast,
    ];

    pub fn argument(self) -> &'static str {
        match self {
            AmCommand::Start => "start",
            AmCommand::StartService => "startservice",
            AmCommand::ForceStop => "force-stop",
            AmCommand::Broadcast => "broadcast",
        }
    }

    /// Everything except `force-stop` operates on an intent.
    pub fn takes_intent(self) -> bool {
        self != AmCommand::ForceStop
    }
}

impl fmt::Display for AmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.argument())
    }
}

impl FromStr for AmCommand {
    type Err = AdbError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        AmCommand::ALL
            .into_iter()
            .find(|c| c.argument() == needle)
            .ok_or_else(|| AdbError::InvalidArgument(format!("unknown am command '{s}'")))
    }
}

/// Intent flags. Declaration order is the order they are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntentFlag {
    GrantReadUriPermission,
    GrantWriteUriPermission,
    DebugLogResolution,
    ExcludeStoppedPackages,
    IncludeStoppedPackages,
    ActivityBroughtToFront,
    ActivityClearTop,
    ActivityClearWhenTaskReset,
    ActivityExcludeFromRecents,
    ActivityLaunchedFromHistory,
    ActivityMultipleTask,
    ActivityNoAnimation,
    ActivityNoHistory,
    ActivityNoUserAction,
    ActivityPreviousIsTop,
    ActivityReorderToFront,
    ActivityResetTaskIfNeeded,
    ActivitySingleTop,
    ActivityClearTask,
    ActivityTaskOnHome,
    ReceiverRegisteredOnly,
    ReceiverReplacePending,
}

impl IntentFlag {
    pub fn argument(self) -> &'static str {
        match self {
            IntentFlag::GrantReadUriPermission => "--grant-read-uri-permission",
            IntentFlag::GrantWriteUriPermission => "--grant-write-uri-permission",
            IntentFlag::DebugLogResolution => "--debug-log-resolution",
            IntentFlag::ExcludeStoppedPackages => "--exclude-stopped-packages",
            IntentFlag::IncludeStoppedPackages => "--include-stopped-packages",
            IntentFlag::ActivityBroughtToFront => "--activity-brought-to-front",
            IntentFlag::ActivityClearTop => "--activity-clear-top",
            IntentFlag::ActivityClearWhenTaskReset => "--activity-clear-when-task-reset",
            IntentFlag::ActivityExcludeFromRecents => "--activity-exclude-from-recents",
            IntentFlag::ActivityLaunchedFromHistory => "--activity-launched-from-history",
            IntentFlag::ActivityMultipleTask => "--activity-multiple-task",
            IntentFlag::ActivityNoAnimation => "--activity-no-animation",
            IntentFlag::ActivityNoHistory => "--activity-no-history",
            IntentFlag::ActivityNoUserAction => "--activity-no-user-action",
            IntentFlag::ActivityPreviousIsTop => "--activity-previous-is-top",
            IntentFlag::ActivityReorderToFront => "--activity-reorder-to-front",
            IntentFlag::ActivityResetTaskIfNeeded => "--activity-reset-task-if-needed",
            IntentFlag::ActivitySingleTop => "--activity-single-top",
            IntentFlag::ActivityClearTask => "--activity-clear-task",
            IntentFlag::ActivityTaskOnHome => "--activity-task-on-home",
            IntentFlag::ReceiverRegisteredOnly => "--receiver-registered-only",
            IntentFlag::ReceiverReplacePending => "--receiver-replace-pending",
        }
    }
}

/// Value type of an intent extra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExtraType {
    Null,
    #[default]
    String,
    Boolean,
    Int,
    Long,
    Float,
    Uri,
    Component,
    IntList,
    LongList,
    FloatList,
}

impl ExtraType {
    pub fn argument(self) -> &'static str {
        match self {
            ExtraType::Null => "--esn",
            ExtraType::String => "--es",
            ExtraType::Boolean => "--ez",
            ExtraType::Int => "--ei",
            ExtraType::Long => "--el",
            ExtraType::Float => "--ef",
            ExtraType::Uri => "--eu",
            ExtraType::Component => "--ecn",
            ExtraType::IntList => "--eia",
            ExtraType::LongList => "--ela",
            ExtraType::FloatList => "--efa",
        }
    }
}

/// One `--e* <key> [<value>]` extra.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Extra {
    pub kind: ExtraType,
    pub key: String,
    pub value: String,
}

impl Extra {
    pub fn new(kind: ExtraType, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A `--esn` extra, which carries no value.
    pub fn null(key: impl Into<String>) -> Self {
        Self::new(ExtraType::Null, key, "")
    }

    /// A key is required; so is a value, except for null extras.
    pub fn is_valid(&self) -> bool {
        !self.key.trim().is_empty()
            && (self.kind == ExtraType::Null || !self.value.trim().is_empty())
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.kind.argument().to_string(), self.key.clone()];
        if self.kind != ExtraType::Null {
            args.push(self.value.clone());
        }
        args
    }
}

/// Drop invalid extras and exact duplicates, keeping first occurrences in
/// order. Returns how many were removed.
pub fn clean_extras(extras: &mut Vec<Extra>) -> usize {
    let before = extras.len();
    let mut seen = Vec::with_capacity(before);
    extras.retain(|extra| {
        if !extra.is_valid() || seen.contains(extra) {
            return false;
        }
        seen.push(extra.clone());
        true
    });
    before - extras.len()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Intent {
    pub action: Option<String>,
    pub data_uri: Option<String>,
    pub mime_type: Option<String>,
    pub category: Option<String>,
    pub component: Option<String>,
    pub flags: BTreeSet<IntentFlag>,
    pub extras: Vec<Extra>,
    pub selector: bool,
}

impl Intent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_data_uri(mut self, uri: impl Into<String>) -> Self {
        self.data_uri = Some(uri.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_flag(mut self, flag: IntentFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extras.push(extra);
        self
    }

    pub fn with_selector(mut self, selector: bool) -> Self {
        self.selector = selector;
        self
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let fields = [
            ("-a", &self.action),
            ("-d", &self.data_uri),
            ("-t", &self.mime_type),
            ("-c", &self.category),
            ("-n", &self.component),
        ];
        for (option, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                args.push(option.to_string());
                args.push(value.to_string());
            }
        }
        args.extend(self.flags.iter().map(|flag| flag.argument().to_string()));
        for extra in &self.extras {
            args.extend(extra.to_args());
        }
        if self.selector {
            args.push("--selector".to_string());
        }
        args
    }
}

/// Builds `shell am <command> ...` argument vectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmCommandBuilder {
    pub command: AmCommand,
    /// `-D`, start only.
    pub debug: bool,
    /// `-W`, start only.
    pub wait: bool,
    /// `-S`, start only.
    pub stop_app: bool,
    pub user: Option<String>,
    pub intent: Option<Intent>,
    /// Target of `force-stop`.
    pub package: Option<String>,
}

impl AmCommandBuilder {
    pub fn new(command: AmCommand) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }

    pub fn start(intent: Intent, debug: bool, wait: bool, stop_app: bool, user: Option<String>) -> Self {
        Self {
            debug,
            wait,
            stop_app,
            user,
            intent: Some(intent),
            ..Self::new(AmCommand::Start)
        }
    }

    pub fn start_service(intent: Intent, user: Option<String>) -> Self {
        Self {
            user,
            intent: Some(intent),
            ..Self::new(AmCommand::StartService)
        }
    }

    pub fn broadcast(intent: Intent, user: Option<String>) -> Self {
        Self {
            user,
            intent: Some(intent),
            ..Self::new(AmCommand::Broadcast)
        }
    }

    pub fn force_stop(package: impl Into<String>) -> Self {
        Self {
            package: Some(package.into()),
            ..Self::new(AmCommand::ForceStop)
        }
    }

    pub fn build(&self) -> AdbArgs {
        let mut args = AdbArgs::from(["shell", "am", self.command.argument()]);

        if self.command == AmCommand::Start {
            for (set, flag) in [(self.debug, "-D"), (self.wait, "-W"), (self.stop_app, "-S")] {
                if set {
                    args.push(flag);
                }
            }
        }

        if self.command.takes_intent() {
            if let Some(user) = self.user.as_deref().filter(|u| !u.trim().is_empty()) {
                args.push("--user");
                args.push(user);
            }
            if let Some(intent) = &self.intent {
                args = args.args(intent.to_args());
            }
        } else if let Some(package) = &self.package {
            args.push(package.clone());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn start_with_every_option() {
        let intent = Intent::new()
            .with_action("android.intent.action.VIEW")
            .with_data_uri("http://example.com")
            .with_component("com.example/.Main")
            .with_flag(IntentFlag::ActivitySingleTop)
            .with_flag(IntentFlag::ActivityClearTop)
            .with_extra(Extra::new(ExtraType::Boolean, "fast", "true"))
            .with_extra(Extra::null("nothing"));

        let args =
            AmCommandBuilder::start(intent, true, true, true, Some("0".to_string())).build();
        assert_eq!(
            args.to_string(),
            "shell am start -D -W -S --user 0 -a android.intent.action.VIEW -d http://example.com \
             -n com.example/.Main --activity-clear-top --activity-single-top --ez fast true \
             --esn nothing"
        );
    }

    #[test]
    fn debug_flags_only_apply_to_start() {
        let mut builder = AmCommandBuilder::broadcast(Intent::new().with_action("X"), None);
        builder.debug = true;
        builder.wait = true;
        assert_eq!(builder.build().to_string(), "shell am broadcast -a X");
    }

    #[test]
    fn force_stop_takes_package_and_ignores_user() {
        let mut builder = AmCommandBuilder::force_stop("com.example");
        builder.user = Some("10".to_string());
        assert_eq!(builder.build().to_string(), "shell am force-stop com.example");
    }

    #[test]
    fn blank_user_and_fields_are_omitted() {
        let intent = Intent::new().with_action(" ").with_category("");
        let args = AmCommandBuilder::start_service(intent, Some("  ".to_string())).build();
        assert_eq!(args.to_string(), "shell am startservice");
    }

    #[test]
    fn selector_comes_last() {
        let intent = Intent::new()
            .with_selector(true)
            .with_mime_type("text/plain")
            .with_extra(Extra::new(ExtraType::String, "k", "v"));
        assert_eq!(intent.to_args().join(" "), "-t text/plain --es k v --selector");
    }

    #[test]
    fn receiver_flag_argument() {
        assert_eq!(
            IntentFlag::ReceiverRegisteredOnly.argument(),
            "--receiver-registered-only"
        );
    }

    #[parameterized(
        null = { ExtraType::Null, "--esn" },
        string = { ExtraType::String, "--es" },
        boolean = { ExtraType::Boolean, "--ez" },
        int = { ExtraType::Int, "--ei" },
        long = { ExtraType::Long, "--el" },
        float = { ExtraType::Float, "--ef" },
        uri = { ExtraType::Uri, "--eu" },
        component = { ExtraType::Component, "--ecn" },
        int_list = { ExtraType::IntList, "--eia" },
        long_list = { ExtraType::LongList, "--ela" },
        float_list = { ExtraType::FloatList, "--efa" },
    )]
    fn extra_type_switches(kind: ExtraType, switch: &str) {
        assert_eq!(kind.argument(), switch);
    }

    #[test]
    fn extra_validity() {
        assert!(Extra::null("key").is_valid());
        assert!(Extra::new(ExtraType::Int, "n", "4").is_valid());
        assert!(!Extra::new(ExtraType::Int, "n", " ").is_valid());
        assert!(!Extra::new(ExtraType::String, "", "v").is_valid());
        assert!(!Extra::null("  ").is_valid());
    }

    #[test]
    fn cleaning_drops_invalid_and_duplicate_extras() {
        let mut extras = vec![
            Extra::new(ExtraType::String, "a", "1"),
            Extra::new(ExtraType::String, "", "1"),
            Extra::new(ExtraType::String, "a", "1"),
            Extra::new(ExtraType::Int, "a", "1"),
            Extra::null("b"),
        ];
        assert_eq!(clean_extras(&mut extras), 2);
        assert_eq!(
            extras,
            vec![
                Extra::new(ExtraType::String, "a", "1"),
                Extra::new(ExtraType::Int, "a", "1"),
                Extra::null("b"),
            ]
        );
    }

    #[test]
    fn commands_parse_from_their_arguments() {
        assert_eq!("force-stop".parse::<AmCommand>().ok(), Some(AmCommand::ForceStop));
        assert!("kill".parse::<AmCommand>().is_err());
    }
}
