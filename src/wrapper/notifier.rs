//! Error notifications sent to a chat service when a job fails.
//!
//! The wrapper only builds the payload; delivering it is up to a
//! [`Notifier`] supplied by the application.

use std::{env, error::Error as _};

use log::{info, warn};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    core::{
        job::JobContext,
        model::JobModel,
        wrapper::{Next, Wrapper},
    },
    error::{WorkerError, WorkerResult},
};

pub const ENV_VAR: &str = "WORKER_TOOLS_ENV";
pub const SLACK_WEBHOOK_VAR: &str = "SLACK_NOTIFIER_WEBHOOK";
pub const SLACK_CHANNEL_VAR: &str = "SLACK_NOTIFIER_CHANNEL";

const DEFAULT_ENVIRONMENT: &str = "development";

/// Environment name from `WORKER_TOOLS_ENV`, `development` when unset.
pub fn environment() -> String {
    env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string())
}

/// A payload ready to be posted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Where to post, when the flavour knows it (Slack webhooks).
    pub endpoint: Option<String>,
    pub payload: Value,
}

/// Delivers notifications, e.g. over HTTP.
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> WorkerResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlackSettings {
    pub webhook: String,
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
    /// `good`, `warning`, `danger` or a hex color.
    pub color: String,
    pub application: String,
    pub environment: String,
}

impl SlackSettings {
    pub fn new(webhook: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            webhook: webhook.into(),
            channel: channel.into(),
            username: "Notifier".to_string(),
            icon_emoji: ":red_circle:".to_string(),
            color: "danger".to_string(),
            application: String::new(),
            environment: environment(),
        }
    }

    /// Reads the webhook and channel from `SLACK_NOTIFIER_WEBHOOK` and
    /// `SLACK_NOTIFIER_CHANNEL`.
    pub fn from_env() -> WorkerResult<Self> {
        let webhook = env::var(SLACK_WEBHOOK_VAR)
            .map_err(|_| WorkerError::MissingConfiguration(SLACK_WEBHOOK_VAR.to_string()))?;
        let channel = env::var(SLACK_CHANNEL_VAR)
            .map_err(|_| WorkerError::MissingConfiguration(SLACK_CHANNEL_VAR.to_string()))?;
        Ok(Self::new(webhook, channel))
    }

    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = application.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RocketChatSettings {
    pub emoji: String,
    pub event: String,
    pub environment: String,
}

impl Default for RocketChatSettings {
    fn default() -> Self {
        Self {
            emoji: ":red_circle:".to_string(),
            event: "Worker Error Notifier".to_string(),
            environment: environment(),
        }
    }
}

/// Payload flavour of an [`ErrorNotifierWrapper`].
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationFormat {
    Slack(SlackSettings),
    RocketChat(RocketChatSettings),
}

impl NotificationFormat {
    fn environment(&self) -> &str {
        match self {
            NotificationFormat::Slack(settings) => &settings.environment,
            NotificationFormat::RocketChat(settings) => &settings.environment,
        }
    }
}

/// The error and its sources, one per line.
fn error_details(error: &WorkerError) -> String {
    let mut lines = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        lines.push(cause.to_string());
        source = cause.source();
    }
    lines.join("\n")
}

type TitleFn = Box<dyn Fn(&JobModel) -> String>;
type ErrorFilter = Box<dyn Fn(&WorkerError) -> bool>;

/// Notifies failures of the inner chain, then returns them unchanged.
///
/// Enabled by default only when the environment is `production`. Failures of
/// the notifier itself are logged and ignored.
pub struct ErrorNotifierWrapper<N> {
    notifier: N,
    format: NotificationFormat,
    enabled: bool,
    receivers: Option<String>,
    title: Option<TitleFn>,
    should_notify: ErrorFilter,
}

impl<N: Notifier> ErrorNotifierWrapper<N> {
    pub fn new(notifier: N, format: NotificationFormat) -> Self {
        let enabled = format.environment() == "production";
        Self {
            notifier,
            format,
            enabled,
            receivers: None,
            title: None,
            should_notify: Box::new(|_| true),
        }
    }

    pub fn enabled(mut self, yes: bool) -> Self {
        self.enabled = yes;
        self
    }

    /// Mention put in front of the message, e.g. `@all`.
    pub fn receivers(mut self, receivers: impl Into<String>) -> Self {
        self.receivers = Some(receivers.into());
        self
    }

    /// Title of the message. Defaults to `<kind> #<id>`.
    pub fn title(mut self, title: impl Fn(&JobModel) -> String + 'static) -> Self {
        self.title = Some(Box::new(title));
        self
    }

    /// Restricts notifications to the errors accepted by `filter`.
    pub fn should_notify(mut self, filter: impl Fn(&WorkerError) -> bool + 'static) -> Self {
        self.should_notify = Box::new(filter);
        self
    }

    fn message(&self, model: &JobModel) -> String {
        let title = match &self.title {
            Some(title) => title(model),
            None => format!("{} #{}", model.kind, model.id),
        };
        self.receivers
            .iter()
            .cloned()
            .chain([title])
            .collect::<Vec<_>>()
            .join(" - ")
    }

    /// Builds the notification of `error` for `model`.
    pub fn notification(&self, model: &JobModel, error: &WorkerError) -> Notification {
        let message = self.message(model);

        match &self.format {
            NotificationFormat::Slack(settings) => Notification {
                endpoint: Some(settings.webhook.clone()),
                payload: json!({
                    "username": settings.username,
                    "channel": settings.channel,
                    "icon_emoji": settings.icon_emoji,
                    "text": format!("*{message}*"),
                    "attachments": [
                        {
                            "color": settings.color,
                            "fields": [
                                { "title": "Application", "value": settings.application, "short": true },
                                { "title": "Environment", "value": settings.environment, "short": true }
                            ]
                        },
                        {
                            "title": format!("{} : {}", error.name(), error),
                            "color": settings.color,
                            "text": error_details(error)
                        }
                    ]
                }),
            },
            NotificationFormat::RocketChat(settings) => Notification {
                endpoint: None,
                payload: json!({
                    "text": message,
                    "emoji": settings.emoji,
                    "event": format!("{} ({})", settings.event, settings.environment),
                    "attachment": {
                        "collapsed": true,
                        "title": "Error",
                        "text": format!("{}: {}", error.name(), error_details(error))
                    }
                }),
            },
        }
    }
}

impl<'a, N: Notifier> Wrapper<JobContext<'a>> for ErrorNotifierWrapper<N> {
    fn name(&self) -> &str {
        "error_notifier"
    }

    fn around(&self, ctx: &mut JobContext<'a>, next: Next<'_, JobContext<'a>>) -> WorkerResult<()> {
        let result = next.run(ctx);

        if let Err(error) = &result {
            if self.enabled && (self.should_notify)(error) {
                let notification = self.notification(ctx.model(), error);
                match self.notifier.notify(&notification) {
                    Ok(()) => info!(
                        target: ctx.log_target(),
                        "Error of model {} notified", ctx.model().id
                    ),
                    Err(notify_error) => warn!(
                        target: ctx.log_target(),
                        "Error notification failed: {}", notify_error
                    ),
                }
            }
        }

        result
    }
}
