//! Command dispatch.
//!
//! `command()` matches new input against every plugin:
//!
//! | Candidates | Outcome |
//! |------------|---------|
//! | 0 | default plugin, else `NO_MATCH` |
//! | 1 | resolve arguments, then `exec()` |
//! | 2+ | `PLUGIN_RESPONSE_REQUIRED` listing the options |
//!
//! `process_response()` continues a command that is waiting for a reply,
//! either a disambiguation choice or a plugin's follow-up prompt.
//!
//! Nothing a plugin does escapes as an error or panic: failures, timeouts
//! and panics all become `PLUGIN_ERROR` responses.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures_util::FutureExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use herald_plugin::{Command, Plugin, PluginError, ResponseState};
use herald_types::response::{ErrorObject, Response, ResponseCode, status};

use super::Session;

#[derive(Clone, Copy)]
enum Handler {
    Exec,
    Reply,
}

impl Session {
    /// Handle a new line of user input.
    pub async fn command(&self, text: &str) -> Response {
        if !self.is_ready() {
            return not_ready();
        }
        let _turn = self.turn.lock().await;
        self.touch();
        self.ensure_current().await;

        let mut command = Command::new(text, self.ctx.parser.parse(text));
        let candidates = self.ctx.plugins.candidates(&command);
        debug!(
            session_id = %self.id,
            command = %command.uid,
            candidates = candidates.len(),
            "dispatching command"
        );

        let response = match candidates.as_slice() {
            [] => match self.default_plugin() {
                Some(plugin) => self.invoke(plugin.as_ref(), &mut command, Handler::Exec).await,
                None => Response::error(
                    ResponseCode::NoMatch,
                    format!("No plugin could handle \"{}\"", text.trim()),
                    status::NOT_FOUND,
                ),
            },
            [plugin] => self.invoke(plugin.as_ref(), &mut command, Handler::Exec).await,
            many => {
                let options: Vec<String> = many.iter().map(|p| p.name().to_string()).collect();
                command.await_choice(options.clone());
                Response::prompt(
                    ResponseCode::PluginResponseRequired.as_str(),
                    "More than one plugin can handle that. Which one did you mean?",
                )
                .with_extra("options", options)
                .with_extra("command_id", command.uid.to_string())
            }
        };

        self.store(command);
        response
    }

    /// Continue the command `command_id` with the reply `text`.
    pub async fn process_response(&self, command_id: &str, text: &str) -> Response {
        if !self.is_ready() {
            return not_ready();
        }
        let _turn = self.turn.lock().await;
        self.touch();
        self.ensure_current().await;

        let Ok(uid) = Uuid::parse_str(command_id.trim()) else {
            return invalid_id(command_id);
        };
        let Some(mut parent) = self.get_command(&uid) else {
            return invalid_id(command_id);
        };
        if !parent.allow_response() {
            return Response::error(
                ResponseCode::CommandResponseInvalid,
                format!("Command {uid} is not waiting for a response"),
                status::BAD_REQUEST,
            );
        }
        let window = self.ctx.config.sessions.response_window_delta();
        if parent.response_expired(Utc::now(), window) {
            parent.close();
            self.store(parent);
            return Response::error(
                ResponseCode::CommandResponseInvalid,
                format!("Command {uid} is no longer waiting for a response"),
                status::BAD_REQUEST,
            );
        }

        let mut reply = parent.reply(text, self.ctx.parser.parse(text));
        let response = match parent.state.clone() {
            ResponseState::AwaitingChoice { options } => {
                let Some(choice) = pick_option(&options, text) else {
                    return Response::error(
                        ResponseCode::PluginChoiceInvalid,
                        format!("Please choose one of: {}", options.join(", ")),
                        status::BAD_REQUEST,
                    );
                };
                let Some(plugin) = self.ctx.plugins.get(&choice) else {
                    return no_such_plugin(&choice);
                };
                debug!(session_id = %self.id, command = %uid, plugin = %choice, "choice made");
                parent.close();
                reply.plugin = Some(choice);
                self.invoke(plugin.as_ref(), &mut parent, Handler::Exec).await
            }
            ResponseState::AwaitingReply { plugin: name } => {
                let Some(plugin) = self.ctx.plugins.get(&name) else {
                    return no_such_plugin(&name);
                };
                parent.close();
                self.invoke(plugin.as_ref(), &mut reply, Handler::Reply).await
            }
            ResponseState::Closed => {
                return Response::error(
                    ResponseCode::CommandResponseInvalid,
                    format!("Command {uid} is not waiting for a response"),
                    status::BAD_REQUEST,
                );
            }
        };

        parent.responses.push(reply.uid);
        self.store(parent);
        self.store(reply);
        response
    }

    /// The user's `default_plugin` setting, else the configured default.
    fn default_plugin(&self) -> Option<std::sync::Arc<dyn Plugin>> {
        let name = self
            .user_setting("default_plugin")
            .or_else(|| self.ctx.config.plugins.default_plugin.clone())?;
        let plugin = self.ctx.plugins.get(&name);
        if plugin.is_none() {
            warn!(session_id = %self.id, plugin = %name, "default plugin is not registered");
        }
        plugin
    }

    async fn invoke(&self, plugin: &dyn Plugin, command: &mut Command, handler: Handler) -> Response {
        let name = plugin.name().to_string();
        command.plugin = Some(name.clone());

        let args = match self.arguments.resolve(plugin.arguments(), command) {
            Ok(args) => args,
            Err(errors) => {
                info!(
                    session_id = %self.id,
                    plugin = %name,
                    command = %command.uid,
                    "plugin arguments unavailable"
                );
                return Response::from_errors(errors);
            }
        };

        let limit = self.ctx.config.plugins.exec_timeout();
        let call = match handler {
            Handler::Exec => plugin.exec(args),
            Handler::Reply => plugin.response(args),
        };
        let output = match tokio::time::timeout(limit, AssertUnwindSafe(call).catch_unwind()).await {
            Ok(Ok(Ok(output))) => output,
            Ok(Ok(Err(err))) => return self.plugin_failure(&name, command, err),
            Ok(Err(panic)) => {
                let err = PluginError::ExecutionFailed(format!("panicked: {}", panic_message(panic.as_ref())));
                return self.plugin_failure(&name, command, err);
            }
            Err(_) => return self.plugin_failure(&name, command, PluginError::Timeout(limit.as_secs())),
        };

        if output.id.trim().is_empty() {
            warn!(session_id = %self.id, plugin = %name, "plugin output has no id");
            return Response::error(
                ResponseCode::PluginResponseMalformed,
                format!("Plugin {name} returned a malformed response"),
                status::INTERNAL_SERVER_ERROR,
            );
        }
        if output.is_prompt() {
            command.await_reply(&name);
        }
        output
            .into_response()
            .with_extra("command_id", command.uid.to_string())
    }

    fn plugin_failure(&self, name: &str, command: &Command, err: PluginError) -> Response {
        if let PluginError::Reported { id, text, status } = err {
            debug!(session_id = %self.id, plugin = %name, id = %id, "plugin reported an error");
            return Response::from_errors(vec![ErrorObject::new(id, text, status)]);
        }
        warn!(
            session_id = %self.id,
            username = %self.username,
            plugin = %name,
            command = %command.uid,
            text = %command.text,
            error = %err,
            "plugin failed"
        );
        let text = if self.is_admin() {
            format!("Plugin {name} failed: {err}")
        } else {
            format!("Something went wrong while running {name}")
        };
        Response::error(ResponseCode::PluginError, text, status::INTERNAL_SERVER_ERROR)
    }
}

/// Match a reply against the offered options, by name (case-insensitive)
/// or by 1-based position.
fn pick_option(options: &[String], reply: &str) -> Option<String> {
    let reply = reply.trim();
    if let Some(name) = options.iter().find(|o| o.eq_ignore_ascii_case(reply)) {
        return Some(name.clone());
    }
    let index: usize = reply.parse().ok()?;
    options.get(index.checked_sub(1)?).cloned()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn not_ready() -> Response {
    Response::error(
        ResponseCode::SessionNotReady,
        "The session is still being prepared",
        status::SERVICE_UNAVAILABLE,
    )
}

fn invalid_id(command_id: &str) -> Response {
    Response::error(
        ResponseCode::CommandIdInvalid,
        format!("No command with id {command_id}"),
        status::BAD_REQUEST,
    )
}

fn no_such_plugin(name: &str) -> Response {
    Response::error(
        ResponseCode::NoMatch,
        format!("Plugin {name} is not available"),
        status::NOT_FOUND,
    )
}
