//! The plugin trait.
//!
//! A [`Plugin`] is a capability matched against user commands. It declares
//! the argument kinds it needs; the dispatcher resolves them from the
//! session's argument cache before calling [`Plugin::exec`]. If any
//! declared argument failed to build, `exec` is never called.
//!
//! All plugins are `Send + Sync`. Async methods use `#[async_trait]`.

use async_trait::async_trait;

use crate::argument::{ArgumentKind, ResolvedArgs};
use crate::command::Command;
use crate::error::PluginError;
use crate::output::PluginOutput;

/// A capability the dispatcher can route commands to.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin name (e.g. `"echo"`, `"weather"`).
    fn name(&self) -> &str;

    /// One-line description shown in plugin listings.
    fn description(&self) -> &str {
        ""
    }

    /// Argument kinds `exec()` and `response()` expect to find resolved.
    fn arguments(&self) -> &[ArgumentKind] {
        &[]
    }

    /// Whether this plugin wants `command`.
    ///
    /// Must be cheap and free of side effects. The default matches when the
    /// plugin's name appears among the command's verb lemmas.
    fn check(&self, command: &Command) -> bool {
        command.verbs.contains(&self.name().to_lowercase())
    }

    /// Handle a command routed to this plugin.
    async fn exec(&self, args: ResolvedArgs) -> Result<PluginOutput, PluginError>;

    /// Handle a follow-up reply after [`PluginOutput::prompt`].
    ///
    /// `CommandObject` in `args` is the reply; its `parent` is the command
    /// that prompted.
    async fn response(&self, _args: ResolvedArgs) -> Result<PluginOutput, PluginError> {
        Err(PluginError::NotImplemented(format!(
            "plugin '{}' does not accept replies",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsed::{ParsedText, PartOfSpeech, Token};

    struct Weather;

    #[async_trait]
    impl Plugin for Weather {
        fn name(&self) -> &str {
            "Weather"
        }

        async fn exec(&self, _args: ResolvedArgs) -> Result<PluginOutput, PluginError> {
            Ok(PluginOutput::success("WEATHER_OK", "sunny"))
        }
    }

    fn verb_command(verb: &str) -> Command {
        let parsed = ParsedText {
            text: verb.into(),
            tokens: vec![Token {
                text: verb.into(),
                lemma: verb.into(),
                pos: PartOfSpeech::Verb,
            }],
            ..ParsedText::default()
        };
        Command::new(verb, parsed)
    }

    #[test]
    fn default_check_matches_verb_lemma() {
        assert!(Weather.check(&verb_command("weather")));
        assert!(!Weather.check(&verb_command("search")));
    }

    #[tokio::test]
    async fn default_response_is_not_implemented() {
        let err = Weather.response(ResolvedArgs::new()).await.unwrap_err();
        assert!(matches!(err, PluginError::NotImplemented(_)));
        assert!(Weather.arguments().is_empty());
    }
}
