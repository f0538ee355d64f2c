//! Built-in plugins.

use async_trait::async_trait;

use herald_plugin::matching::PhraseMatcher;
use herald_plugin::{ArgumentKind, Command, Plugin, PluginError, PluginOutput, ResolvedArgs};
use herald_types::config::PluginsConfig;

use crate::stores::Parser;

/// Repeats what the user says.
///
/// `echo hello` answers `hello` straight away. A bare `echo`, or a phrase
/// close enough to one of [`ECHO_PHRASES`], asks what to say and echoes
/// the reply.
pub struct EchoPlugin {
    phrases: PhraseMatcher,
}

const ECHO_ARGUMENTS: &[ArgumentKind] = &[ArgumentKind::CommandText];

/// Phrases that start an echo without the `echo` keyword.
pub const ECHO_PHRASES: &[&str] = &["repeat after me", "say it back to me"];

impl EchoPlugin {
    /// `parser` must be the one commands are parsed with, so phrase vectors
    /// compare against command vectors.
    pub fn new(parser: &dyn Parser, config: &PluginsConfig) -> Self {
        let phrases = ECHO_PHRASES.iter().map(|p| parser.parse(p)).collect();
        Self {
            phrases: PhraseMatcher::from_config(phrases, config),
        }
    }
}

fn leading_echo(text: &str) -> Option<&str> {
    let text = text.trim();
    let (first, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    first.eq_ignore_ascii_case("echo").then(|| rest.trim())
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Repeat a phrase back"
    }

    fn arguments(&self) -> &[ArgumentKind] {
        ECHO_ARGUMENTS
    }

    fn check(&self, command: &Command) -> bool {
        command.verbs.contains("echo")
            || leading_echo(&command.text).is_some()
            || self.phrases.matches(command)
    }

    async fn exec(&self, args: ResolvedArgs) -> Result<PluginOutput, PluginError> {
        let text = args.text(ArgumentKind::CommandText)?;
        match leading_echo(text) {
            Some(rest) if !rest.is_empty() => Ok(PluginOutput::success("ECHO_PLUGIN_SUCCESS", rest)),
            _ => Ok(PluginOutput::prompt("ECHO_PLUGIN_RESPONSE", "What should I say?")),
        }
    }

    async fn response(&self, args: ResolvedArgs) -> Result<PluginOutput, PluginError> {
        let text = args.text(ArgumentKind::CommandText)?.trim();
        if text.is_empty() {
            return Err(PluginError::reported(
                "ECHO_PLUGIN_EMPTY",
                "There is nothing to repeat",
                400,
            ));
        }
        Ok(PluginOutput::success("ECHO_PLUGIN_SUCCESS", text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BasicParser;
    use herald_plugin::{ArgValue, OutputKind, ParsedText};

    fn echo() -> EchoPlugin {
        EchoPlugin::new(&BasicParser::new(), &PluginsConfig::default())
    }

    fn args(text: &str) -> ResolvedArgs {
        let mut args = ResolvedArgs::new();
        args.insert(ArgumentKind::CommandText, ArgValue::Text(text.into()));
        args
    }

    #[test]
    fn matches_leading_echo() {
        assert!(echo().check(&Command::new("Echo hi", ParsedText::default())));
        assert!(!echo().check(&Command::new("say echo", ParsedText::default())));
    }

    #[test]
    fn matches_phrases_above_the_threshold() {
        let parser = BasicParser::new();
        let command = |text: &str| Command::new(text, parser.parse(text));
        let plugin = echo();
        assert!(plugin.check(&command("Repeat after me!")));
        assert!(!plugin.check(&command("repeat the news")));

        // One extra word drops cosine similarity to about 0.87.
        assert!(!plugin.check(&command("please repeat after me")));
        let loose = EchoPlugin::new(
            &parser,
            &PluginsConfig {
                similarity_threshold: 0.8,
                ..PluginsConfig::default()
            },
        );
        assert!(loose.check(&command("please repeat after me")));
    }

    #[tokio::test]
    async fn echoes_inline_text() {
        let out = echo().exec(args("echo hello there")).await.unwrap();
        assert_eq!(out.kind, OutputKind::Success);
        assert_eq!(out.text, "hello there");
    }

    #[tokio::test]
    async fn phrase_prompts_instead_of_echoing_itself() {
        let out = echo().exec(args("repeat after me")).await.unwrap();
        assert!(out.is_prompt());
    }

    #[tokio::test]
    async fn bare_echo_prompts_then_echoes_reply() {
        let plugin = echo();
        let out = plugin.exec(args("echo")).await.unwrap();
        assert!(out.is_prompt());
        assert_eq!(out.id, "ECHO_PLUGIN_RESPONSE");

        let reply = plugin.response(args("  hi  ")).await.unwrap();
        assert_eq!(reply.id, "ECHO_PLUGIN_SUCCESS");
        assert_eq!(reply.text, "hi");

        let empty = plugin.response(args(" ")).await.unwrap_err();
        assert!(matches!(empty, PluginError::Reported { .. }));
    }
}
