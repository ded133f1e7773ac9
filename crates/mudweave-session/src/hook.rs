//! Line hooks and hook chains.
//!
//! A hook looks at one line (without its line terminator) and returns the
//! line to pass on, a changed line, or `None` to drop it. A [`HookChain`]
//! applies hooks in order and stops at the first `None`.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use mudweave_core::{ChannelId, Error, HookConfig, Result};

use crate::session::Session;

/// A line transformer.
pub trait Hook: Send + Sync {
    /// Transform a line. `Ok(None)` drops it.
    fn process(&self, session: &Session, line: String) -> Result<Option<String>>;

    /// Short name used in error reports.
    fn name(&self) -> &str {
        "hook"
    }
}

/// Callback deciding whether a hook applies to a line.
pub type Predicate = Arc<dyn Fn(&Session, &str) -> bool + Send + Sync>;

/// Side effect run by a [`FunctionHook`].
pub type Action = Arc<dyn Fn(&Session, &str) -> Result<()> + Send + Sync>;

/// When a hook fires: on a regex match or on an arbitrary predicate.
#[derive(Clone)]
pub enum Condition {
    /// `Regex::is_match` on the line
    Pattern(Regex),
    /// User callback
    Function(Predicate),
}

impl Condition {
    /// Build a pattern condition.
    pub fn pattern(pattern: &str) -> Result<Self> {
        compile(pattern).map(Condition::Pattern)
    }

    /// Build a predicate condition.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Session, &str) -> bool + Send + Sync + 'static,
    {
        Condition::Function(Arc::new(f))
    }

    /// Whether the condition holds for `line`.
    pub fn holds(&self, session: &Session, line: &str) -> bool {
        match self {
            Condition::Pattern(re) => re.is_match(line),
            Condition::Function(f) => f(session, line),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Pattern(re) => write!(f, "Pattern({:?})", re.as_str()),
            Condition::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<Regex> for Condition {
    fn from(re: Regex) -> Self {
        Condition::Pattern(re)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Hook(format!("invalid pattern '{pattern}': {e}")))
}

fn color_code(color: u8) -> Result<String> {
    if color > 7 {
        return Err(Error::Hook(format!("color {color} out of range 0-7")));
    }
    Ok(format!("\x1b[3{color}m"))
}

const RESET: &str = "\x1b[0m";

/// Moves matching lines to a side channel.
#[derive(Debug)]
pub struct StreamHook {
    condition: Condition,
    channel: ChannelId,
}

impl StreamHook {
    /// Redirect lines for which `condition` holds to `channel`.
    pub fn new(condition: impl Into<Condition>, channel: ChannelId) -> Self {
        Self {
            condition: condition.into(),
            channel,
        }
    }
}

impl Hook for StreamHook {
    fn process(&self, session: &Session, line: String) -> Result<Option<String>> {
        if self.condition.holds(session, &line) {
            session.write_to_stream(self.channel, &format!("{line}\n"));
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn name(&self) -> &str {
        "stream"
    }
}

/// Drops lines containing a match.
#[derive(Debug)]
pub struct SuppressHook {
    pattern: Regex,
}

impl SuppressHook {
    /// Drop lines matching `pattern` anywhere.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
        })
    }
}

impl Hook for SuppressHook {
    fn process(&self, _session: &Session, line: String) -> Result<Option<String>> {
        if self.pattern.is_match(&line) {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    fn name(&self) -> &str {
        "suppress"
    }
}

/// Colours the first match in a line.
#[derive(Debug)]
pub struct HighlightHook {
    pattern: Regex,
    color: String,
}

impl HighlightHook {
    /// Colour the first match of `pattern` with ANSI colour `color` (0-7).
    pub fn new(pattern: &str, color: u8) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            color: color_code(color)?,
        })
    }
}

impl Hook for HighlightHook {
    fn process(&self, _session: &Session, line: String) -> Result<Option<String>> {
        let Some(m) = self.pattern.find(&line) else {
            return Ok(Some(line));
        };
        Ok(Some(format!(
            "{}{}{}{}{}",
            &line[..m.start()],
            self.color,
            m.as_str(),
            RESET,
            &line[m.end()..]
        )))
    }

    fn name(&self) -> &str {
        "highlight"
    }
}

/// Colours whole lines containing a match.
#[derive(Debug)]
pub struct HighlightLineHook {
    pattern: Regex,
    color: String,
}

impl HighlightLineHook {
    /// Colour lines matching `pattern` with ANSI colour `color` (0-7).
    pub fn new(pattern: &str, color: u8) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            color: color_code(color)?,
        })
    }
}

impl Hook for HighlightLineHook {
    fn process(&self, _session: &Session, line: String) -> Result<Option<String>> {
        if self.pattern.is_match(&line) {
            Ok(Some(format!("{}{}{}", self.color, line, RESET)))
        } else {
            Ok(Some(line))
        }
    }

    fn name(&self) -> &str {
        "highlight_line"
    }
}

/// Runs a side effect for matching lines and passes them on unchanged.
pub struct FunctionHook {
    condition: Condition,
    action: Action,
}

impl FunctionHook {
    /// Call `action` for every line `condition` holds for.
    pub fn new<F>(condition: impl Into<Condition>, action: F) -> Self
    where
        F: Fn(&Session, &str) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            condition: condition.into(),
            action: Arc::new(action),
        }
    }
}

impl fmt::Debug for FunctionHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionHook")
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

impl Hook for FunctionHook {
    fn process(&self, session: &Session, line: String) -> Result<Option<String>> {
        if self.condition.holds(session, &line) {
            (self.action)(session, &line)?;
        }
        Ok(Some(line))
    }

    fn name(&self) -> &str {
        "function"
    }
}

/// Sends a response to the game when a line matches.
///
/// `$1`, `${name}` and friends in the response expand to capture groups.
#[derive(Debug, Clone)]
pub struct Trigger {
    pattern: Regex,
    response: String,
}

impl Trigger {
    /// Answer lines matching `pattern` with `response`.
    pub fn new(pattern: &str, response: &str) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            response: response.to_string(),
        })
    }

    /// The response for `line`, if the trigger fires.
    pub fn respond(&self, line: &str) -> Option<String> {
        let caps = self.pattern.captures(line)?;
        let mut out = String::new();
        caps.expand(&self.response, &mut out);
        Some(out)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.pattern.as_str(), self.response)
    }
}

impl Hook for Trigger {
    fn process(&self, session: &Session, line: String) -> Result<Option<String>> {
        if let Some(response) = self.respond(&line) {
            debug!("Trigger fired: {}", self);
            session.send(&response);
        }
        Ok(Some(line))
    }

    fn name(&self) -> &str {
        "trigger"
    }
}

/// Every trigger of the list sees every line.
#[derive(Debug, Clone, Default)]
pub struct TriggerList {
    triggers: Vec<Trigger>,
}

impl TriggerList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trigger.
    pub fn add(&mut self, trigger: Trigger) {
        self.triggers.push(trigger);
    }

    /// Remove the trigger at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Trigger> {
        (index < self.triggers.len()).then(|| self.triggers.remove(index))
    }

    /// The triggers in order.
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }
}

impl Hook for TriggerList {
    fn process(&self, session: &Session, line: String) -> Result<Option<String>> {
        for trigger in &self.triggers {
            trigger.process(session, line.clone())?;
        }
        Ok(Some(line))
    }

    fn name(&self) -> &str {
        "trigger_list"
    }
}

/// What a chain did with a line.
#[derive(Debug)]
pub enum ChainOutcome {
    /// The line survived, possibly transformed
    Pass(String),
    /// A hook dropped the line
    Dropped,
    /// A hook failed or panicked; `line` is the text before that hook and
    /// later hooks were skipped
    Failed {
        /// Line as the failing hook received it
        line: String,
        /// What went wrong
        error: Error,
    },
}

/// Ordered hooks.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn Hook>>,
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

impl HookChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from hook definitions. Consecutive triggers share one
    /// [`TriggerList`].
    pub fn from_config(configs: &[HookConfig]) -> Result<Self> {
        let mut chain = Self::new();
        let mut triggers = TriggerList::new();

        for config in configs {
            if let HookConfig::Trigger { pattern, response } = config {
                triggers.add(Trigger::new(pattern, response)?);
                continue;
            }
            if !triggers.triggers().is_empty() {
                chain.push(std::mem::take(&mut triggers));
            }
            match config {
                HookConfig::Suppress { pattern } => chain.push(SuppressHook::new(pattern)?),
                HookConfig::Highlight { pattern, color } => {
                    chain.push(HighlightHook::new(pattern, *color)?)
                }
                HookConfig::HighlightLine { pattern, color } => {
                    chain.push(HighlightLineHook::new(pattern, *color)?)
                }
                HookConfig::Stream { pattern, channel } => {
                    chain.push(StreamHook::new(compile(pattern)?, *channel))
                }
                HookConfig::Trigger { .. } => {}
            }
        }
        if !triggers.triggers().is_empty() {
            chain.push(triggers);
        }
        Ok(chain)
    }

    /// Append a hook.
    pub fn push(&mut self, hook: impl Hook + 'static) {
        self.hooks.push(Arc::new(hook));
    }

    /// Append a shared hook.
    pub fn push_shared(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Number of hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run `line` through the chain. A panicking hook is reported like a
    /// failing one.
    pub fn apply(&self, session: &Session, line: String) -> ChainOutcome {
        let mut line = line;
        for hook in &self.hooks {
            let input = line.clone();
            let result = catch_unwind(AssertUnwindSafe(|| hook.process(session, input)));
            match result {
                Ok(Ok(Some(next))) => line = next,
                Ok(Ok(None)) => return ChainOutcome::Dropped,
                Ok(Err(error)) => return ChainOutcome::Failed { line, error },
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    return ChainOutcome::Failed {
                        line,
                        error: Error::Hook(format!("{} hook panicked: {}", hook.name(), message)),
                    };
                }
            }
        }
        ChainOutcome::Pass(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use mudweave_core::GameConfig;

    fn session() -> Arc<Session> {
        Session::new(Arc::new(GameConfig::default())).unwrap()
    }

    fn pass(outcome: ChainOutcome) -> Option<String> {
        match outcome {
            ChainOutcome::Pass(line) => Some(line),
            _ => None,
        }
    }

    #[test]
    fn test_suppress() {
        let s = session();
        let hook = SuppressHook::new("^Advert").unwrap();
        assert_eq!(hook.process(&s, "Advert: buy".into()).unwrap(), None);
        assert_eq!(
            hook.process(&s, "A goblin".into()).unwrap(),
            Some("A goblin".into())
        );
    }

    #[test]
    fn test_highlight_wraps_first_match() {
        let s = session();
        let hook = HighlightHook::new("dragon", 1).unwrap();
        assert_eq!(
            hook.process(&s, "a dragon and a dragon".into()).unwrap(),
            Some("a \x1b[31mdragon\x1b[0m and a dragon".into())
        );
        assert!(HighlightHook::new("x", 9).is_err());
    }

    #[test]
    fn test_highlight_line() {
        let s = session();
        let hook = HighlightLineHook::new("tells you", 2).unwrap();
        assert_eq!(
            hook.process(&s, "Bob tells you: hi".into()).unwrap(),
            Some("\x1b[32mBob tells you: hi\x1b[0m".into())
        );
    }

    #[test]
    fn test_stream_hook_redirects() {
        let s = session();
        let hook = StreamHook::new(Regex::new("^\\[chat\\]").unwrap(), 2);
        assert_eq!(hook.process(&s, "[chat] hello".into()).unwrap(), None);
        assert_eq!(s.read_channel(2), "[chat] hello\n");
    }

    #[test]
    fn test_function_hook_passes_line() {
        let s = session();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let hook = FunctionHook::new(
            Condition::function(|_, line| line.contains("gold")),
            move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        assert_eq!(hook.process(&s, "5 gold".into()).unwrap(), Some("5 gold".into()));
        hook.process(&s, "nothing".into()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trigger_expands_groups() {
        let trigger = Trigger::new(r"^(\w+) waves", "wave $1").unwrap();
        assert_eq!(trigger.respond("Alice waves."), Some("wave Alice".to_string()));
        assert_eq!(trigger.respond("nothing"), None);
        assert_eq!(trigger.to_string(), r"^(\w+) waves -> wave $1");
    }

    #[test]
    fn test_trigger_sends_response() {
        let s = session();
        let mut list = TriggerList::new();
        list.add(Trigger::new("^You are hungry", "eat bread").unwrap());
        list.add(Trigger::new("hungry", "drink water").unwrap());
        let line = list.process(&s, "You are hungry.".into()).unwrap();
        assert_eq!(line, Some("You are hungry.".into()));
        assert_eq!(s.pending_input(), "eat bread\ndrink water\n");
        assert!(list.remove(5).is_none());
        assert!(list.remove(0).is_some());
    }

    #[test]
    fn test_chain_short_circuits() {
        let s = session();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut chain = HookChain::new();
        chain.push(SuppressHook::new("spam").unwrap());
        chain.push(FunctionHook::new(Condition::function(|_, _| true), move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        assert!(matches!(chain.apply(&s, "spam spam".into()), ChainOutcome::Dropped));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(pass(chain.apply(&s, "eggs".into())), Some("eggs".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_suppressed_line_skips_highlight() {
        let s = session();
        let mut chain = HookChain::new();
        chain.push(SuppressHook::new("dragon").unwrap());
        chain.push(HighlightHook::new("sleeps", 1).unwrap());

        assert!(matches!(
            chain.apply(&s, "A dragon sleeps.".into()),
            ChainOutcome::Dropped
        ));
        assert_eq!(
            pass(chain.apply(&s, "A cat sleeps.".into())),
            Some("A cat \x1b[31msleeps\x1b[0m.".into())
        );
    }

    #[test]
    fn test_chain_reports_failure_and_panic() {
        let s = session();
        let mut chain = HookChain::new();
        chain.push(FunctionHook::new(Condition::function(|_, _| true), |_, line| {
            if line == "boom" {
                panic!("kaboom");
            }
            Err(Error::Hook("nope".to_string()))
        }));

        match chain.apply(&s, "boom".into()) {
            ChainOutcome::Failed { line, error } => {
                assert_eq!(line, "boom");
                assert!(error.to_string().contains("kaboom"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            chain.apply(&s, "other".into()),
            ChainOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_from_config_groups_triggers() {
        let configs = vec![
            HookConfig::Trigger {
                pattern: "a".into(),
                response: "x".into(),
            },
            HookConfig::Trigger {
                pattern: "b".into(),
                response: "y".into(),
            },
            HookConfig::Suppress {
                pattern: "c".into(),
            },
            HookConfig::Stream {
                pattern: "d".into(),
                channel: 1,
            },
        ];
        let chain = HookChain::from_config(&configs).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(
            format!("{chain:?}"),
            r#"["trigger_list", "suppress", "stream"]"#
        );

        let bad = vec![HookConfig::Suppress {
            pattern: "(".into(),
        }];
        assert!(HookChain::from_config(&bad).is_err());
    }
}
