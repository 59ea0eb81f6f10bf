//! Argument-vector construction for the shrink script.
//!
//! The command is always executed directly; [`ShrinkCommand::display`] only
//! renders the equivalent shell line for logs.

use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

use backwatch_config::ShrinkOptions;

/// Program plus arguments for one shrink invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkCommand {
    program: OsString,
    args: Vec<OsString>,
    display: String,
}

impl ShrinkCommand {
    /// Build `elevation... interpreter script flags... image`.
    #[must_use]
    pub fn build(
        script: &Path,
        options: &ShrinkOptions,
        image: &Path,
        elevation: &[String],
        interpreter: &str,
    ) -> Self {
        let mut words: Vec<OsString> = elevation.iter().map(OsString::from).collect();
        words.push(OsString::from(interpreter));
        words.push(script.as_os_str().to_owned());
        words.extend(options.tokens().map(OsString::from));
        words.push(image.as_os_str().to_owned());

        let mut display: Vec<String> = elevation.to_vec();
        display.push(interpreter.to_string());
        display.push(format!("\"{}\"", script.display()));
        display.extend(options.tokens().map(str::to_string));
        display.push(format!("\"{}\"", image.display()));

        let mut words = words.into_iter();
        let program = words.next().unwrap_or_default();
        Self {
            program,
            args: words.collect(),
            display: display.join(" "),
        }
    }

    /// Arbitrary program and arguments.
    #[must_use]
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<OsString>,
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        let program = program.into();
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let display = std::iter::once(&program)
            .chain(args.iter())
            .map(|word| quote_if_needed(&word.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            program,
            args,
            display,
        }
    }

    /// Executable to spawn.
    #[must_use]
    pub fn program(&self) -> &OsString {
        &self.program
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Shell-style rendering for logs and display.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    pub(crate) fn to_tokio(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl Display for ShrinkCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

fn quote_if_needed(word: &str) -> String {
    if word.is_empty() || word.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", word.replace('"', "\\\""))
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backwatch_config::ShrinkFlag;
    use std::path::PathBuf;

    #[test]
    fn display_matches_legacy_shell_line() {
        let options = ShrinkOptions::from_flags([ShrinkFlag::AutoYes, ShrinkFlag::Compress]);
        let command = ShrinkCommand::build(
            Path::new("/opt/pishrink/pishrink.sh"),
            &options,
            Path::new("/b/x.img"),
            &["sudo".to_string()],
            "bash",
        );
        assert_eq!(
            command.display(),
            "sudo bash \"/opt/pishrink/pishrink.sh\" -a -z \"/b/x.img\""
        );
        assert_eq!(command.program(), "sudo");
        let args: Vec<_> = command.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["bash", "/opt/pishrink/pishrink.sh", "-a", "-z", "/b/x.img"]
        );
    }

    #[test]
    fn flags_follow_enable_order() {
        let options = ShrinkOptions::from_flags([ShrinkFlag::Compress, ShrinkFlag::AutoYes]);
        let command = ShrinkCommand::build(
            Path::new("s.sh"),
            &options,
            Path::new("/b/x.img"),
            &["sudo".to_string()],
            "bash",
        );
        assert_eq!(command.display(), "sudo bash \"s.sh\" -z -a \"/b/x.img\"");
    }

    #[test]
    fn empty_elevation_runs_interpreter_directly() {
        let image = PathBuf::from("/b/with space.img");
        let command =
            ShrinkCommand::build(Path::new("s.sh"), &ShrinkOptions::default(), &image, &[], "bash");
        assert_eq!(command.program(), "bash");
        assert_eq!(command.args().last(), Some(&image.into_os_string()));
        assert_eq!(command.display(), "bash \"s.sh\" \"/b/with space.img\"");
    }

    #[test]
    fn generic_commands_quote_spaced_words() {
        let command = ShrinkCommand::new("sh", ["-c", "echo step1; echo step2"]);
        assert_eq!(command.display(), "sh -c \"echo step1; echo step2\"");
    }
}
