//! Phonemization backends.
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::debug;

use crate::config::PhonemizerParams;
use crate::error::Error;

/// IPA stress marks, removed when stress is not wanted.
const STRESS_MARKS: [char; 2] = ['ˈ', 'ˌ'];

/// A phonemization backend.
///
/// Backends receive runs of words without punctuation
/// and return whitespace-separated phonemized words.
pub trait PhonemizerBackend {
    fn phonemize_words(&self, words: &str) -> Result<String, Error>;

    /// Whether punctuation is kept in the phoneme sequence.
    fn preserve_punctuation(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// espeak-ng backend.
///
/// Runs the `espeak-ng` program once per run of words, text being passed on stdin.
///
/// Requires espeak-ng to be installed:
/// - macOS: `brew install espeak-ng`
/// - Linux: `apt-get install espeak-ng`
#[derive(Debug, Clone)]
pub struct EspeakBackend {
    program: PathBuf,
    language: String,
    preserve_punctuation: bool,
    with_stress: bool,
}

impl EspeakBackend {
    pub fn new(params: &PhonemizerParams) -> Self {
        Self {
            program: params.program.clone(),
            language: params.language.clone(),
            preserve_punctuation: params.preserve_punctuation,
            with_stress: params.with_stress,
        }
    }

    /// Use another espeak-compatible executable.
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    /// Flatten espeak's line-per-clause output, optionally stripping stress marks.
    fn clean_output(raw: &str, with_stress: bool) -> String {
        raw.split_whitespace()
            .map(|word| {
                if with_stress {
                    word.to_string()
                } else {
                    word.chars().filter(|c| !STRESS_MARKS.contains(c)).collect()
                }
            })
            .filter(|word: &String| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl PhonemizerBackend for EspeakBackend {
    fn phonemize_words(&self, words: &str) -> Result<String, Error> {
        if words.trim().is_empty() {
            return Ok(String::new());
        }

        let mut child = Command::new(&self.program)
            .args(["--ipa", "-q", "-v", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Phonemizer(format!(
                    "failed to run {:?}. Is espeak-ng installed? Error: {}",
                    self.program, e
                ))
            })?;

        // stdout is drained while the words are written, large runs would fill both pipes otherwise
        let writer = child.stdin.take().map(|mut stdin| {
            let input = words.to_string();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
                Ok(_) => (),
                Err(_) => return Err(Error::Phonemizer("stdin writer panicked".to_string())),
            }
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Phonemizer(format!("espeak-ng failed: {}", stderr)));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        debug!("espeak: {:?} -> {:?}", words, raw);
        Ok(Self::clean_output(&raw, self.with_stress))
    }

    fn preserve_punctuation(&self) -> bool {
        self.preserve_punctuation
    }

    fn name(&self) -> &'static str {
        "espeak-ng"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_output_keeps_stress() {
        let raw = " həlˈoʊ\n wˈɜːld\n";
        assert_eq!(EspeakBackend::clean_output(raw, true), "həlˈoʊ wˈɜːld");
    }

    #[test]
    fn clean_output_strips_stress() {
        let raw = "ˌɛnɚdʒˈɛɾɪk ˈæ";
        assert_eq!(EspeakBackend::clean_output(raw, false), "ɛnɚdʒɛɾɪk æ");
        assert_eq!(EspeakBackend::clean_output("ˈ", false), "");
    }

    #[test]
    fn large_run() {
        let dir = tempfile::tempdir().unwrap();
        let program = crate::testing::stub_program(dir.path(), "espeak-ng", "cat");
        let backend = EspeakBackend::new(&PhonemizerParams {
            with_stress: false,
            program,
            ..Default::default()
        });

        // far above a pipe buffer
        let words = vec!["ˈwɜːd"; 200_000].join(" ");
        let out = backend.phonemize_words(&words).unwrap();
        assert_eq!(out.split(' ').count(), 200_000);
        assert!(out.split(' ').all(|w| w == "wɜːd"));
    }

    #[test]
    fn missing_program() {
        let backend = EspeakBackend::new(&PhonemizerParams::default())
            .with_program(PathBuf::from("/nonexistent/espeak-ng"));
        assert!(matches!(
            backend.phonemize_words("hello"),
            Err(Error::Phonemizer(_))
        ));
        // empty runs never reach the program
        assert_eq!(backend.phonemize_words("  ").unwrap(), "");
    }
}
